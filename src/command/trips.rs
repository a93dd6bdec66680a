use crate::db;
use crate::error::AppError;
use crate::trip::Trip;
use crate::App;

use super::plan::print_summary;

pub async fn list(ctx: &App) -> Result<(), AppError> {
    let trips = db::list_trips(&ctx.db).await?;
    if trips.is_empty() {
        println!("Todavía no tienes viajes. Crea uno con `tripcraft plan`.");
        return Ok(());
    }

    for trip in trips {
        let created = trip
            .created_at_utc()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<24} {:>2} días  {:<10} {}",
            trip.id, trip.destination, trip.duration_days, trip.status, created
        );
    }
    Ok(())
}

pub async fn show(ctx: &App, id: &str) -> Result<(), AppError> {
    let trip = find_trip(ctx, id).await?;

    print_summary(&trip);
    if let Some(ref mandatory) = trip.mandatory_activities {
        println!("Imprescindible: {}", mandatory);
    }

    for day in &trip.itinerary {
        println!();
        println!("Día {} ({:.0} {})", day.day_number, day.estimated_cost(), trip.budget.currency);
        for activity in &day.activities {
            println!(
                "  {}-{}  {} [{}] {:.0} {}",
                activity.start_time,
                activity.end_time,
                activity.title,
                activity.category.label(),
                activity.estimated_cost,
                trip.budget.currency
            );
            if let Some(ref duration) = activity.travel_duration {
                println!("      llegada: {}", duration);
            }
            println!("      mapa: {}", activity.maps_url());
        }
    }

    let breakdown = &trip.budget.breakdown;
    println!();
    println!("Presupuesto ({}):", trip.budget.level);
    println!("  Alojamiento  {:>8.0}", breakdown.lodging);
    println!("  Comida       {:>8.0}", breakdown.food);
    println!("  Actividades  {:>8.0}", breakdown.activities);
    println!("  Transporte   {:>8.0}", breakdown.transport);
    println!("  Total        {:>8.0} {}", breakdown.total(), trip.budget.currency);

    if !trip.reservations.is_empty() {
        println!();
        println!("Reservas:");
        for reservation in &trip.reservations {
            println!(
                "  {:?}: {} ({:.0} {})",
                reservation.kind, reservation.title, reservation.estimated_cost, trip.budget.currency
            );
        }
    }

    for tip in &trip.general_tips {
        println!("{} {}: {}", tip.icon, tip.title, tip.content);
    }
    Ok(())
}

pub async fn delete(ctx: &App, id: &str) -> Result<(), AppError> {
    if db::delete_trip(&ctx.db, id).await? {
        println!("Viaje {} eliminado.", id);
        Ok(())
    } else {
        Err(not_found(id))
    }
}

pub async fn find_trip(ctx: &App, id: &str) -> Result<Trip, AppError> {
    db::get_trip(&ctx.db, id).await?.ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("No existe ningún viaje con id {}.", id))
}
