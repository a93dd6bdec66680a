use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::info;

use crate::db;
use crate::error::AppError;
use crate::planner::ItineraryRequest;
use crate::trip::{self, Trip};
use crate::App;

pub async fn plan(ctx: &App, request: ItineraryRequest) -> Result<(), AppError> {
    let assistant = ctx.assistant()?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!(
        "Diseñando tu viaje a {} (nivel {})...",
        request.destination, request.budget_level
    ));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let generated = assistant.generate_itinerary(&request).await;
    spinner.finish_and_clear();

    let Some(plan) = generated? else {
        println!("No se pudo generar un plan para {}. Inténtalo de nuevo.", request.destination);
        return Ok(());
    };

    let trip = request.into_trip(plan);
    db::save_trip(&ctx.db, &trip).await?;
    info!("Planned trip {} to {}", trip.id, trip.destination);

    print_summary(&trip);
    println!();
    println!("Compartir: {}", trip::share_url(&ctx.config.share_base_url, &trip)?);
    Ok(())
}

pub fn print_summary(trip: &Trip) {
    println!(
        "{} · {} días · {} actividades · {:.0} {} ({})",
        trip.destination,
        trip.duration_days,
        trip.activity_count(),
        trip.budget.total_estimated,
        trip.budget.currency,
        trip.budget.level
    );
    println!("id: {} · estado: {}", trip.id, trip.status);
    if !trip.is_consistent() {
        println!(
            "Aviso: el itinerario tiene {} días para un viaje de {}.",
            trip.itinerary.len(),
            trip.duration_days
        );
    }
}
