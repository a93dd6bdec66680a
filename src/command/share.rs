use tracing::info;

use crate::db;
use crate::error::AppError;
use crate::trip;
use crate::App;

use super::plan::print_summary;
use super::trips::find_trip;

pub async fn share(ctx: &App, id: &str) -> Result<(), AppError> {
    let trip = find_trip(ctx, id).await?;
    let url = trip::share_url(&ctx.config.share_base_url, &trip)?;

    println!("Comparte tu viaje a {} ({} días):", trip.destination, trip.duration_days);
    println!("{}", url);
    println!();
    println!("Código QR: {}", trip::qr_code_url(&url));
    Ok(())
}

/// Import the trip carried by a share link into the local library
pub async fn import(ctx: &App, url: &str) -> Result<(), AppError> {
    let consumed = trip::consume_share_fragment(url);

    let Some(outcome) = consumed.outcome else {
        return Err(AppError::NotFound(
            "El enlace no contiene ningún viaje compartido.".to_string(),
        ));
    };

    let trip = outcome?;
    db::save_trip(&ctx.db, &trip).await?;
    info!("Stored shared trip {}", trip.id);

    print_summary(&trip);
    println!("URL limpia: {}", consumed.cleaned_url);
    Ok(())
}
