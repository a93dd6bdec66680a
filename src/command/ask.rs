use std::path::Path;
use tracing::debug;

use crate::error::AppError;
use crate::App;

use super::trips::find_trip;

pub async fn ask(ctx: &App, question: &str, trip_id: Option<&str>) -> Result<(), AppError> {
    let assistant = ctx.assistant()?;

    let context = match trip_id {
        Some(id) => Some(find_trip(ctx, id).await?.assistant_context()),
        None => None,
    };

    match assistant.ask_assistant(question, context.as_deref()).await? {
        Some(answer) => println!("{}", answer),
        None => println!("Lo siento, no tengo una respuesta para eso ahora mismo."),
    }
    Ok(())
}

pub async fn scan(ctx: &App, image: &Path) -> Result<(), AppError> {
    let assistant = ctx.assistant()?;

    let mime_type = mime_type_for(image);
    let bytes = tokio::fs::read(image).await?;
    debug!("Scanning {} ({} bytes, {})", image.display(), bytes.len(), mime_type);

    match assistant.analyze_image(&bytes, mime_type).await? {
        Some(description) => println!("{}", description),
        None => println!("No se pudo identificar el lugar de la imagen."),
    }
    Ok(())
}

fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}
