use std::fmt::Write as _;

use super::assistant::{GuideStyle, ItineraryRequest};

pub const ASSISTANT_INSTRUCTION: &str =
    "Eres un asistente de viajes experto. Ayudas con el presupuesto y la logística. Respondes en castellano.";

pub const IMAGE_PROMPT: &str =
    "Identifica qué aparece en esta foto de viaje y cuenta brevemente su interés turístico. Responde en castellano.";

/// Prompt asking the planner for a full itinerary as a single JSON object
pub fn itinerary_prompt(request: &ItineraryRequest) -> String {
    let mut prompt = String::new();
    let mandatory = request
        .mandatory_activities
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Ninguna");
    let interests = if request.interests.is_empty() {
        "Sin preferencia".to_string()
    } else {
        request.interests.join(", ")
    };

    let _ = writeln!(
        prompt,
        "Eres un planificador de viajes. Diseña un itinerario de {} días en {}.",
        request.days, request.destination
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Condiciones:");
    let _ = writeln!(
        prompt,
        "- Nivel de presupuesto: {}. Ajusta alojamiento y comidas a ese nivel.",
        request.budget_level
    );
    let _ = writeln!(
        prompt,
        "- Incluye exactamente {} restaurantes o comidas recomendadas por día.",
        request.restaurants_per_day
    );
    let _ = writeln!(
        prompt,
        "- Actividades obligatorias, colocadas de forma lógica: {}.",
        mandatory
    );
    let _ = writeln!(prompt, "- Intereses: {}. Ritmo: {}.", interests, request.pace);
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Devuelve solo un objeto JSON con las claves \"itinerary\", \"reservations\", \"budget\" y \"tips\":"
    );
    let _ = writeln!(
        prompt,
        "- itinerary: lista de {{dayNumber, activities}}; cada actividad tiene startTime y endTime (HH:MM), \
         title, description, category (Cultura|Gastronomía|Naturaleza|Ocio|Historia|Logística|Alojamiento), \
         travelMode (walk|transit|car), travelDuration, mapsSearchQuery y estimatedCost (número)."
    );
    let _ = writeln!(
        prompt,
        "- reservations: lista de {{id, type (hotel|vuelo|entrada|restaurante), title, detail, estimatedCost}}."
    );
    let _ = writeln!(
        prompt,
        "- budget: {{totalEstimated, currency: \"EUR\", level: \"{}\", breakdown: {{lodging, food, activities, transport}}}}.",
        request.budget_level
    );
    let _ = writeln!(prompt, "- tips: lista de {{title, content, icon}}.");
    let _ = writeln!(prompt);
    let _ = write!(
        prompt,
        "Responde en castellano con precios realistas para el nivel {} en {}.",
        request.budget_level, request.destination
    );

    prompt
}

/// Question for the assistant, with the active trip summary in front
pub fn question_with_context(question: &str, context: Option<&str>) -> String {
    match context.filter(|c| !c.trim().is_empty()) {
        Some(context) => format!("Contexto: {}\n\nPregunta: {}", context, question),
        None => question.to_string(),
    }
}

pub fn audio_guide_prompt(topic: &str, style: GuideStyle) -> String {
    let tone = match style {
        GuideStyle::Informative => "informativo, con datos clave y fechas",
        GuideStyle::Storytelling => "narrativo, contando la historia del lugar como un relato",
        GuideStyle::Brief => "breve, de menos de un minuto",
    };
    format!("Lee en voz alta un guion de audioguía sobre {} en castellano. Tono {}.", topic, tone)
}
