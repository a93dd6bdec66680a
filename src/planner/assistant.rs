use base64::engine::general_purpose;
use base64::Engine as _;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::client::{GenerateRequest, GenerativeClient, InlineData, Part, ServiceError};
use super::extract::extract_json_object;
use super::prompt;
use crate::config::ModelConfig;
use crate::trip::{
    new_trip_id, BudgetLevel, Reservation, TravelPace, TravelTip, Trip, TripBudget, TripDay, TripStatus,
};

/// What the user asked the planner for
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryRequest {
    pub destination: String,
    pub days: u32,
    pub interests: Vec<String>,
    pub pace: TravelPace,
    pub budget_level: BudgetLevel,
    pub restaurants_per_day: u32,
    pub mandatory_activities: Option<String>,
}

/// The part of a trip the planner model produces
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedPlan {
    pub itinerary: Vec<TripDay>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    pub budget: TripBudget,
    #[serde(default)]
    pub tips: Vec<TravelTip>,
}

impl ItineraryRequest {
    /// Combine the request with the generated plan into a new upcoming trip
    pub fn into_trip(self, plan: GeneratedPlan) -> Trip {
        Trip {
            id: new_trip_id(),
            destination: self.destination,
            duration_days: self.days,
            pace: self.pace,
            interests: self.interests,
            mandatory_activities: self.mandatory_activities.filter(|s| !s.trim().is_empty()),
            num_restaurants_per_day: self.restaurants_per_day,
            itinerary: plan.itinerary,
            reservations: plan.reservations,
            budget: plan.budget,
            general_tips: plan.tips,
            status: TripStatus::Upcoming,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuideStyle {
    Informative,
    #[default]
    Storytelling,
    Brief,
}

impl fmt::Display for GuideStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuideStyle::Informative => write!(f, "informative"),
            GuideStyle::Storytelling => write!(f, "storytelling"),
            GuideStyle::Brief => write!(f, "brief"),
        }
    }
}

impl std::str::FromStr for GuideStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "informative" => Ok(GuideStyle::Informative),
            "storytelling" => Ok(GuideStyle::Storytelling),
            "brief" => Ok(GuideStyle::Brief),
            _ => Err(format!("Unknown guide style: {}. Use informative, storytelling, or brief", s)),
        }
    }
}

/// Travel features built on the generative API
///
/// The client is injected so the application entry point owns its lifetime.
pub struct TravelAssistant {
    client: Arc<dyn GenerativeClient>,
    models: ModelConfig,
}

impl TravelAssistant {
    pub fn new(client: Arc<dyn GenerativeClient>, models: ModelConfig) -> Self {
        Self { client, models }
    }

    /// Ask for an itinerary; `None` when the answer holds no usable plan
    pub async fn generate_itinerary(
        &self,
        request: &ItineraryRequest,
    ) -> Result<Option<GeneratedPlan>, ServiceError> {
        let mut generate = GenerateRequest::new(&self.models.planner)
            .part(Part::text(prompt::itinerary_prompt(request)));
        generate.maps_grounding = true;

        info!("Planning {} days in {}", request.days, request.destination);
        let response = self.client.generate(generate).await?;

        let Some(text) = response.text else {
            warn!("Planner returned no text");
            return Ok(None);
        };
        let Some(value) = extract_json_object(&text) else {
            warn!("No JSON object in planner response ({} chars)", text.len());
            return Ok(None);
        };

        match serde_json::from_value::<GeneratedPlan>(value) {
            Ok(plan) => {
                if plan.itinerary.len() != request.days as usize {
                    warn!(
                        "Planner returned {} days for a {}-day trip",
                        plan.itinerary.len(),
                        request.days
                    );
                }
                Ok(Some(plan))
            }
            Err(e) => {
                warn!("Planner JSON does not match the plan shape: {}", e);
                Ok(None)
            }
        }
    }

    /// Describe what a travel photo shows
    pub async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Result<Option<String>, ServiceError> {
        let generate = GenerateRequest::new(&self.models.assistant)
            .part(Part::Inline(InlineData {
                mime_type: mime_type.to_string(),
                data: general_purpose::STANDARD.encode(image),
            }))
            .part(Part::text(prompt::IMAGE_PROMPT));

        info!("Analyzing {} byte {} image", image.len(), mime_type);
        Ok(self.client.generate(generate).await?.text)
    }

    pub async fn ask_assistant(&self, question: &str, context: Option<&str>) -> Result<Option<String>, ServiceError> {
        let generate = GenerateRequest::new(&self.models.assistant)
            .part(Part::text(prompt::question_with_context(question, context)))
            .system(prompt::ASSISTANT_INSTRUCTION);

        Ok(self.client.generate(generate).await?.text)
    }

    /// Spoken guide as base64 PCM (16-bit LE, mono, 24kHz)
    pub async fn generate_audio_guide(&self, topic: &str, style: GuideStyle) -> Result<Option<String>, ServiceError> {
        let mut generate = GenerateRequest::new(&self.models.speech)
            .part(Part::text(prompt::audio_guide_prompt(topic, style)));
        generate.speech_voice = Some(self.models.voice.clone());

        info!("Requesting {} audio guide for {}", style, topic);
        let response = self.client.generate(generate).await?;
        Ok(response.inline_data.map(|inline| inline.data))
    }
}
