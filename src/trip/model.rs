//! Trip records.
//!
//! These are the shapes exchanged with the planner model and embedded in
//! share links, so every type serializes with camelCase keys.

use percent_encoding::utf8_percent_encode;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::share::QUERY_VALUE;

const MAPS_SEARCH_ENDPOINT: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Category tag attached to each activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TravelCategory {
    #[serde(rename = "Cultura")]
    Culture,
    #[serde(rename = "Gastronomía")]
    Gastronomy,
    #[serde(rename = "Naturaleza")]
    Nature,
    #[serde(rename = "Ocio")]
    Leisure,
    #[serde(rename = "Historia")]
    History,
    #[serde(rename = "Logística")]
    Logistics,
    #[serde(rename = "Alojamiento")]
    Lodging,
}

impl TravelCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TravelCategory::Culture => "Cultura",
            TravelCategory::Gastronomy => "Gastronomía",
            TravelCategory::Nature => "Naturaleza",
            TravelCategory::Leisure => "Ocio",
            TravelCategory::History => "Historia",
            TravelCategory::Logistics => "Logística",
            TravelCategory::Lodging => "Alojamiento",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TravelPace {
    #[serde(rename = "Relajado")]
    Relaxed,
    #[default]
    #[serde(rename = "Equilibrado")]
    Balanced,
    #[serde(rename = "Intenso")]
    Fast,
}

impl fmt::Display for TravelPace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelPace::Relaxed => write!(f, "Relajado"),
            TravelPace::Balanced => write!(f, "Equilibrado"),
            TravelPace::Fast => write!(f, "Intenso"),
        }
    }
}

impl std::str::FromStr for TravelPace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relaxed" | "relajado" => Ok(TravelPace::Relaxed),
            "balanced" | "equilibrado" => Ok(TravelPace::Balanced),
            "fast" | "intenso" => Ok(TravelPace::Fast),
            _ => Err(format!("Unknown pace: {}. Use relaxed, balanced, or fast", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BudgetLevel {
    #[serde(rename = "Mochilero")]
    Low,
    #[default]
    #[serde(rename = "Estándar")]
    Medium,
    #[serde(rename = "Lujo")]
    High,
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLevel::Low => write!(f, "Mochilero"),
            BudgetLevel::Medium => write!(f, "Estándar"),
            BudgetLevel::High => write!(f, "Lujo"),
        }
    }
}

impl std::str::FromStr for BudgetLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" | "mochilero" => Ok(BudgetLevel::Low),
            "medium" | "estandar" | "estándar" => Ok(BudgetLevel::Medium),
            "high" | "lujo" => Ok(BudgetLevel::High),
            _ => Err(format!("Unknown budget level: {}. Use low, medium, or high", s)),
        }
    }
}

/// How the traveller reaches an activity from the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walk,
    Transit,
    Car,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poi_id: Option<String>,
    /// Mode of the leg preceding this activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_mode: Option<TravelMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_duration: Option<String>,
    pub category: TravelCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_search_query: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
}

impl Activity {
    /// Google Maps search for this activity, by its search query or else its title
    pub fn maps_url(&self) -> String {
        let query = self
            .maps_search_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .unwrap_or(&self.title);
        format!("{}{}", MAPS_SEARCH_ENDPOINT, utf8_percent_encode(query, QUERY_VALUE))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDay {
    pub day_number: u32,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl TripDay {
    /// Sum of the estimated cost of every activity in the day
    pub fn estimated_cost(&self) -> f64 {
        self.activities.iter().map(|a| a.estimated_cost).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub lodging: f64,
    pub food: f64,
    pub activities: f64,
    pub transport: f64,
}

impl BudgetBreakdown {
    pub fn total(&self) -> f64 {
        self.lodging + self.food + self.activities + self.transport
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBudget {
    pub total_estimated: f64,
    pub currency: String,
    #[serde(default)]
    pub level: BudgetLevel,
    #[serde(default)]
    pub breakdown: BudgetBreakdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationKind {
    Hotel,
    Vuelo,
    Entrada,
    Restaurante,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ReservationKind,
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTip {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    #[default]
    Planning,
    Upcoming,
    Active,
    Completed,
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripStatus::Planning => write!(f, "planning"),
            TripStatus::Upcoming => write!(f, "upcoming"),
            TripStatus::Active => write!(f, "active"),
            TripStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A planned trip, as stored locally and embedded in share links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub destination: String,
    pub duration_days: u32,
    #[serde(default)]
    pub pace: TravelPace,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandatory_activities: Option<String>,
    #[serde(default)]
    pub num_restaurants_per_day: u32,
    pub itinerary: Vec<TripDay>,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    pub budget: TripBudget,
    #[serde(default)]
    pub general_tips: Vec<TravelTip>,
    #[serde(default)]
    pub status: TripStatus,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: i64,
}

impl Trip {
    /// Whether the itinerary has exactly one entry per trip day
    pub fn is_consistent(&self) -> bool {
        self.itinerary.len() == self.duration_days as usize
    }

    /// Short description of the trip handed to the assistant with each question
    pub fn assistant_context(&self) -> String {
        format!(
            "Viaje: {}, Días: {}, Presupuesto: {:.0} {}",
            self.destination, self.duration_days, self.budget.total_estimated, self.budget.currency
        )
    }

    pub fn activity_count(&self) -> usize {
        self.itinerary.iter().map(|d| d.activities.len()).sum()
    }

    pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Generate a short base36 identifier for a new trip
pub fn new_trip_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .unsigned_abs();
    let mut n = nanos;
    let mut id = Vec::with_capacity(13);
    while n > 0 {
        id.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    id.reverse();

    let id = String::from_utf8(id).unwrap_or_default();
    // Keep the fast-changing tail only
    let start = id.len().saturating_sub(9);
    id[start..].to_string()
}
