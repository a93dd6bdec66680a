//! Planner, assistant, scanner and audio guides on top of the generative API.

pub mod assistant;
pub mod client;
pub mod extract;
pub mod prompt;

pub use assistant::{GuideStyle, ItineraryRequest, TravelAssistant};
pub use client::{GeminiClient, GenerativeClient, ServiceError};
