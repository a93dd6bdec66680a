pub mod ask;
pub mod guide;
pub mod plan;
pub mod share;
pub mod trips;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::AppError;
use crate::planner::{GuideStyle, ItineraryRequest};
use crate::trip::{BudgetLevel, TravelPace};
use crate::App;

#[derive(Parser, Debug)]
#[command(name = "tripcraft", version, about = "Plan, share and listen to your trips")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new itinerary and store it
    Plan {
        #[arg(long)]
        destination: String,
        #[arg(long, default_value_t = 3)]
        days: u32,
        #[arg(long = "interest")]
        interests: Vec<String>,
        #[arg(long, default_value_t = BudgetLevel::Medium)]
        budget: BudgetLevel,
        #[arg(long, default_value_t = TravelPace::Balanced)]
        pace: TravelPace,
        #[arg(long, default_value_t = 2)]
        restaurants: u32,
        #[arg(long)]
        mandatory: Option<String>,
    },
    /// List stored trips, newest first
    List,
    /// Show a stored trip
    Show { id: String },
    /// Print the share link and QR code of a trip
    Share { id: String },
    /// Store the trip carried by a share link
    Import { url: String },
    /// Ask the travel assistant
    Ask {
        question: String,
        #[arg(long = "trip")]
        trip_id: Option<String>,
    },
    /// Identify the landmark in a photo
    Scan { image: PathBuf },
    /// Generate a spoken guide and render it to a WAV file
    Guide {
        topic: String,
        #[arg(long, default_value_t = GuideStyle::Storytelling)]
        style: GuideStyle,
        #[arg(long)]
        out: PathBuf,
        /// Also keep the base64 PCM payload
        #[arg(long)]
        save: Option<PathBuf>,
        /// Render as fast as possible instead of in real time
        #[arg(long)]
        fast: bool,
    },
    /// Render a saved base64 PCM guide to a WAV file
    Play {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        fast: bool,
    },
    /// Delete a stored trip
    Delete { id: String },
}

pub async fn run(ctx: &App, command: Command) -> Result<(), AppError> {
    match command {
        Command::Plan {
            destination,
            days,
            interests,
            budget,
            pace,
            restaurants,
            mandatory,
        } => {
            let request = ItineraryRequest {
                destination,
                days,
                interests,
                pace,
                budget_level: budget,
                restaurants_per_day: restaurants,
                mandatory_activities: mandatory.filter(|m| !m.trim().is_empty()),
            };
            plan::plan(ctx, request).await
        }
        Command::List => trips::list(ctx).await,
        Command::Show { id } => trips::show(ctx, &id).await,
        Command::Share { id } => share::share(ctx, &id).await,
        Command::Import { url } => share::import(ctx, &url).await,
        Command::Ask { question, trip_id } => ask::ask(ctx, &question, trip_id.as_deref()).await,
        Command::Scan { image } => ask::scan(ctx, &image).await,
        Command::Guide {
            topic,
            style,
            out,
            save,
            fast,
        } => {
            let output = guide::GuideOutput {
                out,
                save,
                realtime: !fast,
            };
            guide::guide(ctx, &topic, style, output).await
        }
        Command::Play { file, out, fast } => guide::play(&file, &out, !fast).await,
        Command::Delete { id } => trips::delete(ctx, &id).await,
    }
}
