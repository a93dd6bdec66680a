use anyhow::Context as _;
use clap::Parser;
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod audio;
mod command;
mod config;
mod db;
mod error;
mod planner;
mod trip;

use command::Cli;
use config::{Config, ConfigError};
use db::DbPool;
use error::AppError;
use planner::{GeminiClient, GenerativeClient, TravelAssistant};

pub struct App {
    pub config: Config,
    pub db: DbPool,
    assistant: Option<TravelAssistant>,
}

impl App {
    /// The assistant, or the missing-key error for commands that need the API
    pub fn assistant(&self) -> Result<&TravelAssistant, AppError> {
        self.assistant
            .as_ref()
            .ok_or(AppError::Config(ConfigError::MissingApiKey))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tripcraft=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;

    let db = db::init_db(&config.database_url)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let assistant = match config.api_key() {
        Ok(key) => {
            let client = GeminiClient::new(key.to_string(), &config.base_url, config.request_timeout)
                .context("Failed to build the HTTP client")?;
            let client: Arc<dyn GenerativeClient> = Arc::new(client);
            Some(TravelAssistant::new(client, config.models.clone()))
        }
        Err(_) => None,
    };

    let app = App {
        config,
        db,
        assistant,
    };

    if let Err(e) = command::run(&app, cli.command).await {
        error!("Command failed: {}", e);
        eprintln!("{}", e.notice());
        std::process::exit(1);
    }

    Ok(())
}
