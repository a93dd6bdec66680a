use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::audio::{AudioError, AudioPlayer, PlaybackConfig, SessionState, WavOutput, GUIDE_CHANNELS, GUIDE_SAMPLE_RATE};
use crate::error::AppError;
use crate::planner::GuideStyle;
use crate::App;

pub struct GuideOutput {
    pub out: PathBuf,
    pub save: Option<PathBuf>,
    pub realtime: bool,
}

pub async fn guide(ctx: &App, topic: &str, style: GuideStyle, output: GuideOutput) -> Result<(), AppError> {
    let assistant = ctx.assistant()?;

    let Some(encoded) = assistant.generate_audio_guide(topic, style).await? else {
        println!("No se pudo generar la audioguía sobre {}.", topic);
        return Ok(());
    };

    if let Some(ref save) = output.save {
        tokio::fs::write(save, &encoded).await?;
        info!("Saved audio guide payload to {}", save.display());
    }

    play_encoded(encoded, &output.out, output.realtime).await
}

pub async fn play(file: &Path, out: &Path, realtime: bool) -> Result<(), AppError> {
    let encoded = tokio::fs::read_to_string(file).await?;
    play_encoded(encoded.trim().to_string(), out, realtime).await
}

async fn play_encoded(encoded: String, out: &Path, realtime: bool) -> Result<(), AppError> {
    let config = PlaybackConfig {
        realtime,
        ..PlaybackConfig::default()
    };
    let player = AudioPlayer::spawn(Arc::new(WavOutput::new(out)), config);

    let result = render(&player, encoded, out).await;
    player.close().await?;
    result
}

async fn render(player: &AudioPlayer, encoded: String, out: &Path) -> Result<(), AppError> {
    player.load(encoded, GUIDE_SAMPLE_RATE, GUIDE_CHANNELS).await?;
    player.play().await?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Reproduciendo en {}", out.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let settled = player.wait_until_settled().await;
    spinner.finish_and_clear();

    if settled != SessionState::Ended {
        return Err(AudioError::Output(format!("playback settled in {:?} before the end", settled)).into());
    }

    println!("Audioguía guardada en {}", out.display());
    Ok(())
}
