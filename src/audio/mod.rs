pub mod output;
pub mod pcm;
pub mod player;

use thiserror::Error;

pub use output::WavOutput;
pub use pcm::{GUIDE_CHANNELS, GUIDE_SAMPLE_RATE};
pub use player::{AudioPlayer, PlaybackConfig, SessionState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("Audio decode failed: {0}")]
    Decode(String),
    #[error("Audio session is closed")]
    SessionClosed,
    #[error("Audio output failed: {0}")]
    Output(String),
}
