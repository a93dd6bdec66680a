//! Single-stream audio player.
//!
//! One task owns the session and applies commands strictly in the order they
//! arrive, each answered on its own reply channel. Playback itself runs in a
//! pump task that writes chunks to the output stream; stopping signals the
//! pump and waits for it to drop the stream before anything else happens, so
//! at most one output stream is ever open.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::output::{AudioOutput, OutputStream};
use super::pcm::{self, AudioBuffer, GUIDE_CHANNELS, GUIDE_SAMPLE_RATE};
use super::AudioError;

const COMMAND_QUEUE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded
    Idle,
    /// Buffer ready, not started
    Decoded,
    Playing,
    /// Played to the last sample
    Ended,
    /// Stopped by the user before the end
    Stopped,
    /// Released; every further operation fails
    Closed,
}

#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Frames written to the output per chunk
    pub chunk_frames: usize,
    /// Pace writes to the buffer's sample rate instead of writing as fast as possible
    pub realtime: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 2400, // 100ms at 24kHz
            realtime: true,
        }
    }
}

type Reply = oneshot::Sender<Result<(), AudioError>>;

enum PlayerCommand {
    Load {
        encoded: String,
        sample_rate: u32,
        channels: u16,
        reply: Reply,
    },
    Play { reply: Reply },
    Stop { reply: Reply },
    Replace { encoded: String, reply: Reply },
    Close { reply: Reply },
}

enum PlaybackEvent {
    Finished {
        generation: u64,
        result: Result<(), AudioError>,
    },
}

enum PumpOutcome {
    Ended(Result<(), AudioError>),
    Cancelled,
}

struct ActivePlayback {
    generation: u64,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The decoded buffer plus the playback currently using it
struct AudioSession {
    buffer: Option<Arc<AudioBuffer>>,
    /// Sample rate and channel count of the last load, reused by replace
    format: (u32, u16),
    playback: Option<ActivePlayback>,
    generation: u64,
}

/// Handle to the player task
///
/// Clones share the same session. When the last handle is dropped the task
/// stops playback and exits.
#[derive(Clone)]
pub struct AudioPlayer {
    tx: mpsc::Sender<PlayerCommand>,
    state: watch::Receiver<SessionState>,
}

impl AudioPlayer {
    pub fn spawn(output: Arc<dyn AudioOutput>, config: PlaybackConfig) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);

        let task = PlayerTask {
            commands: rx,
            events_tx,
            events: events_rx,
            output,
            config,
            state: state_tx,
            session: AudioSession {
                buffer: None,
                format: (GUIDE_SAMPLE_RATE, GUIDE_CHANNELS),
                playback: None,
                generation: 0,
            },
        };
        tokio::spawn(task.run());

        Self { tx, state: state_rx }
    }

    /// Decode base64 PCM into the session, replacing whatever was loaded
    pub async fn load(
        &self,
        encoded: impl Into<String>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), AudioError> {
        let encoded = encoded.into();
        self.request(|reply| PlayerCommand::Load {
            encoded,
            sample_rate,
            channels,
            reply,
        })
        .await
    }

    /// Start from the first sample; restarts if already playing
    pub async fn play(&self) -> Result<(), AudioError> {
        self.request(|reply| PlayerCommand::Play { reply }).await
    }

    pub async fn stop(&self) -> Result<(), AudioError> {
        self.request(|reply| PlayerCommand::Stop { reply }).await
    }

    /// Stop unconditionally, then decode new content in the last loaded format
    pub async fn replace(&self, encoded: impl Into<String>) -> Result<(), AudioError> {
        let encoded = encoded.into();
        self.request(|reply| PlayerCommand::Replace { encoded, reply })
            .await
    }

    pub async fn close(&self) -> Result<(), AudioError> {
        self.request(|reply| PlayerCommand::Close { reply }).await
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait while the session is playing and return the state it settles in
    pub async fn wait_until_settled(&self) -> SessionState {
        let mut state = self.state.clone();
        loop {
            let current = *state.borrow_and_update();
            if current != SessionState::Playing {
                return current;
            }
            if state.changed().await.is_err() {
                return SessionState::Closed;
            }
        }
    }

    async fn request(&self, command: impl FnOnce(Reply) -> PlayerCommand) -> Result<(), AudioError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| AudioError::SessionClosed)?;
        rx.await.unwrap_or(Err(AudioError::SessionClosed))
    }
}

struct PlayerTask {
    commands: mpsc::Receiver<PlayerCommand>,
    events_tx: mpsc::UnboundedSender<PlaybackEvent>,
    events: mpsc::UnboundedReceiver<PlaybackEvent>,
    output: Arc<dyn AudioOutput>,
    config: PlaybackConfig,
    state: watch::Sender<SessionState>,
    session: AudioSession,
}

impl PlayerTask {
    async fn run(mut self) {
        debug!("Audio player task started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                Some(event) = self.events.recv() => self.handle_event(event).await,
            }
        }

        self.stop_playback().await;
        self.session.buffer = None;
        self.set_state(SessionState::Closed);
        debug!("Audio player task ended");
    }

    fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Audio session {:?} -> {:?}", previous, state);
        }
    }

    async fn handle(&mut self, command: PlayerCommand) {
        if self.current() == SessionState::Closed {
            let reply = match command {
                PlayerCommand::Load { reply, .. }
                | PlayerCommand::Play { reply }
                | PlayerCommand::Stop { reply }
                | PlayerCommand::Replace { reply, .. }
                | PlayerCommand::Close { reply } => reply,
            };
            let _ = reply.send(Err(AudioError::SessionClosed));
            return;
        }

        match command {
            PlayerCommand::Load {
                encoded,
                sample_rate,
                channels,
                reply,
            } => {
                let result = self.load(encoded, sample_rate, channels).await;
                let _ = reply.send(result);
            }
            PlayerCommand::Replace { encoded, reply } => {
                let (sample_rate, channels) = self.session.format;
                let result = self.load(encoded, sample_rate, channels).await;
                let _ = reply.send(result);
            }
            PlayerCommand::Play { reply } => {
                let result = self.play().await;
                let _ = reply.send(result);
            }
            PlayerCommand::Stop { reply } => {
                if self.stop_playback().await {
                    self.set_state(SessionState::Stopped);
                }
                let _ = reply.send(Ok(()));
            }
            PlayerCommand::Close { reply } => {
                self.stop_playback().await;
                self.session.buffer = None;
                self.set_state(SessionState::Closed);
                info!("Audio session closed");
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn handle_event(&mut self, event: PlaybackEvent) {
        let PlaybackEvent::Finished { generation, result } = event;

        let is_current = self
            .session
            .playback
            .as_ref()
            .is_some_and(|p| p.generation == generation);
        if !is_current {
            debug!("Ignoring end of superseded playback {}", generation);
            return;
        }

        if let Some(playback) = self.session.playback.take() {
            let _ = playback.task.await;
        }

        match result {
            Ok(()) => {
                info!("Playback {} reached the end", generation);
                self.set_state(SessionState::Ended);
            }
            Err(e) => {
                error!("Playback {} failed: {}", generation, e);
                self.set_state(SessionState::Stopped);
            }
        }
    }

    async fn load(&mut self, encoded: String, sample_rate: u32, channels: u16) -> Result<(), AudioError> {
        // The previous content stops before the new content is even decoded
        if self.stop_playback().await {
            self.set_state(SessionState::Stopped);
        }
        self.session.buffer = None;

        let decoded = tokio::task::spawn_blocking(move || pcm::load(&encoded, sample_rate, channels))
            .await
            .map_err(|e| AudioError::Decode(format!("decoder task failed: {}", e)))
            .and_then(|result| result);

        match decoded {
            Ok(buffer) => {
                info!(
                    "Decoded {} frames ({:.1}s) at {} Hz",
                    buffer.frame_count(),
                    buffer.duration().as_secs_f32(),
                    sample_rate
                );
                self.session.buffer = Some(Arc::new(buffer));
                self.session.format = (sample_rate, channels);
                self.set_state(SessionState::Decoded);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to decode audio: {}", e);
                self.set_state(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn play(&mut self) -> Result<(), AudioError> {
        let buffer = self
            .session
            .buffer
            .clone()
            .ok_or_else(|| AudioError::Decode("nothing loaded".to_string()))?;

        // Restart: the running stream is released before a new one is opened,
        // the published state stays Playing across the switch
        let restarted = self.stop_playback().await;

        let stream = match self
            .output
            .open(buffer.sample_rate(), buffer.num_channels())
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                if restarted {
                    self.set_state(SessionState::Stopped);
                }
                return Err(e);
            }
        };

        self.session.generation += 1;
        let generation = self.session.generation;
        let (cancel, cancel_rx) = oneshot::channel();
        let events = self.events_tx.clone();
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            if let PumpOutcome::Ended(result) = pump(buffer, stream, cancel_rx, config).await {
                let _ = events.send(PlaybackEvent::Finished { generation, result });
            }
        });

        self.session.playback = Some(ActivePlayback {
            generation,
            cancel,
            task,
        });
        info!("Playback {} started", generation);
        self.set_state(SessionState::Playing);
        Ok(())
    }

    /// Cancel the running pump and wait until it has released its stream
    async fn stop_playback(&mut self) -> bool {
        let Some(playback) = self.session.playback.take() else {
            return false;
        };

        let _ = playback.cancel.send(());
        if let Err(e) = playback.task.await {
            warn!("Playback task {} did not exit cleanly: {}", playback.generation, e);
        }
        info!("Playback {} stopped", playback.generation);
        true
    }
}

async fn pump(
    buffer: Arc<AudioBuffer>,
    mut stream: Box<dyn OutputStream>,
    mut cancel: oneshot::Receiver<()>,
    config: PlaybackConfig,
) -> PumpOutcome {
    let chunk_frames = config.chunk_frames.max(1);
    let total_frames = buffer.frame_count();
    let chunk_duration = Duration::from_secs_f64(chunk_frames as f64 / buffer.sample_rate() as f64);
    let mut ticker = config.realtime.then(|| tokio::time::interval(chunk_duration));
    let mut scratch = Vec::with_capacity(chunk_frames * buffer.num_channels() as usize);
    let mut position = 0;

    loop {
        match ticker.as_mut() {
            Some(ticker) => {
                tokio::select! {
                    _ = &mut cancel => {
                        finish_cancelled(stream);
                        return PumpOutcome::Cancelled;
                    }
                    _ = ticker.tick() => {}
                }
            }
            None => {
                tokio::task::yield_now().await;
                if !matches!(cancel.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                    finish_cancelled(stream);
                    return PumpOutcome::Cancelled;
                }
            }
        }

        // One extra tick after the last chunk lets it finish sounding
        if position >= total_frames {
            break;
        }

        let end = (position + chunk_frames).min(total_frames);
        buffer.interleave_into(position, end, &mut scratch);
        if let Err(e) = stream.write(&scratch) {
            return PumpOutcome::Ended(Err(e));
        }
        position = end;
    }

    PumpOutcome::Ended(stream.finish())
}

fn finish_cancelled(stream: Box<dyn OutputStream>) {
    if let Err(e) = stream.finish() {
        warn!("Failed to finalize cancelled stream: {}", e);
    }
}
