use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, info};

use super::pcm::to_i16;
use super::AudioError;

/// A device or sink audio can be played to
///
/// Opening may involve acquiring a hardware resource, so it is async. The
/// returned stream holds that resource until it is finished or dropped.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn open(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputStream>, AudioError>;
}

/// An open output; dropping it releases the underlying resource
pub trait OutputStream: Send {
    /// Write interleaved normalized samples
    fn write(&mut self, interleaved: &[f32]) -> Result<(), AudioError>;

    /// Flush and release
    fn finish(self: Box<Self>) -> Result<(), AudioError>;
}

/// Renders playback into a 16-bit PCM WAV file
///
/// Each opened stream overwrites the file, so a replaced session leaves only
/// the audio of the last one.
#[derive(Debug, Clone)]
pub struct WavOutput {
    path: PathBuf,
}

impl WavOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AudioOutput for WavOutput {
    async fn open(&self, sample_rate: u32, channels: u16) -> Result<Box<dyn OutputStream>, AudioError> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AudioError::Output(format!("cannot create {:?}: {}", parent, e)))?;
            }
        }

        let writer = WavWriter::create(&self.path, spec)
            .map_err(|e| AudioError::Output(format!("cannot open {:?}: {}", self.path, e)))?;

        info!("Opened WAV output {:?} ({} Hz, {} ch)", self.path, sample_rate, channels);
        Ok(Box::new(WavStream {
            writer: Some(writer),
            path: self.path.clone(),
        }))
    }
}

struct WavStream {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
}

impl OutputStream for WavStream {
    fn write(&mut self, interleaved: &[f32]) -> Result<(), AudioError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AudioError::Output("stream already finished".to_string()))?;

        for &sample in interleaved {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| AudioError::Output(format!("write to {:?} failed: {}", self.path, e)))?;
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<(), AudioError> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| AudioError::Output(format!("finalize {:?} failed: {}", self.path, e)))?;
            debug!("Finalized WAV output {:?}", self.path);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wav_output_writes_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guides").join("coliseo.wav");
        let output = WavOutput::new(&path);

        let mut stream = output.open(24000, 1).await.unwrap();
        stream.write(&[0.0, 0.5, -0.5, 1.0]).unwrap();
        stream.finish().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16384, -16384, 32767]);
    }

    #[tokio::test]
    async fn test_dropped_wav_stream_is_still_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");
        let output = WavOutput::new(&path);

        {
            let mut stream = output.open(24000, 1).await.unwrap();
            stream.write(&[0.25; 10]).unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 10);
    }
}
