//! WAV encoder for exported stems.

use crate::config::SampleFormat;
use crate::dataset::AudioBuffer;
use crate::error::{Result, Stem2MidiError};
use std::path::Path;

/// Serializes a raw audio buffer to a file.
pub trait AudioEncoder {
    /// Write `audio` at `sample_rate` to `path`, replacing any existing file.
    fn write(&self, path: &Path, audio: &AudioBuffer, sample_rate: u32) -> Result<()>;
}

/// Multichannel WAV encoder backed by hound.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder {
    format: SampleFormat,
}

impl WavEncoder {
    pub fn new(format: SampleFormat) -> Self {
        Self { format }
    }

    fn spec(&self, channels: u16, sample_rate: u32) -> hound::WavSpec {
        match self.format {
            SampleFormat::Float32 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
            SampleFormat::Int16 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        }
    }
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> Stem2MidiError {
    Stem2MidiError::AudioWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

impl AudioEncoder for WavEncoder {
    fn write(&self, path: &Path, audio: &AudioBuffer, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(write_error(path, "sample rate must be positive"));
        }

        let spec = self.spec(audio.channels(), sample_rate);
        let mut writer = hound::WavWriter::create(path, spec).map_err(|e| write_error(path, e))?;

        match self.format {
            SampleFormat::Float32 => {
                for &sample in audio.samples() {
                    writer
                        .write_sample(sample)
                        .map_err(|e| write_error(path, e))?;
                }
            }
            SampleFormat::Int16 => {
                for &sample in audio.samples() {
                    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
                    writer
                        .write_sample(value)
                        .map_err(|e| write_error(path, e))?;
                }
            }
        }

        writer.finalize().map_err(|e| write_error(path, e))
    }
}
