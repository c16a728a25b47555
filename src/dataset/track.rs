use crate::error::{Result, Stem2MidiError};
use std::collections::{BTreeMap, HashSet};

/// Interleaved multichannel samples in the range [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: u16,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples.
    ///
    /// Fails when `channels` is zero or the sample count is not a whole
    /// number of frames.
    pub fn new(channels: u16, samples: Vec<f32>) -> Result<Self> {
        if channels == 0 {
            return Err(Stem2MidiError::Other(
                "audio buffer must have at least one channel".to_string(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(Stem2MidiError::Other(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self { channels, samples })
    }

    /// Build an interleaved buffer from one vector per channel.
    pub fn from_channels(channels: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = channels.first() else {
            return Err(Stem2MidiError::Other(
                "audio buffer must have at least one channel".to_string(),
            ));
        };
        let frames = first.len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(Stem2MidiError::Other(
                "channels have different lengths".to_string(),
            ));
        }
        let count = u16::try_from(channels.len())
            .map_err(|_| Stem2MidiError::Other("too many channels".to_string()))?;

        let mut samples = Vec::with_capacity(frames * channels.len());
        for frame in 0..frames {
            samples.extend(channels.iter().map(|c| c[frame]));
        }
        Self::new(count, samples)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

/// One multi-track recording as exposed by a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track name as the dataset reports it. May contain path separators.
    pub name: String,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
    /// Stem identifiers this track provides.
    pub stems: Vec<String>,
}

impl Track {
    pub fn has_stem(&self, stem: &str) -> bool {
        self.stems.iter().any(|s| s == stem)
    }
}

/// Ordered source of tracks and their per-stem audio.
pub trait Dataset {
    /// Number of tracks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata for the track at `index` (0-based, enumeration order).
    fn track(&self, index: usize) -> Result<Track>;

    /// Decode the raw audio of one stem of `track`.
    fn load_stem(&self, track: &Track, stem: &str) -> Result<AudioBuffer>;
}

/// In-memory dataset, used by tests and for feeding already-decoded audio.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    tracks: Vec<MemoryTrack>,
    unreadable: HashSet<(String, String)>,
}

#[derive(Debug, Clone)]
struct MemoryTrack {
    name: String,
    sample_rate: u32,
    stems: BTreeMap<String, AudioBuffer>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track. Its stems are listed in name order.
    pub fn with_track(
        mut self,
        name: &str,
        sample_rate: u32,
        stems: impl IntoIterator<Item = (String, AudioBuffer)>,
    ) -> Self {
        self.tracks.push(MemoryTrack {
            name: name.to_string(),
            sample_rate,
            stems: stems.into_iter().collect(),
        });
        self
    }

    /// Make loading `stem` of `track` fail, as a corrupt source file would.
    pub fn with_unreadable(mut self, track: &str, stem: &str) -> Self {
        self.unreadable
            .insert((track.to_string(), stem.to_string()));
        self
    }
}

impl Dataset for MemoryDataset {
    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn track(&self, index: usize) -> Result<Track> {
        let track = self.tracks.get(index).ok_or_else(|| {
            Stem2MidiError::Other(format!("track index {index} out of range"))
        })?;
        Ok(Track {
            name: track.name.clone(),
            sample_rate: track.sample_rate,
            stems: track.stems.keys().cloned().collect(),
        })
    }

    fn load_stem(&self, track: &Track, stem: &str) -> Result<AudioBuffer> {
        if self
            .unreadable
            .contains(&(track.name.clone(), stem.to_string()))
        {
            return Err(Stem2MidiError::StemLoad {
                track: track.name.clone(),
                stem: stem.to_string(),
                message: "source unreadable".to_string(),
            });
        }

        self.tracks
            .iter()
            .find(|t| t.name == track.name)
            .and_then(|t| t.stems.get(stem))
            .cloned()
            .ok_or_else(|| Stem2MidiError::StemLoad {
                track: track.name.clone(),
                stem: stem.to_string(),
                message: "stem not present".to_string(),
            })
    }
}
