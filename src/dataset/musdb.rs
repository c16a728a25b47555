//! MUSDB18 dataset in its decoded-WAV layout.
//!
//! ```text
//! <root>/train/<Track Name>/mixture.wav
//! <root>/train/<Track Name>/vocals.wav
//! <root>/test/<Track Name>/...
//! ```
//!
//! When none of the configured subset directories exist, track directories
//! are read directly from `<root>`.

use crate::dataset::track::{AudioBuffer, Dataset, Track};
use crate::defaults;
use crate::error::{Result, Stem2MidiError};
use std::fs;
use std::path::{Path, PathBuf};

/// Dataset backed by one directory of `<stem>.wav` files per track.
#[derive(Debug, Clone)]
pub struct WavStemDataset {
    root: PathBuf,
    tracks: Vec<TrackDir>,
}

#[derive(Debug, Clone)]
struct TrackDir {
    name: String,
    path: PathBuf,
}

impl WavStemDataset {
    /// Enumerate track directories under `root`.
    ///
    /// A missing root is a configuration failure.
    pub fn open(root: &Path, subsets: &[String]) -> Result<Self> {
        if !root.is_dir() {
            return Err(Stem2MidiError::DatasetNotFound {
                path: root.display().to_string(),
            });
        }

        let subset_dirs: Vec<PathBuf> = subsets
            .iter()
            .map(|s| root.join(s))
            .filter(|p| p.is_dir())
            .collect();

        let mut tracks = Vec::new();
        if subset_dirs.is_empty() {
            tracks.extend(list_track_dirs(root)?);
        } else {
            for dir in &subset_dirs {
                tracks.extend(list_track_dirs(dir)?);
            }
        }

        // Keys and lookups go by track name, so a name may appear only once.
        let mut seen = std::collections::HashSet::new();
        for track in &tracks {
            if !seen.insert(track.name.as_str()) {
                return Err(Stem2MidiError::ConfigInvalidValue {
                    key: "dataset.subsets".to_string(),
                    message: format!("track '{}' appears in more than one subset", track.name),
                });
            }
        }

        tracing::debug!(
            "Found {} track directories under {}",
            tracks.len(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            tracks,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Subdirectories of `dir`, sorted by name.
fn list_track_dirs(dir: &Path) -> Result<Vec<TrackDir>> {
    let mut tracks = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        tracks.push(TrackDir {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path(),
        });
    }
    tracks.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tracks)
}

/// Stem identifiers of the `*.wav` files in a track directory, sorted.
fn list_stems(dir: &Path) -> Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(defaults::AUDIO_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

fn stem_load_error(track: &str, stem: &str, message: impl std::fmt::Display) -> Stem2MidiError {
    Stem2MidiError::StemLoad {
        track: track.to_string(),
        stem: stem.to_string(),
        message: message.to_string(),
    }
}

impl Dataset for WavStemDataset {
    fn len(&self) -> usize {
        self.tracks.len()
    }

    fn track(&self, index: usize) -> Result<Track> {
        let dir = self.tracks.get(index).ok_or_else(|| {
            Stem2MidiError::Other(format!("track index {index} out of range"))
        })?;

        let stems = list_stems(&dir.path)?;

        // The mixture is always present in MUSDB18; fall back to any stem.
        let header_stem = stems
            .iter()
            .find(|s| s.as_str() == defaults::STEM_NAMES[0])
            .or_else(|| stems.first());

        let sample_rate = match header_stem {
            Some(stem) => {
                let path = dir.path.join(format!("{stem}.{}", defaults::AUDIO_EXTENSION));
                hound::WavReader::open(&path)
                    .map_err(|e| stem_load_error(&dir.name, stem, e))?
                    .spec()
                    .sample_rate
            }
            None => 0,
        };

        Ok(Track {
            name: dir.name.clone(),
            sample_rate,
            stems,
        })
    }

    fn load_stem(&self, track: &Track, stem: &str) -> Result<AudioBuffer> {
        let dir = self
            .tracks
            .iter()
            .find(|t| t.name == track.name)
            .ok_or_else(|| stem_load_error(&track.name, stem, "track not in dataset"))?;

        let path = dir.path.join(format!("{stem}.{}", defaults::AUDIO_EXTENSION));
        let mut reader =
            hound::WavReader::open(&path).map_err(|e| stem_load_error(&track.name, stem, e))?;
        let spec = reader.spec();
        if spec.sample_rate != track.sample_rate {
            return Err(stem_load_error(
                &track.name,
                stem,
                format!(
                    "sample rate {} Hz differs from the track's {} Hz",
                    spec.sample_rate, track.sample_rate
                ),
            ));
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| stem_load_error(&track.name, stem, e))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| stem_load_error(&track.name, stem, e))?
            }
        };

        AudioBuffer::new(spec.channels, samples)
            .map_err(|e| stem_load_error(&track.name, stem, e))
    }
}
