//! stem2midi - Resumable stem export and MIDI transcription
//!
//! Saves each stem of a multi-track dataset as WAV and transcribes it to
//! MIDI, skipping units a previous run already finished.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dataset;
pub mod defaults;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sys;
pub mod transcribe;

// Core traits (dataset → encoder → engine → ledger)
pub use audio::AudioEncoder;
pub use dataset::Dataset;
pub use pipeline::CompletionLedger;
pub use transcribe::TranscriptionEngine;

// Implementations
pub use audio::WavEncoder;
pub use dataset::{AudioBuffer, MemoryDataset, Track, WavStemDataset};
pub use pipeline::{ArtifactLedger, FileLedger};
pub use transcribe::{BasicPitchEngine, MockEngine, OutputOptions};

// Pipeline
pub use pipeline::{ArtifactLayout, Batch, BatchOptions, BatchReport, UnitKey, open_ledger};

// Error handling
pub use error::{Result, Stem2MidiError};

// Config
pub use config::{Config, IdempotencyMode, SampleFormat};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
