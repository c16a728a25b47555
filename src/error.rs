//! Error types for stem2midi.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Stem2MidiError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Dataset errors
    #[error("Dataset root not found at {path}")]
    DatasetNotFound { path: String },

    #[error("Failed to read stem {stem} of track {track}: {message}")]
    StemLoad {
        track: String,
        stem: String,
        message: String,
    },

    #[error("Output root not found at {path}")]
    OutputRootNotFound { path: String },

    // Audio write errors
    #[error("Failed to write audio to {path}: {message}")]
    AudioWrite { path: String, message: String },

    // Transcription errors
    #[error("Transcription engine not found: {command}")]
    EngineNotFound { command: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    #[error("Transcription finished but produced no artifact at {path}")]
    ArtifactMissing { path: String },

    // Ledger errors
    #[error("Ledger error at {path}: {message}")]
    Ledger { path: String, message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Stem2MidiError {
    /// Whether this error is contained to a single (track, stem) unit.
    ///
    /// Unit failures are logged and leave the unit pending; everything else
    /// aborts the run.
    pub fn is_unit_failure(&self) -> bool {
        matches!(
            self,
            Stem2MidiError::StemLoad { .. }
                | Stem2MidiError::AudioWrite { .. }
                | Stem2MidiError::Transcription { .. }
                | Stem2MidiError::ArtifactMissing { .. }
                | Stem2MidiError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Stem2MidiError>;
