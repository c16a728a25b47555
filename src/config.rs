use crate::defaults;
use crate::error::{Result, Stem2MidiError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    pub audio: AudioConfig,
    pub engine: EngineConfig,
}

/// Where tracks are read from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    pub root: Option<PathBuf>,
    pub subsets: Vec<String>,
}

/// Where stems, transcriptions and the ledger are written
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub root: Option<PathBuf>,
    pub ledger: PathBuf,
    pub min_free_mb: u64,
}

/// Batch behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub stems: Vec<String>,
    pub idempotency: IdempotencyMode,
    pub rebuild_ledger: bool,
}

/// Stem audio encoding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_format: SampleFormat,
}

/// Transcription engine invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub command: String,
    pub model_path: Option<PathBuf>,
    pub gpu_memory_growth: bool,
}

/// How the planner decides a unit is already done.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdempotencyMode {
    /// Look the unit key up in the ledger file.
    #[default]
    Ledger,
    /// Probe for the final transcription artifact.
    Artifact,
}

/// Sample encoding for saved stem audio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    #[default]
    Float32,
    Int16,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: None,
            subsets: defaults::DATASET_SUBSETS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: None,
            ledger: PathBuf::from(defaults::LEDGER_FILE),
            min_free_mb: defaults::MIN_FREE_MB,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stems: defaults::STEM_NAMES.iter().map(|s| s.to_string()).collect(),
            idempotency: IdempotencyMode::Ledger,
            rebuild_ledger: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: defaults::ENGINE_COMMAND.to_string(),
            model_path: None,
            gpu_memory_growth: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(Stem2MidiError::from)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if e.downcast_ref::<std::io::Error>()
                    .is_some_and(|io_err| io_err.kind() == std::io::ErrorKind::NotFound) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - STEM2MIDI_DATASET_ROOT → dataset.root
    /// - STEM2MIDI_OUTPUT_ROOT → output.root
    /// - STEM2MIDI_LEDGER → output.ledger
    /// - STEM2MIDI_ENGINE → engine.command
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(root) = std::env::var("STEM2MIDI_DATASET_ROOT")
            && !root.is_empty()
        {
            self.dataset.root = Some(PathBuf::from(root));
        }

        if let Ok(root) = std::env::var("STEM2MIDI_OUTPUT_ROOT")
            && !root.is_empty()
        {
            self.output.root = Some(PathBuf::from(root));
        }

        if let Ok(ledger) = std::env::var("STEM2MIDI_LEDGER")
            && !ledger.is_empty()
        {
            self.output.ledger = PathBuf::from(ledger);
        }

        if let Ok(command) = std::env::var("STEM2MIDI_ENGINE")
            && !command.is_empty()
        {
            self.engine.command = command;
        }

        self
    }

    /// Check values that would otherwise fail halfway through a run.
    pub fn validate(&self) -> Result<()> {
        validate_stems(&self.pipeline.stems)?;

        if self.engine.command.trim().is_empty() {
            return Err(Stem2MidiError::ConfigInvalidValue {
                key: "engine.command".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        if self.output.ledger.as_os_str().is_empty() {
            return Err(Stem2MidiError::ConfigInvalidValue {
                key: "output.ledger".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/stem2midi/config.toml on Linux, or a path relative
    /// to the working directory when no config directory is known.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stem2midi")
            .join("config.toml")
    }
}

/// Stem identifiers become directory and file name components, so they must
/// be non-empty, separator-free and unique.
pub fn validate_stems(stems: &[String]) -> Result<()> {
    if stems.is_empty() {
        return Err(Stem2MidiError::ConfigInvalidValue {
            key: "pipeline.stems".to_string(),
            message: "must name at least one stem".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for stem in stems {
        if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
            return Err(Stem2MidiError::ConfigInvalidValue {
                key: "pipeline.stems".to_string(),
                message: format!("'{stem}' is not a valid stem identifier"),
            });
        }
        if !seen.insert(stem.as_str()) {
            return Err(Stem2MidiError::ConfigInvalidValue {
                key: "pipeline.stems".to_string(),
                message: format!("'{stem}' is listed more than once"),
            });
        }
    }

    Ok(())
}
