//! Transcription through the `basic-pitch` command-line tool.
//!
//! Each call runs one blocking subprocess. Model loading and hardware setup
//! happen inside that process, so nothing is held between units.

use crate::config::EngineConfig;
use crate::defaults;
use crate::diagnostics::{CheckResult, check_command};
use crate::error::{Result, Stem2MidiError};
use crate::transcribe::engine::{OutputOptions, TranscriptionEngine};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Lines of engine stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 5;

/// Engine that shells out to `basic-pitch`.
#[derive(Debug, Clone)]
pub struct BasicPitchEngine {
    command: String,
    model_path: Option<PathBuf>,
    gpu_memory_growth: bool,
}

impl BasicPitchEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            command: config.command.clone(),
            model_path: config.model_path.clone(),
            gpu_memory_growth: config.gpu_memory_growth,
        }
    }

    /// Arguments for one invocation: flags, then output directory, then inputs.
    pub fn build_args(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &OutputOptions,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if options.save_midi {
            args.push("--save-midi".into());
        }
        if options.sonify_midi {
            args.push("--sonify-midi".into());
        }
        if options.save_model_outputs {
            args.push("--save-model-outputs".into());
        }
        if options.save_notes {
            args.push("--save-note-events".into());
        }
        if let Some(model) = &self.model_path {
            args.push("--model-path".into());
            args.push(model.into());
        }
        args.push(output_dir.into());
        args.extend(inputs.iter().map(OsString::from));
        args
    }
}

/// Last few non-empty lines of a stderr capture.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}

impl TranscriptionEngine for BasicPitchEngine {
    fn name(&self) -> &str {
        &self.command
    }

    fn preflight(&self) -> Result<()> {
        match check_command(&self.command, "--help") {
            CheckResult::Ok => {}
            CheckResult::NotFound => {
                return Err(Stem2MidiError::EngineNotFound {
                    command: self.command.clone(),
                });
            }
            CheckResult::Warning(msg) => {
                return Err(Stem2MidiError::ConfigInvalidValue {
                    key: "engine.command".to_string(),
                    message: msg,
                });
            }
        }

        if let Some(model) = &self.model_path
            && !model.exists()
        {
            return Err(Stem2MidiError::ConfigInvalidValue {
                key: "engine.model_path".to_string(),
                message: format!("{} does not exist", model.display()),
            });
        }

        if self.gpu_memory_growth {
            tracing::info!(
                "Transcription engine {} (device memory growth enabled)",
                self.command
            );
        } else {
            tracing::info!("Transcription engine {}", self.command);
        }
        Ok(())
    }

    fn predict_and_save(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &OutputOptions,
    ) -> Result<()> {
        if inputs.is_empty() {
            return Err(Stem2MidiError::Transcription {
                message: "no input files".to_string(),
            });
        }

        let args = self.build_args(inputs, output_dir, options);
        tracing::debug!("Running {} {:?}", self.command, args);

        let mut command = Command::new(&self.command);
        command.args(&args);
        if self.gpu_memory_growth {
            command.env(defaults::GPU_MEMORY_GROWTH_ENV, "true");
        }

        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Stem2MidiError::EngineNotFound {
                    command: self.command.clone(),
                }
            } else {
                Stem2MidiError::Transcription {
                    message: format!("failed to start {}: {}", self.command, e),
                }
            }
        })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Stem2MidiError::Transcription {
                message: format!(
                    "{} exited with {}: {}",
                    self.command,
                    output.status,
                    stderr_tail(&output.stderr)
                ),
            })
        }
    }
}
