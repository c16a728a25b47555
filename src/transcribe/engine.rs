use crate::defaults;
use crate::error::{Result, Stem2MidiError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Which files the engine should write for each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub save_midi: bool,
    pub sonify_midi: bool,
    pub save_model_outputs: bool,
    pub save_notes: bool,
}

impl OutputOptions {
    /// Only the note/MIDI artifact.
    pub fn midi_only() -> Self {
        Self {
            save_midi: true,
            sonify_midi: false,
            save_model_outputs: false,
            save_notes: false,
        }
    }
}

/// Trait for audio-to-MIDI transcription.
///
/// This trait allows swapping implementations (the basic-pitch CLI vs mock).
pub trait TranscriptionEngine {
    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// One-time startup check, run before any unit is processed.
    ///
    /// An error here is a configuration failure and aborts the run.
    fn preflight(&self) -> Result<()> {
        Ok(())
    }

    /// Transcribe each input file, writing `<input stem>_basic_pitch.mid`
    /// into `output_dir`. Blocks until the engine is done.
    fn predict_and_save(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &OutputOptions,
    ) -> Result<()>;

    /// Release transient inference state after a unit finishes.
    fn release_resources(&self) {}
}

/// File name of the MIDI artifact the engine writes for `input`.
pub fn artifact_file_name(input: &Path) -> Option<String> {
    let stem = input.file_stem()?.to_str()?;
    Some(format!("{stem}{}", defaults::ARTIFACT_SUFFIX))
}

/// Minimal valid single-track MIDI file.
const PLACEHOLDER_MIDI: &[u8] = &[
    b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0, b'M', b'T', b'r', b'k', 0, 0, 0,
    4, 0x00, 0xFF, 0x2F, 0x00,
];

/// Mock engine for testing.
///
/// Writes a placeholder MIDI file per input and records every call. Clones
/// share their call log, so a test can keep one handle while the pipeline
/// uses another.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    failing_inputs: HashSet<String>,
    skip_artifact: bool,
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    releases: usize,
}

/// One recorded `predict_and_save` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub options: OutputOptions,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail whenever an input's file stem equals `file_stem`.
    pub fn with_failure_for(mut self, file_stem: &str) -> Self {
        self.failing_inputs.insert(file_stem.to_string());
        self
    }

    /// Report success without writing any artifact.
    pub fn without_artifacts(mut self) -> Self {
        self.skip_artifact = true;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().map(|s| s.calls.len()).unwrap_or(0)
    }

    pub fn release_count(&self) -> usize {
        self.state.lock().map(|s| s.releases).unwrap_or(0)
    }
}

impl TranscriptionEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn predict_and_save(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        options: &OutputOptions,
    ) -> Result<()> {
        if let Ok(mut state) = self.state.lock() {
            state.calls.push(MockCall {
                inputs: inputs.to_vec(),
                output_dir: output_dir.to_path_buf(),
                options: *options,
            });
        }

        for input in inputs {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            if self.failing_inputs.contains(stem) {
                return Err(Stem2MidiError::Transcription {
                    message: format!("mock transcription failure for {stem}"),
                });
            }
            if !input.is_file() {
                return Err(Stem2MidiError::Transcription {
                    message: format!("input {} does not exist", input.display()),
                });
            }
            if self.skip_artifact {
                continue;
            }

            let name = artifact_file_name(input).ok_or_else(|| Stem2MidiError::Transcription {
                message: format!("input {} has no file name", input.display()),
            })?;
            let artifact = output_dir.join(name);
            if artifact.exists() {
                return Err(Stem2MidiError::Transcription {
                    message: format!("File {} already exists", artifact.display()),
                });
            }
            fs::write(&artifact, PLACEHOLDER_MIDI)?;
        }

        Ok(())
    }

    fn release_resources(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.releases += 1;
        }
    }
}
