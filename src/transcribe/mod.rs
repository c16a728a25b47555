//! Audio-to-MIDI transcription engines.

pub mod basic_pitch;
pub mod engine;

pub use basic_pitch::BasicPitchEngine;
pub use engine::{MockEngine, OutputOptions, TranscriptionEngine, artifact_file_name};
