//! Default configuration constants for stem2midi.
//!
//! Shared by the config layer, the CLI and the pipeline so the on-disk
//! layout stays consistent between runs.

/// Recognized stem identifiers, in processing order.
///
/// Follows the MUSDB18 convention: the full mixture followed by the four
/// isolated parts.
pub const STEM_NAMES: [&str; 5] = ["mixture", "drums", "bass", "other", "vocals"];

/// Default ledger file, relative to the working directory.
pub const LEDGER_FILE: &str = "processed_tracks.log";

/// Name of the per-stem directory holding transcription output.
pub const MIDI_DIR: &str = "midi";

/// Suffix the transcription engine appends to the input file stem.
pub const ARTIFACT_SUFFIX: &str = "_basic_pitch.mid";

/// Extension of saved stem audio.
pub const AUDIO_EXTENSION: &str = "wav";

/// Default transcription engine executable.
pub const ENGINE_COMMAND: &str = "basic-pitch";

/// Environment variable that makes TensorFlow grow device memory on demand
/// instead of reserving it all up front.
pub const GPU_MEMORY_GROWTH_ENV: &str = "TF_FORCE_GPU_ALLOW_GROWTH";

/// MUSDB18 subset directories, scanned in this order.
pub const DATASET_SUBSETS: [&str; 2] = ["train", "test"];

/// Free space below which a run starts with a warning.
///
/// One stereo 44.1kHz float track of four minutes is roughly 85 MB per stem.
pub const MIN_FREE_MB: u64 = 2048;

/// Replacement for path separators in track names.
pub const SEPARATOR_REPLACEMENT: char = '-';
