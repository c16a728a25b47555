//! On-disk artifact layout.
//!
//! ```text
//! <root>/<stem>/<key>.wav
//! <root>/<stem>/midi/<key>_basic_pitch.mid
//! ```

use crate::defaults;
use crate::error::Result;
use crate::pipeline::key::UnitKey;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Paths of everything a run writes under the output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stem_dir(&self, stem: &str) -> PathBuf {
        self.root.join(stem)
    }

    pub fn midi_dir(&self, stem: &str) -> PathBuf {
        self.stem_dir(stem).join(defaults::MIDI_DIR)
    }

    pub fn audio_path(&self, stem: &str, key: &UnitKey) -> PathBuf {
        self.stem_dir(stem)
            .join(format!("{}.{}", key, defaults::AUDIO_EXTENSION))
    }

    pub fn artifact_path(&self, stem: &str, key: &UnitKey) -> PathBuf {
        self.midi_dir(stem)
            .join(format!("{}{}", key, defaults::ARTIFACT_SUFFIX))
    }

    /// Create `<root>/<stem>` for every recognized stem.
    pub fn ensure_stem_dirs(&self, stems: &[String]) -> Result<()> {
        for stem in stems {
            ensure_dir(&self.stem_dir(stem))?;
        }
        Ok(())
    }
}

/// Create `path` and any missing ancestors.
///
/// A directory that already exists, including one created concurrently by
/// another process, counts as success.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}
