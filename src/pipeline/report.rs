//! Run statistics.

use serde::Serialize;
use std::fmt;

/// A unit that failed during a run and stays pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUnit {
    pub key: String,
    pub error: String,
}

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Tracks visited.
    pub tracks: usize,
    /// Tracks whose metadata could not be read.
    pub unreadable_tracks: usize,
    /// Units transcribed and recorded in this run.
    pub processed: usize,
    /// Units already done before this run.
    pub skipped: usize,
    /// Recognized stems absent from their track.
    pub missing: usize,
    /// Units that failed and remain pending.
    pub failed: Vec<FailedUnit>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unreadable_tracks == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tracks: {} processed, {} skipped, {} missing, {} failed",
            self.tracks,
            self.processed,
            self.skipped,
            self.missing,
            self.failed.len()
        )?;
        if self.unreadable_tracks > 0 {
            write!(f, ", {} unreadable tracks", self.unreadable_tracks)?;
        }
        Ok(())
    }
}
