//! Unit keys.
//!
//! A key names one (track, stem) unit of work. It is the file stem of the
//! saved audio, the prefix of the MIDI artifact and the ledger entry, so it
//! must be identical on every run.

use crate::defaults;
use std::fmt;

/// Stable, filesystem-safe identifier of a (track, stem) unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey(String);

impl UnitKey {
    /// `<sanitized track>_<stem>`.
    pub fn new(track: &str, stem: &str) -> Self {
        Self(format!("{}_{}", sanitize_track_name(track), stem))
    }

    /// Wrap a key read back from a ledger or artifact name.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key belongs to `stem`.
    pub fn has_stem(&self, stem: &str) -> bool {
        self.0
            .strip_suffix(stem)
            .is_some_and(|rest| rest.len() > 1 && rest.ends_with('_'))
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UnitKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace path separators so a track name can be used as a file name.
pub fn sanitize_track_name(name: &str) -> String {
    name.replace(['/', '\\'], &defaults::SEPARATOR_REPLACEMENT.to_string())
}
