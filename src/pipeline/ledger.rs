//! Completion ledger.
//!
//! Records which units finished. The MIDI artifacts on disk are the source of
//! truth; the ledger file is a cache over them that can always be rebuilt
//! with [`rebuild_from_artifacts`].

use crate::defaults;
use crate::error::{Result, Stem2MidiError};
use crate::pipeline::key::UnitKey;
use crate::pipeline::layout::{ArtifactLayout, ensure_dir};
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Durable set of completed unit keys.
pub trait CompletionLedger {
    /// Whether the unit is already done.
    fn is_complete(&self, stem: &str, key: &UnitKey) -> bool;

    /// Mark a unit done. Only called after its artifact is complete.
    fn record(&mut self, stem: &str, key: &UnitKey) -> Result<()>;

    /// Every completed key.
    fn completed(&self) -> Result<BTreeSet<UnitKey>>;
}

fn ledger_error(path: &Path, e: impl std::fmt::Display) -> Stem2MidiError {
    Stem2MidiError::Ledger {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Ledger backed by a text file with one key per line.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    keys: HashSet<UnitKey>,
}

impl FileLedger {
    /// Read the ledger at `path`. A missing file is an empty ledger.
    ///
    /// Lines are trimmed, blank lines skipped and duplicates collapsed. A
    /// final line without a newline is a torn append and is ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let keys = match fs::read_to_string(path) {
            Ok(contents) => parse_keys(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(ledger_error(path, e)),
        };

        tracing::debug!("Loaded {} ledger entries from {}", keys.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            keys,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &UnitKey) -> bool {
        self.keys.contains(key)
    }

    /// Append `key` and flush it to disk before returning.
    ///
    /// A torn final line left by a crash is truncated first, so a fragment
    /// that happens to spell another key never becomes a ledger entry.
    pub fn append(&mut self, key: &UnitKey) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            ensure_dir(parent).map_err(|e| ledger_error(&self.path, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| ledger_error(&self.path, e))?;

        drop_torn_tail(&mut file).map_err(|e| ledger_error(&self.path, e))?;

        let mut line = key.as_str().to_string();
        line.push('\n');

        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|e| ledger_error(&self.path, e))?;

        self.keys.insert(key.clone());
        Ok(())
    }
}

/// Keys of every newline-terminated line. An unterminated final line is a
/// torn append and is not a key.
fn parse_keys(contents: &str) -> HashSet<UnitKey> {
    contents
        .split_inclusive('\n')
        .filter(|l| l.ends_with('\n'))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(UnitKey::from_raw)
        .collect()
}

/// Truncate an unterminated final line left by a crash mid-append.
fn drop_torn_tail(file: &mut File) -> io::Result<()> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    file.seek(SeekFrom::Start(0))?;
    let mut contents = Vec::with_capacity(len as usize);
    file.read_to_end(&mut contents)?;
    let keep = contents
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    tracing::warn!(
        "Dropping torn ledger line {:?}",
        String::from_utf8_lossy(&contents[keep..])
    );
    file.set_len(keep as u64)
}

impl CompletionLedger for FileLedger {
    fn is_complete(&self, _stem: &str, key: &UnitKey) -> bool {
        self.contains(key)
    }

    fn record(&mut self, _stem: &str, key: &UnitKey) -> Result<()> {
        if self.contains(key) {
            return Ok(());
        }
        self.append(key)
    }

    fn completed(&self) -> Result<BTreeSet<UnitKey>> {
        Ok(self.keys.iter().cloned().collect())
    }
}

/// Ledger that answers from the artifact tree directly.
#[derive(Debug, Clone)]
pub struct ArtifactLedger {
    layout: ArtifactLayout,
    stems: Vec<String>,
}

impl ArtifactLedger {
    pub fn new(layout: ArtifactLayout, stems: Vec<String>) -> Self {
        Self { layout, stems }
    }
}

impl CompletionLedger for ArtifactLedger {
    fn is_complete(&self, stem: &str, key: &UnitKey) -> bool {
        artifact_complete(&self.layout.artifact_path(stem, key))
    }

    fn record(&mut self, _stem: &str, _key: &UnitKey) -> Result<()> {
        // The artifact itself is the record.
        Ok(())
    }

    fn completed(&self) -> Result<BTreeSet<UnitKey>> {
        scan_artifacts(&self.layout, &self.stems)
    }
}

/// A finished transcription is a non-empty regular file.
pub fn artifact_complete(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// Keys of every complete artifact under `<root>/<stem>/midi/`.
///
/// Files whose name does not end in `_<stem>_basic_pitch.mid` are ignored.
pub fn scan_artifacts(layout: &ArtifactLayout, stems: &[String]) -> Result<BTreeSet<UnitKey>> {
    let mut keys = BTreeSet::new();

    for stem in stems {
        let midi_dir = layout.midi_dir(stem);
        if !midi_dir.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&midi_dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !artifact_complete(entry.path()) {
                continue;
            }
            let Some(name) = entry.file_name().to_str() else {
                continue;
            };
            let Some(raw) = name.strip_suffix(defaults::ARTIFACT_SUFFIX) else {
                continue;
            };
            let key = UnitKey::from_raw(raw);
            if key.has_stem(stem) {
                keys.insert(key);
            } else {
                tracing::debug!("Ignoring {} (not a {} artifact)", name, stem);
            }
        }
    }

    Ok(keys)
}

/// Rewrite the ledger at `ledger_path` to exactly the set of complete
/// artifacts.
///
/// The new contents are written to a sibling temporary file and renamed over
/// the old ledger, so a crash leaves either the old or the new ledger.
pub fn rebuild_from_artifacts(
    layout: &ArtifactLayout,
    stems: &[String],
    ledger_path: &Path,
) -> Result<FileLedger> {
    // A mistyped root would otherwise look like an empty tree and wipe the
    // ledger.
    if !layout.root().is_dir() {
        return Err(Stem2MidiError::OutputRootNotFound {
            path: layout.root().display().to_string(),
        });
    }

    let keys = scan_artifacts(layout, stems)?;

    if let Some(parent) = ledger_path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent).map_err(|e| ledger_error(ledger_path, e))?;
    }

    let mut tmp_name = ledger_path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut contents = String::new();
    for key in &keys {
        contents.push_str(key.as_str());
        contents.push('\n');
    }

    File::create(&tmp_path)
        .and_then(|mut f| {
            f.write_all(contents.as_bytes())?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp_path, ledger_path))
        .map_err(|e| ledger_error(ledger_path, e))?;

    tracing::info!(
        "Rebuilt ledger {} with {} entries",
        ledger_path.display(),
        keys.len()
    );

    Ok(FileLedger {
        path: ledger_path.to_path_buf(),
        keys: keys.into_iter().collect(),
    })
}

/// Differences between a ledger and the artifact tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// In the ledger, but the artifact is missing or empty.
    pub stale: Vec<UnitKey>,
    /// Artifact present, but not in the ledger.
    pub untracked: Vec<UnitKey>,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.stale.is_empty() && self.untracked.is_empty()
    }
}

/// Compare ledger keys with artifact keys.
pub fn reconcile(ledger: &BTreeSet<UnitKey>, artifacts: &BTreeSet<UnitKey>) -> Reconciliation {
    Reconciliation {
        stale: ledger.difference(artifacts).cloned().collect(),
        untracked: artifacts.difference(ledger).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stems() -> Vec<String> {
        vec!["mixture".to_string(), "vocals".to_string()]
    }

    fn write_artifact(layout: &ArtifactLayout, stem: &str, track: &str) -> UnitKey {
        let key = UnitKey::new(track, stem);
        let path = layout.artifact_path(stem, &key);
        ensure_dir(path.parent().unwrap()).unwrap();
        fs::write(&path, b"MThd").unwrap();
        key
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = FileLedger::load(&dir.path().join("processed_tracks.log")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn load_treats_lines_as_a_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        fs::write(&path, "T1_mixture\n\n  T1_vocals  \nT1_mixture\n").unwrap();

        let ledger = FileLedger::load(&path).unwrap();

        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(&UnitKey::new("T1", "mixture")));
        assert!(ledger.contains(&UnitKey::new("T1", "vocals")));
    }

    #[test]
    fn append_is_visible_to_a_fresh_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        let key = UnitKey::new("Artist/Song 1", "bass");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.append(&key).unwrap();
        drop(ledger);

        assert_eq!(fs::read_to_string(&path).unwrap(), "Artist-Song 1_bass\n");
        assert!(FileLedger::load(&path).unwrap().contains(&key));
    }

    #[test]
    fn append_same_key_twice_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        let key = UnitKey::new("T1", "mixture");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.append(&key).unwrap();
        ledger.append(&key).unwrap();

        let reloaded = FileLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn record_skips_keys_already_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        let key = UnitKey::new("T1", "mixture");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.record("mixture", &key).unwrap();
        ledger.record("mixture", &key).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn append_after_torn_line_replaces_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        fs::write(&path, "T1_mixture\nT1_voc").unwrap();

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.append(&UnitKey::new("T2", "mixture")).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "T1_mixture\nT2_mixture\n"
        );
        let reloaded = FileLedger::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&UnitKey::new("T2", "mixture")));
    }

    #[test]
    fn torn_line_spelling_another_key_is_not_complete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        // Crash while appending "T1_bass_other" for track "T1_bass".
        fs::write(&path, "T1_mixture\nT1_bass").unwrap();

        let mut ledger = FileLedger::load(&path).unwrap();
        assert!(!ledger.contains(&UnitKey::new("T1", "bass")));
        assert_eq!(ledger.len(), 1);

        ledger.append(&UnitKey::new("T1_bass", "other")).unwrap();

        let reloaded = FileLedger::load(&path).unwrap();
        assert!(!reloaded.contains(&UnitKey::new("T1", "bass")));
        assert!(reloaded.contains(&UnitKey::new("T1_bass", "other")));
    }

    #[test]
    fn file_of_only_a_torn_line_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_tracks.log");
        fs::write(&path, "T1_mix").unwrap();

        let mut ledger = FileLedger::load(&path).unwrap();
        assert!(ledger.is_empty());

        ledger.append(&UnitKey::new("T1", "mixture")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "T1_mixture\n");
    }

    #[test]
    fn append_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("ledger.log");

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.append(&UnitKey::new("T1", "bass")).unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn artifact_ledger_checks_the_filesystem() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let mut ledger = ArtifactLedger::new(layout.clone(), stems());
        let key = UnitKey::new("T1", "vocals");

        assert!(!ledger.is_complete("vocals", &key));
        ledger.record("vocals", &key).unwrap();
        assert!(!ledger.is_complete("vocals", &key));

        write_artifact(&layout, "vocals", "T1");
        assert!(ledger.is_complete("vocals", &key));
    }

    #[test]
    fn empty_artifact_is_not_complete() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let key = UnitKey::new("T1", "mixture");
        let path = layout.artifact_path("mixture", &key);
        ensure_dir(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();

        assert!(!artifact_complete(&path));
        assert!(scan_artifacts(&layout, &stems()).unwrap().is_empty());
    }

    #[test]
    fn scan_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let key = write_artifact(&layout, "mixture", "T1");
        let midi_dir = layout.midi_dir("mixture");
        fs::write(midi_dir.join("notes.csv"), b"x").unwrap();
        fs::write(midi_dir.join("T9_vocals_basic_pitch.mid"), b"MThd").unwrap();

        let keys = scan_artifacts(&layout, &stems()).unwrap();

        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![key]);
    }

    #[test]
    fn rebuild_yields_exactly_the_artifact_set() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("stems"));
        let ledger_path = dir.path().join("processed_tracks.log");
        let a = write_artifact(&layout, "mixture", "A");
        let b = write_artifact(&layout, "mixture", "B");
        let c = write_artifact(&layout, "vocals", "C");
        fs::write(&ledger_path, "A_mixture\nGone_vocals\n").unwrap();

        let rebuilt = rebuild_from_artifacts(&layout, &stems(), &ledger_path).unwrap();

        let expected: BTreeSet<UnitKey> = [a, b, c].into_iter().collect();
        assert_eq!(rebuilt.completed().unwrap(), expected);
        assert_eq!(FileLedger::load(&ledger_path).unwrap().completed().unwrap(), expected);
        assert_eq!(
            fs::read_to_string(&ledger_path).unwrap(),
            "A_mixture\nB_mixture\nC_vocals\n"
        );
        assert!(!dir.path().join("processed_tracks.log.tmp").exists());
    }

    #[test]
    fn rebuild_of_empty_tree_clears_ledger() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("stems"));
        ensure_dir(layout.root()).unwrap();
        let ledger_path = dir.path().join("processed_tracks.log");
        fs::write(&ledger_path, "Old_mixture\n").unwrap();

        let rebuilt = rebuild_from_artifacts(&layout, &stems(), &ledger_path).unwrap();

        assert!(rebuilt.is_empty());
        assert_eq!(fs::read_to_string(&ledger_path).unwrap(), "");
    }

    #[test]
    fn rebuild_with_missing_root_keeps_ledger() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("typo-does-not-exist"));
        let ledger_path = dir.path().join("processed_tracks.log");
        fs::write(&ledger_path, "A_bass\nB_bass\nC_bass\n").unwrap();

        let result = rebuild_from_artifacts(&layout, &["bass".to_string()], &ledger_path);

        assert!(matches!(
            result,
            Err(Stem2MidiError::OutputRootNotFound { .. })
        ));
        assert_eq!(
            fs::read_to_string(&ledger_path).unwrap(),
            "A_bass\nB_bass\nC_bass\n"
        );
        assert!(!layout.root().exists());
    }

    #[test]
    fn reconcile_reports_both_directions() {
        let ledger: BTreeSet<UnitKey> = [UnitKey::new("A", "bass"), UnitKey::new("B", "bass")]
            .into_iter()
            .collect();
        let artifacts: BTreeSet<UnitKey> = [UnitKey::new("B", "bass"), UnitKey::new("C", "bass")]
            .into_iter()
            .collect();

        let result = reconcile(&ledger, &artifacts);

        assert_eq!(result.stale, vec![UnitKey::new("A", "bass")]);
        assert_eq!(result.untracked, vec![UnitKey::new("C", "bass")]);
        assert!(!result.is_consistent());
        assert!(reconcile(&artifacts, &artifacts).is_consistent());
    }
}
