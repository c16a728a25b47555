//! Work planning: which units of a track still need processing.

use crate::dataset::Track;
use crate::pipeline::key::UnitKey;
use crate::pipeline::ledger::CompletionLedger;

/// One unit that still has to be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUnit {
    pub stem: String,
    pub key: UnitKey,
}

/// Outcome of planning one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackPlan {
    /// Units to process, in recognized-stem order.
    pub pending: Vec<PlannedUnit>,
    /// Units the ledger reports as done.
    pub skipped: Vec<UnitKey>,
    /// Recognized stems the track does not provide.
    pub missing: Vec<String>,
}

/// Split the recognized stems of `track` into pending, done and absent.
///
/// Consults only the ledger, so it runs before any audio is decoded or
/// written.
pub fn plan_track(track: &Track, stems: &[String], ledger: &dyn CompletionLedger) -> TrackPlan {
    let mut plan = TrackPlan::default();

    for stem in stems {
        if !track.has_stem(stem) {
            tracing::debug!("{} has no {} stem", track.name, stem);
            plan.missing.push(stem.clone());
            continue;
        }

        let key = UnitKey::new(&track.name, stem);
        if ledger.is_complete(stem, &key) {
            tracing::info!("Skipping {}: already processed", key);
            plan.skipped.push(key);
            continue;
        }

        plan.pending.push(PlannedUnit {
            stem: stem.clone(),
            key,
        });
    }

    plan
}
