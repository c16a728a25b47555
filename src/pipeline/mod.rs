//! Resumable stem-to-MIDI batch pipeline.
//!
//! The planner filters each track's units against the completion ledger,
//! the processor saves and transcribes whatever remains, and the
//! orchestrator walks the dataset in a fixed order.

pub mod key;
pub mod layout;
pub mod ledger;
pub mod orchestrator;
pub mod planner;
pub mod processor;
pub mod report;

pub use key::{UnitKey, sanitize_track_name};
pub use layout::{ArtifactLayout, ensure_dir};
pub use ledger::{
    ArtifactLedger, CompletionLedger, FileLedger, Reconciliation, reconcile,
    rebuild_from_artifacts, scan_artifacts,
};
pub use orchestrator::{Batch, BatchOptions, open_ledger};
pub use planner::{PlannedUnit, TrackPlan, plan_track};
pub use processor::{UnitOutcome, UnitProcessor};
pub use report::{BatchReport, FailedUnit};
