//! Batch orchestration over a whole dataset.
//!
//! Tracks are visited in dataset order and, within a track, stems in
//! recognized order. Every unit is independent: a failure is logged and the
//! run moves on.

use crate::audio::AudioEncoder;
use crate::config::IdempotencyMode;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::pipeline::layout::ArtifactLayout;
use crate::pipeline::ledger::{ArtifactLedger, CompletionLedger, FileLedger, rebuild_from_artifacts};
use crate::pipeline::planner::plan_track;
use crate::pipeline::processor::{UnitOutcome, UnitProcessor};
use crate::pipeline::report::{BatchReport, FailedUnit};
use crate::sys;
use crate::transcribe::TranscriptionEngine;
use std::path::Path;

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Recognized stem identifiers, in processing order.
    pub stems: Vec<String>,
    /// Process at most this many tracks.
    pub limit: Option<usize>,
    /// Warn when the output filesystem has less free space than this.
    pub min_free_mb: Option<u64>,
}

/// Open the completion ledger for `mode`.
///
/// In ledger mode the file is rebuilt from the artifact tree first when
/// `rebuild` is set. Artifact mode has no file to rebuild and only warns.
pub fn open_ledger(
    mode: IdempotencyMode,
    layout: &ArtifactLayout,
    stems: &[String],
    ledger_path: &Path,
    rebuild: bool,
) -> Result<Box<dyn CompletionLedger>> {
    match mode {
        IdempotencyMode::Ledger if rebuild => Ok(Box::new(rebuild_from_artifacts(
            layout,
            stems,
            ledger_path,
        )?)),
        IdempotencyMode::Ledger => Ok(Box::new(FileLedger::load(ledger_path)?)),
        IdempotencyMode::Artifact => {
            if rebuild {
                tracing::warn!(
                    "Ignoring ledger rebuild: artifact mode reads completion from {} directly",
                    layout.root().display()
                );
            }
            Ok(Box::new(ArtifactLedger::new(layout.clone(), stems.to_vec())))
        }
    }
}

/// Drives the planner and processor across a dataset.
pub struct Batch<'a> {
    dataset: &'a dyn Dataset,
    layout: ArtifactLayout,
    encoder: &'a dyn AudioEncoder,
    engine: &'a dyn TranscriptionEngine,
    options: BatchOptions,
}

impl<'a> Batch<'a> {
    pub fn new(
        dataset: &'a dyn Dataset,
        layout: ArtifactLayout,
        encoder: &'a dyn AudioEncoder,
        engine: &'a dyn TranscriptionEngine,
        options: BatchOptions,
    ) -> Self {
        Self {
            dataset,
            layout,
            encoder,
            engine,
            options,
        }
    }

    /// Process every pending unit.
    ///
    /// Returns `Err` only for failures that affect the whole run: the output
    /// tree cannot be created or the ledger cannot be written.
    pub fn run(&self, ledger: &mut dyn CompletionLedger) -> Result<BatchReport> {
        let total = self.dataset.len();
        tracing::info!("Found {} tracks in the dataset.", total);

        self.layout.ensure_stem_dirs(&self.options.stems)?;
        self.check_free_space();

        let count = self.options.limit.map_or(total, |limit| limit.min(total));
        let processor = UnitProcessor::new(&self.layout, self.encoder, self.engine);
        let mut report = BatchReport::default();

        for index in 0..count {
            report.tracks += 1;

            let track = match self.dataset.track(index) {
                Ok(track) => track,
                Err(e) if e.is_unit_failure() => {
                    tracing::error!("Failed to read track #{}: {}", index + 1, e);
                    report.unreadable_tracks += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            tracing::info!("Processing {} [{}/{}]...", track.name, index + 1, count);

            let plan = plan_track(&track, &self.options.stems, &*ledger);
            report.skipped += plan.skipped.len();
            report.missing += plan.missing.len();

            for unit in &plan.pending {
                tracing::info!("  {}: {}", unit.stem, unit.key);
                match processor.process(self.dataset, &track, unit, ledger)? {
                    UnitOutcome::Done => report.processed += 1,
                    UnitOutcome::Failed(error) => report.failed.push(FailedUnit {
                        key: unit.key.to_string(),
                        error,
                    }),
                }
            }

            tracing::info!("Finished processing {}", track.name);
        }

        tracing::info!("{}", report);
        Ok(report)
    }

    fn check_free_space(&self) {
        let Some(min_free_mb) = self.options.min_free_mb else {
            return;
        };
        if let Some(free) = sys::available_disk_mb_for(self.layout.root())
            && free < min_free_mb
        {
            tracing::warn!(
                "Only {} MB free under {} (recommended at least {} MB)",
                free,
                self.layout.root().display(),
                min_free_mb
            );
        }
    }
}
