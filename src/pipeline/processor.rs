//! Unit processing: save one stem, transcribe it, record completion.

use crate::audio::AudioEncoder;
use crate::dataset::{Dataset, Track};
use crate::error::{Result, Stem2MidiError};
use crate::pipeline::layout::{ArtifactLayout, ensure_dir};
use crate::pipeline::ledger::{CompletionLedger, artifact_complete};
use crate::pipeline::planner::PlannedUnit;
use crate::transcribe::{OutputOptions, TranscriptionEngine};
use std::fs;

/// What happened to one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Artifact written and recorded in the ledger.
    Done,
    /// Contained failure; the unit stays pending for the next run.
    Failed(String),
}

/// Runs single units against a fixed layout, encoder and engine.
pub struct UnitProcessor<'a> {
    layout: &'a ArtifactLayout,
    encoder: &'a dyn AudioEncoder,
    engine: &'a dyn TranscriptionEngine,
}

impl<'a> UnitProcessor<'a> {
    pub fn new(
        layout: &'a ArtifactLayout,
        encoder: &'a dyn AudioEncoder,
        engine: &'a dyn TranscriptionEngine,
    ) -> Self {
        Self {
            layout,
            encoder,
            engine,
        }
    }

    /// Process one unit the planner reported as pending.
    ///
    /// Decode, write and transcription failures are contained and returned
    /// as [`UnitOutcome::Failed`]. Errors outside a single unit, such as a
    /// ledger that cannot be written, are returned as `Err`.
    pub fn process(
        &self,
        dataset: &dyn Dataset,
        track: &Track,
        unit: &PlannedUnit,
        ledger: &mut dyn CompletionLedger,
    ) -> Result<UnitOutcome> {
        let result = self.execute(dataset, track, unit);
        // Unit boundary: let the engine drop whatever it accumulated.
        self.engine.release_resources();

        match result {
            Ok(()) => {
                ledger.record(&unit.stem, &unit.key)?;
                tracing::info!("Transcribed {}", unit.key);
                Ok(UnitOutcome::Done)
            }
            Err(e) if e.is_unit_failure() => {
                tracing::error!("Failed to process {}: {}", unit.key, e);
                Ok(UnitOutcome::Failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn execute(&self, dataset: &dyn Dataset, track: &Track, unit: &PlannedUnit) -> Result<()> {
        let stem_dir = self.layout.stem_dir(&unit.stem);
        let midi_dir = self.layout.midi_dir(&unit.stem);
        ensure_dir(&stem_dir)?;
        ensure_dir(&midi_dir)?;

        let audio_path = self.layout.audio_path(&unit.stem, &unit.key);
        {
            let audio = dataset.load_stem(track, &unit.stem)?;
            tracing::debug!(
                "Writing {} ({} frames, {} ch, {} Hz)",
                audio_path.display(),
                audio.frames(),
                audio.channels(),
                track.sample_rate
            );
            self.encoder.write(&audio_path, &audio, track.sample_rate)?;
        }

        // Left over from a run that died between transcription and ledger
        // append. The engine will not overwrite it.
        let artifact = self.layout.artifact_path(&unit.stem, &unit.key);
        if artifact.exists() {
            tracing::debug!("Removing stale artifact {}", artifact.display());
            fs::remove_file(&artifact)?;
        }

        self.engine.predict_and_save(
            std::slice::from_ref(&audio_path),
            &midi_dir,
            &OutputOptions::midi_only(),
        )?;

        if !artifact_complete(&artifact) {
            return Err(Stem2MidiError::ArtifactMissing {
                path: artifact.display().to_string(),
            });
        }

        Ok(())
    }
}
