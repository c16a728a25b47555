//! Batch runs over a MUSDB18-style directory of WAV stems.

use std::fs;
use std::path::Path;
use stem2midi::pipeline::{
    ArtifactLayout, Batch, BatchOptions, CompletionLedger, UnitKey, open_ledger,
};
use stem2midi::{Dataset, IdempotencyMode, MockEngine, SampleFormat, WavEncoder, WavStemDataset};
use tempfile::TempDir;

fn write_stem(dir: &Path, stem: &str, sample_rate: u32) {
    fs::create_dir_all(dir).unwrap();
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(dir.join(format!("{stem}.wav")), spec).unwrap();
    for i in 0..200i16 {
        writer.write_sample(i * 50).unwrap();
        writer.write_sample(-i * 50).unwrap();
    }
    writer.finalize().unwrap();
}

fn recognized() -> Vec<String> {
    ["mixture", "drums", "bass", "other", "vocals"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn exports_and_transcribes_every_subset() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("musdb18");
    write_stem(&root.join("train/Alpha - One"), "mixture", 22050);
    write_stem(&root.join("train/Alpha - One"), "bass", 22050);
    write_stem(&root.join("test/Beta - Two"), "mixture", 44100);

    let dataset = WavStemDataset::open(&root, &["train".into(), "test".into()]).unwrap();
    assert_eq!(dataset.len(), 2);

    let layout = ArtifactLayout::new(dir.path().join("stems"));
    let ledger_path = dir.path().join("processed_tracks.log");
    let stems = recognized();
    let encoder = WavEncoder::new(SampleFormat::Float32);
    let engine = MockEngine::new();
    let options = BatchOptions {
        stems: stems.clone(),
        limit: None,
        min_free_mb: None,
    };

    let mut ledger =
        open_ledger(IdempotencyMode::Ledger, &layout, &stems, &ledger_path, false).unwrap();
    let report = Batch::new(&dataset, layout.clone(), &encoder, &engine, options.clone())
        .run(ledger.as_mut())
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.missing, 4 + 3);
    assert!(report.is_clean());

    let saved = layout.audio_path("bass", &UnitKey::new("Alpha - One", "bass"));
    let reader = hound::WavReader::open(&saved).unwrap();
    assert_eq!(reader.spec().sample_rate, 22050);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.len(), 400);

    let beta = layout.audio_path("mixture", &UnitKey::new("Beta - Two", "mixture"));
    assert_eq!(hound::WavReader::open(&beta).unwrap().spec().sample_rate, 44100);

    let rerun = MockEngine::new();
    let mut ledger =
        open_ledger(IdempotencyMode::Ledger, &layout, &stems, &ledger_path, false).unwrap();
    let report = Batch::new(&dataset, layout, &encoder, &rerun, options)
        .run(ledger.as_mut())
        .unwrap();
    assert_eq!(rerun.call_count(), 0);
    assert_eq!(report.skipped, 3);
}

#[test]
fn corrupt_track_is_skipped_and_others_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("musdb18");
    write_stem(&root.join("A"), "vocals", 44100);
    fs::create_dir_all(root.join("B")).unwrap();
    fs::write(root.join("B/mixture.wav"), b"not a wav file").unwrap();
    write_stem(&root.join("C"), "vocals", 44100);

    let dataset = WavStemDataset::open(&root, &["train".into(), "test".into()]).unwrap();
    let layout = ArtifactLayout::new(dir.path().join("stems"));
    let stems = recognized();
    let encoder = WavEncoder::new(SampleFormat::Int16);
    let engine = MockEngine::new();
    let options = BatchOptions {
        stems: stems.clone(),
        limit: None,
        min_free_mb: None,
    };

    let mut ledger = open_ledger(
        IdempotencyMode::Artifact,
        &layout,
        &stems,
        &dir.path().join("unused.log"),
        false,
    )
    .unwrap();
    let report = Batch::new(&dataset, layout.clone(), &encoder, &engine, options)
        .run(ledger.as_mut())
        .unwrap();

    assert_eq!(report.tracks, 3);
    assert_eq!(report.unreadable_tracks, 1);
    assert_eq!(report.processed, 2);
    assert!(layout
        .artifact_path("vocals", &UnitKey::new("C", "vocals"))
        .is_file());

    let saved = layout.audio_path("vocals", &UnitKey::new("A", "vocals"));
    let spec = hound::WavReader::open(&saved).unwrap().spec();
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(spec.bits_per_sample, 16);
}

#[test]
fn missing_dataset_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let result = WavStemDataset::open(&dir.path().join("nope"), &[]);
    assert!(matches!(
        result,
        Err(stem2midi::Stem2MidiError::DatasetNotFound { .. })
    ));
}

#[test]
fn stem_at_another_sample_rate_fails_and_stays_pending() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("musdb18");
    write_stem(&root.join("train/Song"), "mixture", 44100);
    write_stem(&root.join("train/Song"), "bass", 22050);

    let dataset = WavStemDataset::open(&root, &["train".into()]).unwrap();
    let layout = ArtifactLayout::new(dir.path().join("stems"));
    let ledger_path = dir.path().join("processed_tracks.log");
    let stems = recognized();
    let encoder = WavEncoder::default();
    let engine = MockEngine::new();
    let options = BatchOptions {
        stems: stems.clone(),
        limit: None,
        min_free_mb: None,
    };

    let mut ledger =
        open_ledger(IdempotencyMode::Ledger, &layout, &stems, &ledger_path, false).unwrap();
    let report = Batch::new(&dataset, layout.clone(), &encoder, &engine, options)
        .run(ledger.as_mut())
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].key, "Song_bass");
    let bass = UnitKey::new("Song", "bass");
    assert!(!ledger.is_complete("bass", &bass));
    assert!(!layout.audio_path("bass", &bass).exists());
    assert_eq!(fs::read_to_string(&ledger_path).unwrap(), "Song_mixture\n");
}
