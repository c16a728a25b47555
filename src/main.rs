use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use stem2midi::cli::{Cli, Commands};
use stem2midi::config::Config;
use stem2midi::diagnostics::check_dependencies;
use stem2midi::pipeline::{
    ArtifactLayout, Batch, BatchOptions, BatchReport, CompletionLedger, FileLedger, open_ledger,
    rebuild_from_artifacts, reconcile, scan_artifacts,
};
use stem2midi::{
    BasicPitchEngine, Stem2MidiError, TranscriptionEngine, WavEncoder, WavStemDataset,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    stem2midi::logging::init(cli.quiet, cli.verbose);

    match cli.command {
        Commands::Run {
            dataset_root,
            output_root,
            idempotency,
            rebuild_ledger,
            limit,
            json,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(root) = dataset_root {
                config.dataset.root = Some(root);
            }
            if let Some(root) = output_root {
                config.output.root = Some(root);
            }
            if let Some(ledger) = cli.ledger {
                config.output.ledger = ledger;
            }
            if let Some(mode) = idempotency {
                config.pipeline.idempotency = mode.into();
            }
            if rebuild_ledger {
                config.pipeline.rebuild_ledger = true;
            }
            config.validate()?;

            let report = run_batch(&config, limit)?;
            print_report(&report, json)?;
        }
        Commands::RebuildLedger { output_root } => {
            let config = load_for_output(cli.config.as_deref(), output_root, cli.ledger)?;
            let layout = ArtifactLayout::new(require_output_root(&config)?);
            let ledger =
                rebuild_from_artifacts(&layout, &config.pipeline.stems, &config.output.ledger)?;
            println!(
                "Rebuilt {} with {} entries",
                config.output.ledger.display(),
                ledger.len()
            );
        }
        Commands::Status { output_root } => {
            let config = load_for_output(cli.config.as_deref(), output_root, cli.ledger)?;
            show_status(&config)?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref())?;
            println!("stem2midi {}\n", stem2midi::version_string());
            check_dependencies(&config);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "stem2midi",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file and environment.
fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = custom_path {
        if !path.exists() {
            return Err(Stem2MidiError::ConfigFileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        Config::load_or_default(&Config::default_path())?
    };

    Ok(config.with_env_overrides())
}

/// Configuration for commands that only look at the output tree.
fn load_for_output(
    custom_path: Option<&Path>,
    output_root: Option<PathBuf>,
    ledger: Option<PathBuf>,
) -> Result<Config> {
    let mut config = load_config(custom_path)?;
    if let Some(root) = output_root {
        config.output.root = Some(root);
    }
    if let Some(ledger) = ledger {
        config.output.ledger = ledger;
    }
    config.validate()?;
    Ok(config)
}

fn require_output_root(config: &Config) -> Result<PathBuf> {
    match &config.output.root {
        Some(root) => Ok(root.clone()),
        None => bail!("No output root given (pass OUTPUT_ROOT or set output.root)"),
    }
}

/// Startup checks, then the whole batch. Only fatal errors return `Err`.
fn run_batch(config: &Config, limit: Option<usize>) -> Result<BatchReport> {
    let Some(dataset_root) = &config.dataset.root else {
        bail!("No dataset root given (pass DATASET_ROOT or set dataset.root)");
    };
    let layout = ArtifactLayout::new(require_output_root(config)?);

    let dataset = WavStemDataset::open(dataset_root, &config.dataset.subsets)?;

    let engine = BasicPitchEngine::new(&config.engine);
    engine.preflight()?;

    let encoder = WavEncoder::new(config.audio.sample_format);
    let stems = &config.pipeline.stems;

    let mut ledger: Box<dyn CompletionLedger> = open_ledger(
        config.pipeline.idempotency,
        &layout,
        stems,
        &config.output.ledger,
        config.pipeline.rebuild_ledger,
    )?;

    let options = BatchOptions {
        stems: stems.clone(),
        limit,
        min_free_mb: Some(config.output.min_free_mb),
    };

    let report = Batch::new(&dataset, layout, &encoder, &engine, options).run(ledger.as_mut())?;
    Ok(report)
}

fn print_report(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.is_clean() {
        println!("{} {}", "✓".green(), report);
    } else {
        println!("{} {}", "⚠".yellow(), report);
        for failed in &report.failed {
            println!("  {} {}: {}", "✗".red(), failed.key, failed.error);
        }
    }
    Ok(())
}

/// Per-stem progress plus ledger consistency against the artifact tree.
fn show_status(config: &Config) -> Result<()> {
    let layout = ArtifactLayout::new(require_output_root(config)?);
    let stems = &config.pipeline.stems;

    println!("Output root: {}", layout.root().display());
    let mut artifacts = std::collections::BTreeSet::new();
    for stem in stems {
        let done = scan_artifacts(&layout, std::slice::from_ref(stem))?;
        println!("  {:<10} {} transcribed", stem, done.len());
        artifacts.extend(done);
    }

    let ledger = FileLedger::load(&config.output.ledger)?;
    println!();
    println!(
        "Ledger: {} ({} entries)",
        config.output.ledger.display(),
        ledger.len()
    );

    let recon = reconcile(&ledger.completed()?, &artifacts);
    if recon.is_consistent() {
        println!("  {} ledger matches artifacts", "✓".green());
        return Ok(());
    }

    for key in &recon.stale {
        println!("  {} {} recorded but artifact missing", "✗".red(), key);
    }
    for key in &recon.untracked {
        println!("  {} {} has an artifact but no ledger entry", "⚠".yellow(), key);
    }
    println!();
    println!("Run 'stem2midi rebuild-ledger' to resync the ledger with the artifacts.");
    Ok(())
}
