//! Command-line interface for stem2midi
//!
//! Provides argument parsing using clap derive macros.

use crate::config::IdempotencyMode;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Export dataset stems to WAV and transcribe them to MIDI, resumably
#[derive(Parser, Debug)]
#[command(name = "stem2midi", version, about = "Export dataset stems to WAV and transcribe them to MIDI")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Ledger file (default: processed_tracks.log in the working directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub ledger: Option<PathBuf>,
}

/// Idempotency check selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdempotencyArg {
    /// Look units up in the ledger file
    Ledger,
    /// Check for the finished MIDI file
    Artifact,
}

impl From<IdempotencyArg> for IdempotencyMode {
    fn from(arg: IdempotencyArg) -> Self {
        match arg {
            IdempotencyArg::Ledger => IdempotencyMode::Ledger,
            IdempotencyArg::Artifact => IdempotencyMode::Artifact,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export and transcribe every pending (track, stem) unit
    Run {
        /// Dataset root (MUSDB18 WAV layout)
        #[arg(value_name = "DATASET_ROOT")]
        dataset_root: Option<PathBuf>,

        /// Output root for stems and MIDI files
        #[arg(value_name = "OUTPUT_ROOT")]
        output_root: Option<PathBuf>,

        /// How to decide a unit is already done
        #[arg(long, value_enum, value_name = "MODE")]
        idempotency: Option<IdempotencyArg>,

        /// Rebuild the ledger from MIDI files on disk before starting
        #[arg(long)]
        rebuild_ledger: bool,

        /// Process only the first N tracks
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the ledger from the MIDI files under OUTPUT_ROOT
    RebuildLedger {
        /// Output root for stems and MIDI files
        #[arg(value_name = "OUTPUT_ROOT")]
        output_root: Option<PathBuf>,
    },

    /// Show per-stem progress and ledger consistency
    Status {
        /// Output root for stems and MIDI files
        #[arg(value_name = "OUTPUT_ROOT")]
        output_root: Option<PathBuf>,
    },

    /// Check system dependencies
    Check,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
