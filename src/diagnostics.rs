//! System diagnostics and dependency checking.
//!
//! Verifies that the transcription engine is installed and reports on the
//! environment a long batch run depends on.

use crate::config::Config;
use crate::sys;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check if a command exists and runs with `arg` successfully.
pub fn check_command(command: &str, arg: &str) -> CheckResult {
    match Command::new(command).arg(arg).output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(output) => CheckResult::Warning(format!(
            "'{} {}' exited with {}",
            command, arg, output.status
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Run all dependency checks and print results.
pub fn check_dependencies(config: &Config) {
    println!("Checking system dependencies...\n");

    print!("Transcription engine ({}): ", config.engine.command);
    match check_command(&config.engine.command, "--help") {
        CheckResult::Ok => println!("✓ OK"),
        CheckResult::NotFound => {
            println!("✗ NOT FOUND");
            println!("  Install: pip install basic-pitch");
        }
        CheckResult::Warning(msg) => println!("⚠ WARNING: {}", msg),
    }

    if let Some(model) = &config.engine.model_path {
        print!("Model path ({}): ", model.display());
        if model.exists() {
            println!("✓ OK");
        } else {
            println!("✗ NOT FOUND");
        }
    }

    if let Some(root) = &config.output.root {
        print!("Free space at {}: ", root.display());
        match sys::available_disk_mb_for(root) {
            Some(mb) if mb < config.output.min_free_mb => {
                println!("⚠ {} MB (below {} MB)", mb, config.output.min_free_mb)
            }
            Some(mb) => println!("✓ {} MB", mb),
            None => println!("- unknown"),
        }
    }

    println!();
    println!("GPU acceleration:");
    check_gpu_nvidia(config.engine.gpu_memory_growth);
}

/// Check for an NVIDIA GPU via `nvidia-smi`.
fn check_gpu_nvidia(memory_growth: bool) {
    print!("  NVIDIA (CUDA):   ");
    match Command::new("nvidia-smi")
        .arg("--query-gpu=gpu_name")
        .arg("--format=csv,noheader")
        .output()
    {
        Ok(output) if output.status.success() => {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if memory_growth {
                println!("✓ {} (memory growth enabled)", name);
            } else {
                println!("✓ {} (engine may reserve all device memory)", name);
            }
        }
        _ => println!("- nvidia-smi not found, engine will run on CPU"),
    }
}
