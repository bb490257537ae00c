//! Import command
//!
//! Usage: patchvault import <SYNTH> <FILE>...

use std::path::PathBuf;

use clap::Args;
use patchvault_engine::commands::{apply_engine_command, EngineCommand, EngineCommandResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Synth the files were dumped from
    pub synth: String,

    /// Sysex files to import
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Execute import command
pub fn execute(args: ImportArgs, engine: &Engine) -> CliResult {
    for path in args.files {
        let result = apply_engine_command(
            EngineCommand::ImportFile {
                variant: args.synth.clone(),
                path: path.clone(),
            },
            engine,
        )?;
        let handle = match result {
            EngineCommandResult::IngestStarted(handle) => handle,
            _ => return Err(format!("unexpected result importing {}", path.display()).into()),
        };

        let outcome = handle.wait()?;
        for error in &outcome.frame_errors {
            eprintln!("  skipped frame: {}", error);
        }
        for failure in &outcome.failures {
            eprintln!("  item {}: {}", failure.index + 1, failure.error);
        }
        println!(
            "✓ {}: {} new, {} updated, {} unchanged, {} failed",
            path.display(),
            outcome.inserted,
            outcome.updated,
            outcome.skipped,
            outcome.failures.len() + outcome.frame_errors.len()
        );
    }
    Ok(())
}
