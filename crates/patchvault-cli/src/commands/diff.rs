//! Diff command
//!
//! Usage: patchvault diff <SYNTH> <A> <B> [--ignore-names] [--json]
//!
//! A and B are fingerprints or unique fingerprint prefixes.

use clap::Args;
use patchvault_core::diff::model::DiffMode;
use patchvault_engine::commands::{apply_engine_query, EngineQuery, EngineQueryResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct DiffArgs {
    pub synth: String,

    /// First patch
    pub a: String,

    /// Second patch
    pub b: String,

    /// Skip parameters that do not affect the sound, such as the name
    #[arg(long)]
    pub ignore_names: bool,

    /// Print the structured diff as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute diff command
pub fn execute(args: DiffArgs, engine: &Engine) -> CliResult {
    let mode = if args.ignore_names {
        DiffMode::IgnoreNames
    } else {
        DiffMode::AllParameters
    };
    let EngineQueryResult::Diff(diff) = apply_engine_query(
        EngineQuery::Diff {
            variant: args.synth,
            a: args.a,
            b: args.b,
            mode,
        },
        engine,
    )?
    else {
        return Err("unexpected diff result".into());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diff.structured_diff)?);
    } else {
        print!("{}", diff.human_summary);
    }
    Ok(())
}
