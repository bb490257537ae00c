//! Synths command
//!
//! Usage: patchvault synths [--json]

use clap::Args;
use patchvault_engine::commands::{apply_engine_query, EngineQuery, EngineQueryResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct SynthsArgs {
    #[arg(long)]
    pub json: bool,
}

/// Execute synths command
pub fn execute(args: SynthsArgs, engine: &Engine) -> CliResult {
    let EngineQueryResult::Synths(synths) = apply_engine_query(EngineQuery::Synths, engine)? else {
        return Err("unexpected synth result".into());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&synths)?);
        return Ok(());
    }
    for synth in &synths {
        let channel = synth
            .channel
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<24} {:<8} ch {:>2}  {:>5} patches  [{}]",
            synth.name,
            if synth.active { "active" } else { "inactive" },
            channel,
            synth.stored_patches,
            synth.capabilities.join(", ")
        );
        if !synth.data_files.is_empty() {
            println!("{:<24} loads: {}", "", synth.data_files.join(", "));
        }
    }
    Ok(())
}
