//! Sources command
//!
//! Usage: patchvault sources <SYNTH>

use clap::Args;
use patchvault_engine::commands::{apply_engine_query, EngineQuery, EngineQueryResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct SourcesArgs {
    pub synth: String,
}

/// Execute sources command
pub fn execute(args: SourcesArgs, engine: &Engine) -> CliResult {
    let EngineQueryResult::ImportSources(sources) =
        apply_engine_query(EngineQuery::ImportSources { variant: args.synth }, engine)?
    else {
        return Err("unexpected import source result".into());
    };
    if sources.is_empty() {
        println!("No import sources");
    }
    for (label, id) in &sources {
        println!("{}\t{}", id, label);
    }
    Ok(())
}
