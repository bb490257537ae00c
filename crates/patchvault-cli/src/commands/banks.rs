//! Banks command
//!
//! Usage: patchvault banks <SYNTH>

use clap::Args;
use patchvault_engine::commands::{apply_engine_query, EngineQuery, EngineQueryResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct BanksArgs {
    pub synth: String,
}

/// Execute banks command
pub fn execute(args: BanksArgs, engine: &Engine) -> CliResult {
    let EngineQueryResult::Banks(banks) =
        apply_engine_query(EngineQuery::Banks { variant: args.synth }, engine)?
    else {
        return Err("unexpected bank result".into());
    };
    for (bank, name) in banks {
        let number = bank.to_string();
        println!("{:>3}  {}", number, name);
    }
    Ok(())
}
