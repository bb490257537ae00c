//! List command
//!
//! Usage: patchvault list <SYNTH> [--source <LABEL>] [--favorites] [--skip <N>] [--limit <N>]

use clap::Args;
use patchvault_core::capability::dispatch;
use patchvault_core::PatchFilter;
use patchvault_engine::commands::{apply_engine_query, EngineQuery, EngineQueryResult};
use patchvault_engine::Engine;

use super::CliResult;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Synth whose patches to list
    pub synth: String,

    /// Only patches from the import source with this label
    #[arg(long)]
    pub source: Option<String>,

    /// Only favorites
    #[arg(long)]
    pub favorites: bool,

    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

/// Execute list command
pub fn execute(args: ListArgs, engine: &Engine) -> CliResult {
    let variant = engine.variant(&args.synth)?;
    let mut filter = PatchFilter::for_variant(variant.name());
    if let Some(label) = &args.source {
        let EngineQueryResult::ImportSources(sources) = apply_engine_query(
            EngineQuery::ImportSources {
                variant: variant.name().to_string(),
            },
            engine,
        )?
        else {
            return Err("unexpected import source result".into());
        };
        let id = sources
            .get(label)
            .ok_or_else(|| format!("no import source labelled '{}'", label))?;
        filter = filter.with_import_source(id.clone());
    }
    if args.favorites {
        filter = filter.favorites_only();
    }

    let EngineQueryResult::Patches(page) = apply_engine_query(
        EngineQuery::ListPatches {
            filter,
            skip: args.skip,
            limit: args.limit,
        },
        engine,
    )?
    else {
        return Err("unexpected list result".into());
    };

    for holder in &page.patches {
        let place = holder
            .patch()
            .placement()
            .map(|p| dispatch::friendly_program_name(&variant, "list", p))
            .unwrap_or_else(|| "-".to_string());
        let star = if holder.favorite { "*" } else { " " };
        println!("{} {} {:>16}  {}", star, holder.fingerprint().short(), place, holder.name());
    }
    println!("{} of {} patches", page.patches.len(), page.total);
    Ok(())
}
