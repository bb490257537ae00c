//! Subcommands and the setup they share

use std::path::PathBuf;

use clap::Args;
use patchvault_core::config::{PatchVaultConfig, DEFAULT_CONFIG_FILE};
use patchvault_core::logging_facility;
use patchvault_engine::Engine;

pub mod banks;
pub mod diff;
pub mod import;
pub mod list;
pub mod sources;
pub mod synths;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: ./patchvault.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overrides the configured store path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

/// Load the configuration, start logging and open the store
pub fn open_engine(global: &GlobalArgs) -> Result<Engine, Box<dyn std::error::Error>> {
    let config_path = global
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = PatchVaultConfig::load(&config_path)?;
    if let Some(db) = &global.db {
        config.store.path = db.clone();
    }

    logging_facility::init(config.logging.profile);
    tracing::debug!(config = %config_path.display(), store = %config.store.path.display(), "starting");

    Ok(Engine::from_config(&config)?)
}
