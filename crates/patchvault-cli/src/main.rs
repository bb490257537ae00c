//! PatchVault CLI
//!
//! Command-line interface for PatchVault

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "patchvault")]
#[command(about = "PatchVault - Patch librarian for hardware synthesizers", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import patches from sysex files
    Import(commands::import::ImportArgs),
    /// List stored patches of one synth
    List(commands::list::ListArgs),
    /// List import sources of one synth
    Sources(commands::sources::SourcesArgs),
    /// Show the banks of one synth
    Banks(commands::banks::BanksArgs),
    /// Compare two stored patches
    Diff(commands::diff::DiffArgs),
    /// Show the known synths
    Synths(commands::synths::SynthsArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = commands::open_engine(&cli.global).and_then(|engine| match cli.command {
        Commands::Import(args) => commands::import::execute(args, &engine),
        Commands::List(args) => commands::list::execute(args, &engine),
        Commands::Sources(args) => commands::sources::execute(args, &engine),
        Commands::Banks(args) => commands::banks::execute(args, &engine),
        Commands::Diff(args) => commands::diff::execute(args, &engine),
        Commands::Synths(args) => commands::synths::execute(args, &engine),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
