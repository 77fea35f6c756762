//! runx CLI
//!
//! Command-line driver for inspecting and converting experiment configurations.

use anyhow::Result;
use clap::Parser;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Execute the command
    match cli.command {
        Commands::Show { file, json } => cli::commands::show::execute(file, json),
        Commands::Get { file, key } => cli::commands::get::execute(file, key),
        Commands::Set {
            file,
            key,
            value,
            output,
        } => cli::commands::set::execute(file, key, value, output),
        Commands::Convert { input, output } => cli::commands::convert::execute(input, output),
    }
}
