//! Command-line interface for runx

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// runx - inspect and convert experiment configuration files
#[derive(Parser)]
#[command(
    name = "runx",
    version,
    about = "Inspect and convert experiment configuration files",
    long_about = "runx loads experiment configurations from JSON, YAML or .py source-definition files and writes them back as JSON or YAML."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every key and value of a configuration file
    Show {
        /// Configuration file (.json, .yaml, .yml or .py)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a single value; nested values use dot notation (optimizer.lr)
    Get {
        /// Configuration file
        file: PathBuf,

        /// Key or dotted path
        key: String,
    },

    /// Set a value and write the result as JSON or YAML
    Set {
        /// Configuration file to read
        file: PathBuf,

        /// Key to insert or overwrite
        key: String,

        /// Value as an expression, e.g. 0.1, "'adam'" or [64, 128]
        value: String,

        /// Output file (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a configuration file to JSON or YAML
    Convert {
        /// Input file (.json, .yaml, .yml or .py)
        input: PathBuf,

        /// Output file (.json, .yaml or .yml)
        output: PathBuf,
    },
}
