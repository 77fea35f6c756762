//! Convert command implementation

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the convert command
pub fn execute(input: PathBuf, output: PathBuf) -> Result<()> {
    let store = super::load_store(&input)?;
    store.dump(&output)?;

    println!(
        "{} {} -> {} ({} keys)",
        "✓ Converted".green(),
        input.display(),
        output.display(),
        store.len()
    );
    Ok(())
}
