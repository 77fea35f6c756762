//! Set command implementation

use anyhow::{Context, Result};
use colored::Colorize;
use runx::config::script;
use std::path::PathBuf;
use tracing::debug;

/// Execute the set command
pub fn execute(file: PathBuf, key: String, value: String, output: Option<PathBuf>) -> Result<()> {
    let mut store = super::load_store(&file)?;
    let parsed = script::eval_expression(&value)
        .with_context(|| format!("invalid value expression: {}", value))?;
    debug!(key = %key, value = %parsed, "parsed value");

    let previous = store.set(key.clone(), parsed);
    let target = output.unwrap_or(file);
    store.dump(&target)?;

    let action = if previous.is_some() { "Updated" } else { "Added" };
    println!(
        "{} {} in {}",
        format!("✓ {}", action).green(),
        key.bold(),
        target.display()
    );
    Ok(())
}
