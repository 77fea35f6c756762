//! Show command implementation

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Execute the show command
pub fn execute(file: PathBuf, json: bool) -> Result<()> {
    let store = super::load_store(&file)?;

    if json {
        print!("{}", store.to_json_string()?);
        return Ok(());
    }

    println!(
        "{} {} ({} keys)",
        "Configuration".bold(),
        file.display().to_string().cyan(),
        store.len()
    );
    for (key, value) in &store {
        println!("  {}: {}", key.green(), value);
    }

    Ok(())
}
