//! Get command implementation

use anyhow::Result;
use std::path::PathBuf;

/// Execute the get command
pub fn execute(file: PathBuf, key: String) -> Result<()> {
    let store = super::load_store(&file)?;
    let value = store.get_path(&key)?;
    println!("{}", value);
    Ok(())
}
