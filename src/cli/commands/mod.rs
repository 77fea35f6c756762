//! CLI command implementations

pub mod convert;
pub mod get;
pub mod set;
pub mod show;

use anyhow::{Context, Result};
use runx::ConfigStore;
use std::path::Path;

/// Load a configuration file, attaching the path to any error
pub fn load_store(path: &Path) -> Result<ConfigStore> {
    ConfigStore::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
