//! File format detection for configuration files

use crate::core::error::{Result, RunxError};
use std::fmt;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
    /// `.py` source-definition file, input only
    Script,
}

impl ConfigFormat {
    /// Detect the format of `path` from its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "py" => Some(ConfigFormat::Script),
            _ => None,
        }
    }

    /// Format to read `path` with
    pub fn for_load(path: &Path) -> Result<Self> {
        Self::from_path(path).ok_or_else(|| RunxError::unsupported_format(path, "load"))
    }

    /// Format to write `path` with; source-definition files cannot be written
    pub fn for_dump(path: &Path) -> Result<Self> {
        match Self::from_path(path) {
            Some(format) if format.is_writable() => Ok(format),
            _ => Err(RunxError::unsupported_format(path, "dump")),
        }
    }

    pub fn is_writable(self) -> bool {
        !matches!(self, ConfigFormat::Script)
    }

    pub fn name(self) -> &'static str {
        match self {
            ConfigFormat::Json => "JSON",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Script => "source-definition",
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
