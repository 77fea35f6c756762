//! Configuration management for runx
//!
//! Experiment settings are loaded into a [`ConfigStore`] from JSON, YAML or a
//! `.py` source-definition file and can be written back as JSON or YAML.

pub mod format;
pub mod script;
pub mod store;
pub mod value;

// Re-export commonly used items
pub use format::ConfigFormat;
pub use store::{ConfigStore, ConfigStoreBuilder};
pub use value::{ConfigMap, ConfigValue};
