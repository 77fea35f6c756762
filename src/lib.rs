//! runx - utilities for running deep learning experiments
//!
//! The centerpiece is [`ConfigStore`], an ordered key/value configuration
//! loaded from JSON, YAML or a `.py` source-definition file. Around it sit
//! running-average [meters](meter) and a per-run [experiment log](logx).
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use runx::{ConfigStore, ConfigValue};
//!
//! let mut config = ConfigStore::from_file("configs/config.py")?;
//! let lr = config.get("lr")?.as_f64();
//!
//! config.set("batch_size", 64);
//! config.dump("runs/baseline/config.yaml")?;
//! # Ok::<(), runx::RunxError>(())
//! ```

pub mod config;
pub mod core;
pub mod logx;
pub mod meter;

// Re-export commonly used types
pub use crate::core::error::{Result, RunxError};

pub use config::{ConfigFormat, ConfigMap, ConfigStore, ConfigValue};

pub use logx::ExperimentLog;

pub use meter::{AverageMeter, Meter, MovingAverageMeter, Reading};

/// Current version of runx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
