//! Per-run experiment directory
//!
//! Layout created under `<root>/<name>/`:
//!
//! ```text
//! log.txt        messages appended by ExperimentLog::msg
//! config.json    hyper-parameter backup (when provided)
//! hparams.md     the same hyper-parameters as Markdown
//! checkpoints/   target directory for checkpoint files
//! ```

use crate::config::ConfigStore;
use crate::core::error::{Result, RunxError};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub const LOG_FILE: &str = "log.txt";
pub const CHECKPOINT_DIR: &str = "checkpoints";
pub const HPARAMS_JSON: &str = "config.json";
pub const HPARAMS_MARKDOWN: &str = "hparams.md";

/// Handle on one run's log directory
#[derive(Debug)]
pub struct ExperimentLog {
    log_dir: PathBuf,
    checkpoint_dir: PathBuf,
    log_file: File,
    /// Also print messages to stdout
    echo: bool,
}

impl ExperimentLog {
    /// Create (or reopen) `<root>/<name>` and back up `hparams` into it
    pub fn create(
        root: impl AsRef<Path>,
        name: &str,
        hparams: Option<&ConfigStore>,
    ) -> Result<Self> {
        let mut components = Path::new(name).components();
        let single_component = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_component {
            return Err(RunxError::invalid_argument(format!(
                "run name must be a single path component, got '{}'",
                name
            )));
        }

        let log_dir = root.as_ref().join(name);
        let checkpoint_dir = log_dir.join(CHECKPOINT_DIR);
        fs::create_dir_all(&checkpoint_dir)?;

        let log_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join(LOG_FILE))?;

        if let Some(hparams) = hparams {
            hparams.dump(log_dir.join(HPARAMS_JSON))?;
            fs::write(log_dir.join(HPARAMS_MARKDOWN), hparams.to_markdown())?;
        }

        info!(dir = %log_dir.display(), "experiment log ready");
        Ok(Self {
            log_dir,
            checkpoint_dir,
            log_file,
            echo: true,
        })
    }

    /// Stop echoing messages to stdout
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Show `message` and append it to `log.txt`
    pub fn msg(&mut self, message: &str) -> Result<()> {
        if self.echo {
            println!("{}", message);
        }
        writeln!(self.log_file, "{}", message)?;
        self.log_file.flush()?;
        Ok(())
    }

    /// Path for checkpoint number `index`: `checkpoints/checkpoint-<index>.pth`
    pub fn checkpoint_path(&self, index: usize) -> PathBuf {
        self.checkpoint_dir
            .join(format!("checkpoint-{}.pth", index))
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn checkpoint_dir(&self) -> &Path {
        &self.checkpoint_dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_nested_names() {
        let temp_dir = TempDir::new().unwrap();

        for name in ["", "a/b", "..", "/abs"] {
            let result = ExperimentLog::create(temp_dir.path(), name, None);
            assert!(
                matches!(result, Err(RunxError::InvalidArgument { .. })),
                "name {:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_checkpoint_path() {
        let temp_dir = TempDir::new().unwrap();
        let log = ExperimentLog::create(temp_dir.path(), "run", None).unwrap();

        assert_eq!(
            log.checkpoint_path(3),
            temp_dir.path().join("run/checkpoints/checkpoint-3.pth")
        );
    }
}
