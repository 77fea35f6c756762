//! Integration tests for the per-run experiment directory

use pretty_assertions::assert_eq;
use runx::{ConfigStore, ConfigValue, ExperimentLog};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_run_directory_layout() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let hparams = ConfigStore::from_mapping([
        ("lr", ConfigValue::from(0.01)),
        ("batch_size", ConfigValue::from(32)),
        ("optimizer", ConfigValue::from("sgd")),
    ]);

    let log = ExperimentLog::create(temp_dir.path(), "baseline", Some(&hparams))?.quiet();
    let run_dir = temp_dir.path().join("baseline");

    assert_eq!(log.log_dir(), run_dir.as_path());
    assert!(run_dir.join("checkpoints").is_dir());
    assert!(run_dir.join("log.txt").is_file());

    let backup = ConfigStore::from_file(run_dir.join("config.json"))?;
    assert_eq!(backup.as_map(), hparams.as_map());

    assert_eq!(
        fs::read_to_string(run_dir.join("hparams.md"))?,
        "lr: 0.01  \nbatch_size: 32  \noptimizer: sgd  \n"
    );
    Ok(())
}

#[test]
fn test_messages_append_across_reopen() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    {
        let mut log = ExperimentLog::create(temp_dir.path(), "run", None)?.quiet();
        log.msg("epoch 1 loss 0.50")?;
        log.msg("epoch 2 loss 0.40")?;
    }

    let mut log = ExperimentLog::create(temp_dir.path(), "run", None)?.quiet();
    log.msg("epoch 3 loss 0.30")?;

    assert_eq!(
        fs::read_to_string(log.log_path())?,
        "epoch 1 loss 0.50\nepoch 2 loss 0.40\nepoch 3 loss 0.30\n"
    );
    Ok(())
}

#[test]
fn test_without_hparams_no_backup_is_written() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let log = ExperimentLog::create(temp_dir.path(), "bare", None)?;

    assert!(!log.log_dir().join("config.json").exists());
    assert!(!log.log_dir().join("hparams.md").exists());
    assert_eq!(log.checkpoint_dir(), temp_dir.path().join("bare/checkpoints"));
    Ok(())
}
