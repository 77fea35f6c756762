//! Integration tests for loading and dumping configuration files

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use runx::{ConfigMap, ConfigStore, ConfigValue, RunxError};
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

#[test]
fn test_load_source_definition_scenario() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write(&temp_dir, "config.py", "lr = 0.01\nbatch_size = 32\n");

    let store = ConfigStore::from_file(&path)?;

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("lr")?, &ConfigValue::Float(0.01));
    assert_eq!(store.get("batch_size")?, &ConfigValue::Integer(32));
    assert!(matches!(
        store.get("missing"),
        Err(RunxError::KeyNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_dump_json_scenario() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("out.json");

    let store = ConfigStore::from_mapping([
        ("a", ConfigValue::from(1)),
        ("b", ConfigValue::from(vec![1, 2, 3])),
    ]);
    store.dump(&path)?;

    let content = fs::read_to_string(&path)?;
    assert_eq!(
        content,
        "{\n    \"a\": 1,\n    \"b\": [\n        1,\n        2,\n        3\n    ]\n}\n"
    );

    let reparsed: serde_json::Value = serde_json::from_str(&content)?;
    assert_eq!(reparsed, serde_json::json!({"a": 1, "b": [1, 2, 3]}));
    assert_eq!(ConfigStore::from_file(&path)?.as_map(), store.as_map());
    Ok(())
}

#[test]
fn test_load_yaml_preserves_order_and_types() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write(
        &temp_dir,
        "config.yml",
        "model: resnet50\nepochs: 90\nlr: 0.1\npretrained: true\nmilestones: [30, 60]\nscheduler:\n  name: step\n  gamma: 0.1\nresume: null\n",
    );

    let store = ConfigStore::from_file(&path)?;
    let keys: Vec<&str> = store.keys().map(String::as_str).collect();

    assert_eq!(
        keys,
        vec!["model", "epochs", "lr", "pretrained", "milestones", "scheduler", "resume"]
    );
    assert_eq!(store.len(), 7);
    assert_eq!(store["milestones"], ConfigValue::from(vec![30, 60]));
    assert_eq!(store.get_path("scheduler.gamma")?, &ConfigValue::Float(0.1));
    assert!(store["resume"].is_null());
    Ok(())
}

#[test]
fn test_yaml_dump_keeps_insertion_order() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("out.yaml");

    let mut store = ConfigStore::new();
    store.set("zeta", 1);
    store.set("beta", "two");
    store.set("alpha", vec![3]);
    store.dump(&path)?;

    assert_eq!(
        fs::read_to_string(&path)?,
        "zeta: 1\nbeta: two\nalpha:\n- 3\n"
    );
    Ok(())
}

#[test]
fn test_load_replaces_previous_contents() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let first = write(&temp_dir, "first.json", r#"{"a": 1, "b": 2}"#);
    let second = write(&temp_dir, "second.yaml", "c: 3\n");

    let mut store = ConfigStore::from_file(&first)?;
    store.load(&second)?;

    assert_eq!(store.len(), 1);
    assert!(!store.contains_key("a"));
    assert_eq!(store.source(), Some(second.as_path()));
    Ok(())
}

#[test]
fn test_failed_load_keeps_previous_contents() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let good = write(&temp_dir, "good.json", r#"{"a": 1}"#);
    let bad_json = write(&temp_dir, "bad.json", r#"{"a": "#);
    let bad_yaml = write(&temp_dir, "bad.yaml", "a: [1, 2\n");
    let bad_script = write(&temp_dir, "bad.py", "a = 1\nb = 1 / 0\n");
    let unsupported = write(&temp_dir, "config.toml", "a = 1\n");

    let mut store = ConfigStore::from_file(&good)?;
    let snapshot = store.clone();

    assert!(matches!(store.load(&bad_json), Err(RunxError::ParseError { .. })));
    assert!(matches!(store.load(&bad_yaml), Err(RunxError::ParseError { .. })));
    assert!(matches!(
        store.load(&bad_script),
        Err(RunxError::EvaluationError { line: 2, .. })
    ));
    assert!(matches!(
        store.load(&unsupported),
        Err(RunxError::UnsupportedFormat { .. })
    ));
    assert!(matches!(
        store.load(temp_dir.path().join("absent.json")),
        Err(RunxError::FileNotFound { .. })
    ));

    assert_eq!(store, snapshot);
    Ok(())
}

#[test]
fn test_non_mapping_documents_are_parse_errors() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let list_json = write(&temp_dir, "list.json", "[1, 2, 3]");
    let scalar_yaml = write(&temp_dir, "scalar.yaml", "42\n");

    assert!(matches!(
        ConfigStore::from_file(&list_json),
        Err(RunxError::ParseError { .. })
    ));
    assert!(matches!(
        ConfigStore::from_file(&scalar_yaml),
        Err(RunxError::ParseError { .. })
    ));
    Ok(())
}

#[test]
fn test_empty_yaml_is_an_empty_store() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write(&temp_dir, "empty.yaml", "\n");

    let store = ConfigStore::from_file(&path)?;
    assert!(store.is_empty());
    Ok(())
}

#[test]
fn test_dump_unsupported_extension() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let store = ConfigStore::from_mapping([("a", 1)]);

    for name in ["out.py", "out.toml", "out"] {
        assert!(matches!(
            store.dump(temp_dir.path().join(name)),
            Err(RunxError::UnsupportedFormat { .. })
        ));
    }
    Ok(())
}

#[test]
fn test_extract_typed_config() -> anyhow::Result<()> {
    #[derive(Debug, serde::Deserialize)]
    struct TrainConfig {
        lr: f64,
        batch_size: u32,
        input_size: (u32, u32),
    }

    let temp_dir = TempDir::new()?;
    let path = write(
        &temp_dir,
        "config.py",
        "lr = 0.01\nbatch_size = 32\ninput_size = (256, 256)\n",
    );

    let config: TrainConfig = ConfigStore::from_file(&path)?.extract()?;
    assert_eq!(config.lr, 0.01);
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.input_size, (256, 256));
    Ok(())
}

#[test]
fn test_invalid_utf8_is_a_parse_error() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;

    for name in ["bad.json", "bad.yaml"] {
        let path = temp_dir.path().join(name);
        fs::write(&path, b"{\"a\": \"\xff\"}")?;

        match ConfigStore::from_file(&path) {
            Err(RunxError::ParseError { reason, .. }) => assert!(reason.contains("utf-8")),
            other => panic!("{}: unexpected result {:?}", name, other),
        }
    }

    let script = temp_dir.path().join("bad.py");
    fs::write(&script, b"a = 1\nb = '\xff'\n")?;
    assert!(matches!(
        ConfigStore::from_file(&script),
        Err(RunxError::EvaluationError { line: 2, .. })
    ));
    Ok(())
}

#[test]
fn test_hostile_source_definitions_fail_cleanly() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let sources = [
        ("nested.py", format!("x = {}1{}\n", "(".repeat(3000), ")".repeat(3000))),
        ("overflow.py", "big = 1e308 * 10\n".to_string()),
        ("huge.py", "a = [0] * 1000000\nb = [a] * 1000\n".to_string()),
    ];

    for (name, source) in sources {
        let path = write(&temp_dir, name, &source);
        assert!(
            matches!(
                ConfigStore::from_file(&path),
                Err(RunxError::EvaluationError { .. })
            ),
            "{} should be rejected",
            name
        );
    }
    Ok(())
}

#[test]
fn test_non_finite_floats_are_not_written_as_json() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let json = temp_dir.path().join("out.json");
    let yaml = temp_dir.path().join("out.yaml");

    let mut store = ConfigStore::new();
    store.set("lr", 0.1);
    store.set("schedule", vec![ConfigValue::Float(1.0), ConfigValue::Float(f64::INFINITY)]);

    assert!(matches!(
        store.dump(&json),
        Err(RunxError::TypeMismatch { ref key, .. }) if key == "schedule"
    ));
    assert!(!json.exists());

    store.dump(&yaml)?;
    let reloaded = ConfigStore::from_file(&yaml)?;
    assert_eq!(
        reloaded["schedule"],
        ConfigValue::Sequence(vec![ConfigValue::Float(1.0), ConfigValue::Float(f64::INFINITY)])
    );
    Ok(())
}

fn scalar() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        Just(ConfigValue::Null),
        any::<bool>().prop_map(ConfigValue::Bool),
        any::<i64>().prop_map(ConfigValue::Integer),
        (-100_000i64..100_000).prop_map(|n| ConfigValue::Float(n as f64 / 8.0)),
        "s_[a-z0-9]{0,8}".prop_map(ConfigValue::String),
    ]
}

fn value() -> impl Strategy<Value = ConfigValue> {
    scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(ConfigValue::Sequence),
            prop::collection::vec(("k_[a-z0-9]{1,6}", inner), 0..4)
                .prop_map(|entries| ConfigValue::Mapping(entries.into_iter().collect())),
        ]
    })
}

fn mapping() -> impl Strategy<Value = ConfigMap> {
    prop::collection::vec(("k_[a-z0-9]{1,6}", value()), 0..6)
        .prop_map(|entries| entries.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_json_and_yaml_round_trip(map in mapping()) {
        let temp_dir = TempDir::new().unwrap();
        let store = ConfigStore::from_mapping(map);

        for name in ["round.json", "round.yaml"] {
            let path = temp_dir.path().join(name);
            store.dump(&path).unwrap();
            let reloaded = ConfigStore::from_file(&path).unwrap();

            prop_assert_eq!(reloaded.as_map(), store.as_map());
            let reloaded_keys: Vec<&String> = reloaded.keys().collect();
            let dumped_keys: Vec<&String> = store.keys().collect();
            prop_assert_eq!(reloaded_keys, dumped_keys);
        }
    }
}
