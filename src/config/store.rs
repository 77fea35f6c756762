//! Configuration store
//!
//! [`ConfigStore`] wraps an ordered mapping of [`ConfigValue`]s and gives the
//! same access regardless of whether the contents came from JSON, YAML or a
//! `.py` source-definition file.

use crate::config::format::ConfigFormat;
use crate::config::script;
use crate::config::value::{ConfigMap, ConfigValue};
use crate::core::error::{Result, RunxError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::ops::Index;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Dynamic key/value configuration
///
/// Keys are unique and keep their insertion order. The store is a plain value:
/// sharing it across threads requires external synchronization for writers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigStore {
    values: ConfigMap,
    /// File the current contents were loaded from
    source: Option<PathBuf>,
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding a copy of `mapping`
    pub fn from_mapping<I, K, V>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        mapping.into_iter().collect()
    }

    /// Create a store from a `.json`, `.yaml`/`.yml` or `.py` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut store = Self::new();
        store.load(path)?;
        Ok(store)
    }

    /// Start building a store from exactly one source
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::default()
    }

    /// Replace the contents with those of `path`
    ///
    /// The new mapping is read completely before anything is replaced, so a
    /// failed load leaves the previous contents untouched.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let values = read_mapping(path)?;

        info!(path = %path.display(), keys = values.len(), "loaded configuration");
        self.values = values;
        self.source = Some(path.to_path_buf());
        Ok(())
    }

    /// Write the contents to `path` as JSON or YAML, chosen by extension
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let rendered = match ConfigFormat::for_dump(path)? {
            ConfigFormat::Json => self.to_json_string()?,
            ConfigFormat::Yaml => self.to_yaml_string()?,
            ConfigFormat::Script => return Err(RunxError::unsupported_format(path, "dump")),
        };

        // Write next to the target and rename over it
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(rendered.as_bytes())?;
        file.flush()?;
        file.persist(path).map_err(|e| RunxError::Io(e.error))?;

        info!(path = %path.display(), keys = self.values.len(), "dumped configuration");
        Ok(())
    }

    /// Render as JSON with four-space indentation
    ///
    /// JSON has no infinity or NaN, so a key holding one is a `TypeMismatch`
    /// rather than being written as `null`.
    pub fn to_json_string(&self) -> Result<String> {
        if let Some(key) = self
            .values
            .iter()
            .find_map(|(key, value)| has_non_finite(value).then_some(key))
        {
            return Err(RunxError::type_mismatch(
                key,
                "non-finite float cannot be written as JSON",
            ));
        }

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.values.serialize(&mut serializer)?;
        buffer.push(b'\n');
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Render as block-style YAML in insertion order
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.values)?)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<&ConfigValue> {
        self.values
            .get(key)
            .ok_or_else(|| RunxError::key_not_found(key))
    }

    /// Mutable value stored under `key`
    pub fn get_mut(&mut self, key: &str) -> Result<&mut ConfigValue> {
        self.values
            .get_mut(key)
            .ok_or_else(|| RunxError::key_not_found(key))
    }

    /// Insert or overwrite `key`, returning the previous value
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Option<ConfigValue> {
        let key = key.into();
        debug!(key = %key, "set configuration value");
        self.values.insert(key, value.into())
    }

    /// Attribute-style read, identical to [`ConfigStore::get`]
    pub fn attr(&self, name: &str) -> Result<&ConfigValue> {
        self.get(name)
    }

    /// Attribute-style write, identical to [`ConfigStore::set`]
    pub fn set_attr(
        &mut self,
        name: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Option<ConfigValue> {
        self.set(name, value)
    }

    /// Walk nested mappings (and sequence indices) with dot notation,
    /// e.g. `optimizer.lr` or `layers.0`
    ///
    /// A key that literally contains the dots takes precedence.
    pub fn get_path(&self, path: &str) -> Result<&ConfigValue> {
        if let Some(value) = self.values.get(path) {
            return Ok(value);
        }

        let mut segments = path.split('.');
        let mut current = segments
            .next()
            .and_then(|first| self.values.get(first))
            .ok_or_else(|| RunxError::key_not_found(path))?;

        for segment in segments {
            current = match current {
                ConfigValue::Mapping(map) => map.get(segment),
                ConfigValue::Sequence(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            }
            .ok_or_else(|| RunxError::key_not_found(path))?;
        }

        Ok(current)
    }

    /// Deserialize the value at `path` into `T`
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = serde_json::to_value(self.get_path(path)?)?;
        serde_json::from_value(value).map_err(|e| RunxError::type_mismatch(path, e))
    }

    /// Deserialize the whole store into a typed configuration struct
    pub fn extract<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(&self.values)?;
        serde_json::from_value(value).map_err(|e| RunxError::type_mismatch("<root>", e))
    }

    /// Remove `key`, keeping the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Result<ConfigValue> {
        self.values
            .shift_remove(key)
            .ok_or_else(|| RunxError::key_not_found(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every key
    pub fn clear(&mut self) {
        self.values.clear();
        self.source = None;
    }

    /// `(key, value)` pairs in insertion order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ConfigValue> {
        self.values.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, String, ConfigValue> {
        self.values.keys()
    }

    /// The underlying mapping, without copying
    pub fn as_map(&self) -> &ConfigMap {
        &self.values
    }

    /// The underlying mapping for in-place edits; changes are the store's
    /// changes, there is no defensive copy
    pub fn as_map_mut(&mut self) -> &mut ConfigMap {
        &mut self.values
    }

    pub fn into_map(self) -> ConfigMap {
        self.values
    }

    /// File the current contents were loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// One `key: value` line per entry, with Markdown hard line breaks
    pub fn to_markdown(&self) -> String {
        self.values
            .iter()
            .map(|(key, value)| format!("{}: {}  \n", key, value))
            .collect()
    }
}

fn has_non_finite(value: &ConfigValue) -> bool {
    match value {
        ConfigValue::Float(x) => !x.is_finite(),
        ConfigValue::Sequence(items) => items.iter().any(has_non_finite),
        ConfigValue::Mapping(map) => map.values().any(has_non_finite),
        _ => false,
    }
}

fn read_mapping(path: &Path) -> Result<ConfigMap> {
    let format = ConfigFormat::for_load(path)?;
    if !path.exists() {
        return Err(RunxError::file_not_found(path));
    }
    debug!(path = %path.display(), %format, "reading configuration");

    let read_text = || -> Result<String> {
        String::from_utf8(fs::read(path)?)
            .map_err(|e| RunxError::parse_error(path, format.name(), e))
    };

    match format {
        ConfigFormat::Json => {
            let content = read_text()?;
            serde_json::from_str(&content)
                .map_err(|e| RunxError::parse_error(path, format.name(), e))
        },
        ConfigFormat::Yaml => {
            let content = read_text()?;
            if content.trim().is_empty() {
                return Ok(ConfigMap::new());
            }
            serde_yaml::from_str(&content)
                .map_err(|e| RunxError::parse_error(path, format.name(), e))
        },
        ConfigFormat::Script => script::load_file(path),
    }
}

/// Builder enforcing that a store comes from exactly one source
#[derive(Debug, Default)]
pub struct ConfigStoreBuilder {
    mapping: Option<ConfigMap>,
    file: Option<PathBuf>,
}

impl ConfigStoreBuilder {
    pub fn mapping(mut self, mapping: ConfigMap) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn build(self) -> Result<ConfigStore> {
        match (self.mapping, self.file) {
            (Some(mapping), None) => Ok(ConfigStore::from_mapping(mapping)),
            (None, Some(path)) => ConfigStore::from_file(path),
            (Some(_), Some(_)) => Err(RunxError::invalid_argument(
                "only one of a mapping or a file may be supplied",
            )),
            (None, None) => Err(RunxError::invalid_argument(
                "either a mapping or a file must be supplied",
            )),
        }
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = ConfigStore::new();
        store.extend(iter);
        store
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> Extend<(K, V)> for ConfigStore {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.values.insert(key.into(), value.into());
        }
    }
}

impl<'a> IntoIterator for &'a ConfigStore {
    type Item = (&'a String, &'a ConfigValue);
    type IntoIter = indexmap::map::Iter<'a, String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl IntoIterator for ConfigStore {
    type Item = (String, ConfigValue);
    type IntoIter = indexmap::map::IntoIter<String, ConfigValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// # Panics
///
/// Panics if the key is absent; use [`ConfigStore::get`] to handle that case.
impl Index<&str> for ConfigStore {
    type Output = ConfigValue;

    fn index(&self, key: &str) -> &ConfigValue {
        match self.values.get(key) {
            Some(value) => value,
            None => panic!("configuration key not found: {}", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use tempfile::TempDir;

    fn sample() -> ConfigStore {
        ConfigStore::from_mapping([
            ("lr", ConfigValue::from(0.01)),
            ("batch_size", ConfigValue::from(32)),
            (
                "optimizer",
                ConfigValue::Mapping(ConfigMap::from([
                    ("name".to_string(), ConfigValue::from("adam")),
                    ("betas".to_string(), ConfigValue::from(vec![0.9, 0.999])),
                ])),
            ),
        ])
    }

    #[test]
    fn test_set_and_get() {
        let mut store = ConfigStore::new();
        assert!(store.is_empty());

        assert_eq!(store.set("a", 5), None);
        assert_eq!(store.set("a", 7), Some(ConfigValue::Integer(5)));
        store.set_attr("c", vec![1, 2, 3]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a").unwrap(), &ConfigValue::Integer(7));
        assert_eq!(store.attr("c").unwrap(), &ConfigValue::from(vec![1, 2, 3]));
        assert_eq!(store["a"], ConfigValue::Integer(7));
    }

    #[test]
    fn test_missing_key() {
        let store = sample();
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, RunxError::KeyNotFound { ref key } if key == "missing"));
    }

    #[test]
    #[should_panic(expected = "configuration key not found")]
    fn test_index_panics_on_missing_key() {
        let store = ConfigStore::new();
        let _ = &store["nope"];
    }

    #[test]
    fn test_iteration_order_and_restart() {
        let mut store = ConfigStore::new();
        store.set("a", 1);
        store.set("b", 2);
        store.set("c", 3);

        let first: Vec<&str> = store.iter().map(|(k, _)| k.as_str()).collect();
        let second: Vec<&str> = (&store).into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(first, vec!["a", "b", "c"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_path() {
        let store = sample();

        assert_eq!(store.get_path("optimizer.name").unwrap(), &ConfigValue::from("adam"));
        assert_eq!(store.get_path("optimizer.betas.1").unwrap(), &ConfigValue::from(0.999));
        assert!(matches!(
            store.get_path("optimizer.momentum"),
            Err(RunxError::KeyNotFound { .. })
        ));
        assert!(matches!(
            store.get_path("lr.value"),
            Err(RunxError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_typed_access() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Optimizer {
            name: String,
            betas: Vec<f64>,
        }

        let store = sample();
        let lr: f64 = store.get_as("lr").unwrap();
        let optimizer: Optimizer = store.get_as("optimizer").unwrap();

        assert_eq!(lr, 0.01);
        assert_eq!(optimizer.betas, vec![0.9, 0.999]);
        assert!(matches!(
            store.get_as::<String>("batch_size"),
            Err(RunxError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut store = sample();
        store.remove("lr").unwrap();

        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["batch_size", "optimizer"]);
        assert!(matches!(store.remove("lr"), Err(RunxError::KeyNotFound { .. })));
    }

    #[test]
    fn test_as_map_mut_is_shared() {
        let mut store = sample();
        store
            .as_map_mut()
            .insert("epochs".to_string(), ConfigValue::from(90));

        assert_eq!(store.get("epochs").unwrap(), &ConfigValue::Integer(90));
    }

    #[test]
    fn test_builder_requires_exactly_one_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"a": 1}"#).unwrap();

        let both = ConfigStore::builder()
            .mapping(ConfigMap::new())
            .file(&path)
            .build();
        assert!(matches!(both, Err(RunxError::InvalidArgument { .. })));

        let neither = ConfigStore::builder().build();
        assert!(matches!(neither, Err(RunxError::InvalidArgument { .. })));

        let from_file = ConfigStore::builder().file(&path).build().unwrap();
        assert_eq!(from_file.len(), 1);
        assert_eq!(from_file.source(), Some(path.as_path()));
    }

    #[test]
    fn test_json_rendering_uses_four_spaces() {
        let store = ConfigStore::from_mapping([("a", 1)]);
        assert_eq!(store.to_json_string().unwrap(), "{\n    \"a\": 1\n}\n");
    }

    #[test]
    fn test_yaml_rendering_keeps_order() {
        let store = ConfigStore::from_mapping([("zeta", 1), ("alpha", 2)]);
        assert_eq!(store.to_yaml_string().unwrap(), "zeta: 1\nalpha: 2\n");
    }

    #[test]
    fn test_markdown() {
        let store = ConfigStore::from_mapping([
            ("lr", ConfigValue::from(0.1)),
            ("name", ConfigValue::from("baseline")),
        ]);
        assert_eq!(store.to_markdown(), "lr: 0.1  \nname: baseline  \n");
    }

    #[test]
    fn test_dump_rejects_script_target() {
        let temp_dir = TempDir::new().unwrap();
        let err = sample().dump(temp_dir.path().join("out.py")).unwrap_err();

        assert!(matches!(err, RunxError::UnsupportedFormat { .. }));
        assert!(!temp_dir.path().join("out.py").exists());
    }
}
