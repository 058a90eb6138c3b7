//! Sources that produce configuration layers
//!
//! Each [`LayerSource`] reads one origin (memory, process environment, a JSON
//! file) into a [`ConfigurationLayer`]. Nested structure is flattened into
//! keys joined with [`KEY_SEPARATOR`], so `{"Database": {"Host": "x"}}` and
//! `DATABASE__HOST` style variables both land on a `:` separated key.

use crate::layers::ConfigurationLayer;
use serde_json::Value;
use std::path::{Path, PathBuf};
use vaultlink_core::{Error, Result, KEY_SEPARATOR};

/// Separator environment variables use in place of `:`
pub const ENV_KEY_SEPARATOR: &str = "__";

/// Something that can be read into a configuration layer
pub trait LayerSource: Send + Sync {
    /// Name given to the produced layer
    fn name(&self) -> &str;

    /// Read the source
    fn load(&self) -> Result<ConfigurationLayer>;
}

/// Fixed key/value pairs held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    layer: ConfigurationLayer,
}

impl MemorySource {
    pub fn new<I, K, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut layer = ConfigurationLayer::new(name);
        for (key, value) in values {
            layer.insert(key, value);
        }
        Self { layer }
    }
}

impl LayerSource for MemorySource {
    fn name(&self) -> &str {
        self.layer.name()
    }

    fn load(&self) -> Result<ConfigurationLayer> {
        Ok(self.layer.clone())
    }
}

/// Process environment variables, optionally restricted to a prefix.
///
/// The prefix is stripped and `__` becomes the key separator, so with prefix
/// `APP_` the variable `APP_Database__Host` maps to `Database:Host`.
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    prefix: Option<String>,
    snapshot: Option<Vec<(String, String)>>,
}

impl EnvironmentSource {
    /// Read every variable of the current process
    pub fn new() -> Self {
        Self {
            prefix: None,
            snapshot: None,
        }
    }

    /// Only read variables starting with `prefix`
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Read from a fixed set of variables instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix: None,
            snapshot: Some(
                vars.into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    fn map_key(&self, variable: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => variable.strip_prefix(prefix.as_str())?,
            None => variable,
        };
        if stripped.is_empty() {
            return None;
        }
        Some(stripped.replace(ENV_KEY_SEPARATOR, KEY_SEPARATOR))
    }
}

impl Default for EnvironmentSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerSource for EnvironmentSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn load(&self) -> Result<ConfigurationLayer> {
        let vars: Vec<(String, String)> = match &self.snapshot {
            Some(vars) => vars.clone(),
            None => std::env::vars_os()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
                .collect(),
        };

        let mut layer = ConfigurationLayer::new(self.name());
        for (variable, value) in vars {
            if let Some(key) = self.map_key(&variable) {
                layer.insert(key, value);
            }
        }
        tracing::debug!(
            prefix = self.prefix.as_deref().unwrap_or(""),
            keys = layer.len(),
            "Loaded environment layer"
        );
        Ok(layer)
    }
}

/// A JSON document whose root is an object.
///
/// Nested objects and arrays are flattened to `a:b:0` style keys. Scalars are
/// stored as their JSON text, strings without quotes and `null` as an empty
/// string.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
    optional: bool,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            optional: false,
        }
    }

    /// Treat a missing file as an empty layer
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flatten an already parsed document into a layer
    pub fn parse(name: impl Into<String>, content: &str) -> Result<ConfigurationLayer> {
        let name = name.into();
        let document: Value = serde_json::from_str(content)?;
        let Value::Object(root) = document else {
            return Err(Error::configuration(format!(
                "configuration source '{name}' must contain a JSON object at the root"
            )));
        };

        let mut layer = ConfigurationLayer::new(name);
        for (key, value) in root {
            flatten_value(&mut layer, key, value);
        }
        Ok(layer)
    }
}

impl LayerSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<ConfigurationLayer> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if self.optional && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Optional configuration file not found");
                return Ok(ConfigurationLayer::new(self.name.clone()));
            }
            Err(e) => return Err(Error::file_system(&self.path, "read configuration file", e)),
        };

        let layer = Self::parse(self.name.clone(), &content).map_err(|e| match e {
            Error::Json { .. } => Error::configuration(format!(
                "invalid JSON in {}: {e}",
                self.path.display()
            )),
            other => other,
        })?;
        tracing::debug!(path = %self.path.display(), keys = layer.len(), "Loaded JSON layer");
        Ok(layer)
    }
}

fn flatten_value(layer: &mut ConfigurationLayer, key: String, value: Value) {
    match value {
        Value::Object(map) => {
            for (child, value) in map {
                flatten_value(layer, format!("{key}{KEY_SEPARATOR}{child}"), value);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.into_iter().enumerate() {
                flatten_value(layer, format!("{key}{KEY_SEPARATOR}{index}"), value);
            }
        }
        Value::String(text) => {
            layer.insert(key, text);
        }
        Value::Null => {
            layer.insert(key, String::new());
        }
        scalar => {
            layer.insert(key, scalar.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new("defaults", [("A", "1"), ("B", "2")]);
        let layer = source.load().unwrap();
        assert_eq!(layer.name(), "defaults");
        assert_eq!(layer.get("B"), Some("2"));
    }

    #[test]
    fn test_environment_prefix_and_separator() {
        let source = EnvironmentSource::from_vars([
            ("APP_Database__Host", "db.internal"),
            ("APP_Api__Keys__0", "op://infra/api/key"),
            ("APP_", "ignored"),
            ("PATH", "/usr/bin"),
        ])
        .with_prefix("APP_");

        let layer = source.load().unwrap();
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.get("Database:Host"), Some("db.internal"));
        assert_eq!(layer.get("Api:Keys:0"), Some("op://infra/api/key"));
        assert_eq!(layer.get("PATH"), None);
    }

    #[test]
    fn test_environment_without_prefix_keeps_everything() {
        let source = EnvironmentSource::from_vars([("A__B", "1"), ("C", "2")]);
        let layer = source.load().unwrap();
        assert_eq!(layer.get("A:B"), Some("1"));
        assert_eq!(layer.get("C"), Some("2"));
    }

    #[test]
    fn test_json_nested_objects_and_arrays() {
        let layer = JsonFileSource::parse(
            "settings",
            r#"{
                "Database": {"Host": "localhost", "Port": 5432, "Password": "op://infra/db/password"},
                "Hosts": ["a", {"Name": "b"}],
                "Debug": true,
                "Proxy": null
            }"#,
        )
        .unwrap();

        assert_eq!(layer.get("Database:Host"), Some("localhost"));
        assert_eq!(layer.get("Database:Port"), Some("5432"));
        assert_eq!(layer.get("Database:Password"), Some("op://infra/db/password"));
        assert_eq!(layer.get("Hosts:0"), Some("a"));
        assert_eq!(layer.get("Hosts:1:Name"), Some("b"));
        assert_eq!(layer.get("Debug"), Some("true"));
        assert_eq!(layer.get("Proxy"), Some(""));
    }

    #[test]
    fn test_json_root_must_be_object() {
        let err = JsonFileSource::parse("settings", "[1, 2]").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_json_file_is_read() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Logging": {{"Level": "warn"}}}}"#).unwrap();

        let layer = JsonFileSource::new(file.path()).load().unwrap();
        assert_eq!(layer.get("Logging:Level"), Some("warn"));
        assert_eq!(layer.name(), file.path().display().to_string());
    }

    #[test]
    fn test_missing_file_only_tolerated_when_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("appsettings.local.json");

        let err = JsonFileSource::new(&path).load().unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));

        let layer = JsonFileSource::new(&path).optional(true).load().unwrap();
        assert!(layer.is_empty());
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = JsonFileSource::new(file.path()).load().unwrap_err();
        match err {
            Error::Configuration { message } => {
                assert!(message.contains(&file.path().display().to_string()))
            }
            other => panic!("expected Configuration, got {other:?}"),
        }
    }
}
