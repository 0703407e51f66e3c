//! JSON-backed settings store.
//!
//! A thin wrapper over a `serde_json` object supporting flat and nested
//! keys. Nested values are addressed with `/`-separated paths, e.g.
//! `"video/fullscreen"`. Reads deserialize into any `serde` type;
//! missing keys and type mismatches are reported as distinct errors so
//! callers can fall back or fail loudly as appropriate.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing value for key '{0}'")]
    MissingKey(String),
    #[error("unexpected value type for key '{0}'")]
    WrongType(String),
    #[error("malformed settings JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unable to access settings file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Mutable tree of configuration values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Creates an empty settings object.
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Parses settings from JSON text. The top level must be an object.
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        let root: Value = serde_json::from_str(text)?;
        if !root.is_object() {
            return Err(SettingsError::WrongType("<root>".into()));
        }
        Ok(Self { root })
    }

    /// Loads settings from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Writes the settings to a file as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.root)?;
        fs::write(path, text).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Whether a value exists at the given key path.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Reads and deserializes the value at the given key path.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self
            .lookup(key)
            .ok_or_else(|| SettingsError::MissingKey(key.to_string()))?;
        serde_json::from_value(value.clone())
            .map_err(|_| SettingsError::WrongType(key.to_string()))
    }

    /// Reads the value at the key path, writing and returning the
    /// default when the key is absent or holds the wrong type.
    pub fn get_or<T>(&mut self, key: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        match self.get(key) {
            Ok(value) => value,
            Err(_) => {
                self.set(key, &default);
                default
            }
        }
    }

    /// Stores a value at the given key path, creating intermediate
    /// objects as needed.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        let json = serde_json::to_value(value).unwrap_or(Value::Null);
        let mut node = &mut self.root;
        let mut parts = key.split('/').peekable();
        while let Some(part) = parts.next() {
            // Overwrite scalars standing in the way of a path.
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(object) = node else {
                return;
            };
            if parts.peek().is_none() {
                object.insert(part.to_string(), json);
                return;
            }
            node = object
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut node = &self.root;
        for part in key.split('/') {
            node = node.as_object()?.get(part)?;
        }
        Some(node)
    }
}
