//! Country → capital lookup used by the weather intent.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{NexaError, Result};

/// Read-only region table. Keys are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    capitals: HashMap<String, String>,
}

impl RegionMap {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            capitals: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Load a JSON object of `{ "country": "capital" }`. A missing file
    /// yields an empty map.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "region map missing — weather lookups will fail");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let raw: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| NexaError::Data(format!("{}: {e}", path.display())))?;
        let map = Self::new(raw);
        debug!(path = %path.display(), regions = map.len(), "region map loaded");
        Ok(map)
    }

    /// Capital for `country`, case-insensitive.
    pub fn capital(&self, country: &str) -> Option<&str> {
        self.capitals
            .get(&country.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.capitals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capitals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let map = RegionMap::new([("France", "Paris"), ("japan", "Tokyo")]);
        assert_eq!(map.capital("france"), Some("Paris"));
        assert_eq!(map.capital("JAPAN "), Some("Tokyo"));
        assert_eq!(map.capital("peru"), None);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let map = RegionMap::load(&dir.path().join("countries.json")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn loads_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.json");
        fs::write(&path, r#"{"France": "Paris", "Kenya": "Nairobi"}"#).unwrap();
        let map = RegionMap::load(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.capital("kenya"), Some("Nairobi"));
    }

    #[test]
    fn malformed_json_is_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(RegionMap::load(&path), Err(NexaError::Data(_))));
    }
}
