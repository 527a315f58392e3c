//! Grid configuration.
//!
//! Supports JSON config files, environment variable overrides, and defaults.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Policy for applying query results that resolve out of issue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Apply a result only while its request is the most recently issued one.
    #[default]
    LatestIssued,
    /// Apply every result as it resolves; the last one to resolve wins.
    LastResolved,
}

impl std::str::FromStr for ResponseOrdering {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest_issued" => Ok(Self::LatestIssued),
            "last_resolved" => Ok(Self::LastResolved),
            other => Err(GridError::ConfigError(format!(
                "Invalid response ordering: {}",
                other
            ))),
        }
    }
}

/// Grid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Page size used before any query reports one (default: 10)
    pub default_page_size: u64,
    /// Whether the grid pages its rows at all (default: true)
    pub pagination_enabled: bool,
    /// Delay before the automatic fetch after mount, in milliseconds (default: 10)
    pub initial_fetch_delay_ms: u64,
    /// How out-of-order query results are reconciled
    pub response_ordering: ResponseOrdering,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            pagination_enabled: true,
            initial_fetch_delay_ms: 10,
            response_ordering: ResponseOrdering::LatestIssued,
        }
    }
}

impl GridConfig {
    /// Loads configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GridError::ConfigError(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parses configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GridError::ConfigError(format!("Invalid JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment variable overrides.
    ///
    /// Variables are prefixed with `GRID_`, e.g. `GRID_PAGE_SIZE=50`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `GRID_*` variable names.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("GRID_PAGE_SIZE") {
            self.default_page_size = val
                .parse()
                .map_err(|_| GridError::ConfigError(format!("Invalid page size: {}", val)))?;
        }
        if let Some(val) = lookup("GRID_PAGINATION") {
            self.pagination_enabled = val
                .parse()
                .map_err(|_| GridError::ConfigError(format!("Invalid pagination flag: {}", val)))?;
        }
        if let Some(val) = lookup("GRID_INITIAL_FETCH_DELAY_MS") {
            self.initial_fetch_delay_ms = val.parse().map_err(|_| {
                GridError::ConfigError(format!("Invalid initial fetch delay: {}", val))
            })?;
        }
        if let Some(val) = lookup("GRID_RESPONSE_ORDERING") {
            self.response_ordering = val.parse()?;
        }
        self.validate()
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(GridError::ConfigError(
                "default_page_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before the automatic fetch after mount.
    pub fn initial_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.initial_fetch_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;
    use std::io::Write;

    #[test]
    #[timeout(1000)]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.default_page_size, 10);
        assert!(config.pagination_enabled);
        assert_eq!(config.initial_fetch_delay(), Duration::from_millis(10));
        assert_eq!(config.response_ordering, ResponseOrdering::LatestIssued);
    }

    #[test]
    #[timeout(1000)]
    fn test_partial_json_keeps_defaults() {
        let config = GridConfig::from_json(r#"{"default_page_size": 25}"#).unwrap();
        assert_eq!(config.default_page_size, 25);
        assert!(config.pagination_enabled);
        assert_eq!(config.initial_fetch_delay_ms, 10);
    }

    #[test]
    #[timeout(1000)]
    fn test_zero_page_size_rejected() {
        let err = GridConfig::from_json(r#"{"default_page_size": 0}"#).unwrap_err();
        assert!(matches!(err, GridError::ConfigError(_)));
    }

    #[test]
    #[timeout(1000)]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"pagination_enabled": false, "response_ordering": "last_resolved"}}"#
        )
        .unwrap();

        let config = GridConfig::from_file(file.path()).unwrap();
        assert!(!config.pagination_enabled);
        assert_eq!(config.response_ordering, ResponseOrdering::LastResolved);
    }

    #[test]
    #[timeout(1000)]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = GridConfig::from_file(dir.path().join("absent.json"));
        assert!(result.is_err());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    #[timeout(1000)]
    fn test_overrides_replace_loaded_values() {
        let mut config = GridConfig::from_json(r#"{"default_page_size": 25}"#).unwrap();
        config
            .apply_overrides(vars(&[
                ("GRID_PAGE_SIZE", "50"),
                ("GRID_PAGINATION", "false"),
                ("GRID_INITIAL_FETCH_DELAY_MS", "0"),
                ("GRID_RESPONSE_ORDERING", "last_resolved"),
            ]))
            .unwrap();
        assert_eq!(config.default_page_size, 50);
        assert!(!config.pagination_enabled);
        assert_eq!(config.initial_fetch_delay(), Duration::ZERO);
        assert_eq!(config.response_ordering, ResponseOrdering::LastResolved);

        let mut untouched = GridConfig::default();
        untouched.apply_overrides(vars(&[])).unwrap();
        assert_eq!(untouched.default_page_size, 10);
    }

    #[test]
    #[timeout(1000)]
    fn test_invalid_overrides_rejected() {
        let mut config = GridConfig::default();
        assert!(config.apply_overrides(vars(&[("GRID_PAGE_SIZE", "lots")])).is_err());
        assert!(config.apply_overrides(vars(&[("GRID_PAGE_SIZE", "0")])).is_err());
        assert!(config.apply_overrides(vars(&[("GRID_PAGINATION", "maybe")])).is_err());
        assert!(config
            .apply_overrides(vars(&[("GRID_RESPONSE_ORDERING", "newest")]))
            .is_err());
    }

    #[test]
    #[timeout(1000)]
    fn test_parse_ordering() {
        assert_eq!(
            "last_resolved".parse::<ResponseOrdering>().unwrap(),
            ResponseOrdering::LastResolved
        );
        assert!("newest".parse::<ResponseOrdering>().is_err());
    }
}
