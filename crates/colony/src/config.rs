use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV_VAR: &str = "ANTARENA_CLIENT_CONFIG";
pub const PRIMARY_ASSISTS_ENV_VAR: &str = "ANTARENA_PRIMARY_ASSISTS_PATHING";
pub const IDLE_BACKOFF_ENV_VAR: &str = "ANTARENA_IDLE_BACKOFF_US";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Whether the decision thread also services path requests while it waits.
    pub primary_assists_pathing: bool,
    /// Sleep between empty polls; zero yields the thread instead.
    pub idle_backoff_micros: u64,
    pub min_defenders: u32,
    pub birth_reserve_nutrients: i32,
    pub visited_history_len: usize,
    pub abandoned_goal_memory: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            primary_assists_pathing: false,
            idle_backoff_micros: 200,
            min_defenders: 3,
            birth_reserve_nutrients: 500,
            visited_history_len: 8,
            abandoned_goal_memory: 6,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read client config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse client config {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientConfig {
    /// File named by `ANTARENA_CLIENT_CONFIG` (if any), then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV_VAR) {
            Some(path) => Self::from_json_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(
            std::env::var(PRIMARY_ASSISTS_ENV_VAR).ok().as_deref(),
            std::env::var(IDLE_BACKOFF_ENV_VAR).ok().as_deref(),
        );
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&text);
        let config: ClientConfig =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    field: error.path().to_string(),
                    source: error.into_inner(),
                }
            })?;
        info!(path = %path.display(), "client_config_loaded");
        Ok(config)
    }

    pub fn apply_overrides(&mut self, primary_assists: Option<&str>, idle_backoff: Option<&str>) {
        if let Some(value) = primary_assists {
            match parse_enabled_flag(value) {
                Some(enabled) => self.primary_assists_pathing = enabled,
                None => warn!(
                    value,
                    fallback = self.primary_assists_pathing,
                    "client_config_invalid_primary_assists_flag"
                ),
            }
        }
        if let Some(value) = idle_backoff {
            match value.trim().parse::<u64>() {
                Ok(micros) => self.idle_backoff_micros = micros,
                Err(_) => warn!(
                    value,
                    fallback = self.idle_backoff_micros,
                    "client_config_invalid_idle_backoff"
                ),
            }
        }
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_micros(self.idle_backoff_micros)
    }
}

fn parse_enabled_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_json_file_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "min_defenders": 5, "primary_assists_pathing": true }}"#)
            .expect("write");

        let config = ClientConfig::from_json_file(file.path()).expect("config");
        assert_eq!(config.min_defenders, 5);
        assert!(config.primary_assists_pathing);
        assert_eq!(config.idle_backoff_micros, ClientConfig::default().idle_backoff_micros);
    }

    #[test]
    fn parse_error_names_offending_field() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "visited_history_len": "eight" }}"#).expect("write");

        let err = ClientConfig::from_json_file(file.path()).expect_err("bad field type");
        match err {
            ConfigError::Parse { field, .. } => assert_eq!(field, "visited_history_len"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_reports_read_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ClientConfig::from_json_file(&dir.path().join("absent.json"))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_apply_valid_values_and_ignore_invalid_ones() {
        let mut config = ClientConfig::default();
        config.apply_overrides(Some("on"), Some("0"));
        assert!(config.primary_assists_pathing);
        assert_eq!(config.idle_backoff(), Duration::ZERO);

        config.apply_overrides(Some("maybe"), Some("soon"));
        assert!(config.primary_assists_pathing);
        assert_eq!(config.idle_backoff_micros, 0);
    }
}
