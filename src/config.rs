use std::{env, path::Path, path::PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const ENV_LOG_LEVEL: &str = "CHANNEL_STORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CHANNEL_STORE_LOG_DIR";
pub const ENV_NUM_POINTS: &str = "CHANNEL_STORE_NUM_POINTS";

/// Settings of the `channel-store` binary. The store itself needs none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoreConfig {
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    /// Rows of the demo point cloud.
    pub num_points: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            num_points: 10_000,
        }
    }
}

/// What [`StoreConfig::from_env`] did. Loading runs before the subscriber
/// exists, so the binary logs these once tracing is up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadNotes {
    pub env_file: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl LoadNotes {
    pub fn log(&self) {
        if let Some(path) = &self.env_file {
            info!("Loaded .env from {}", path.display());
        }
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

impl StoreConfig {
    /// Loads `env_file` if it exists, then reads the `CHANNEL_STORE_*` variables.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env(env_file: Option<&Path>) -> (Self, LoadNotes) {
        let mut notes = LoadNotes::default();
        if let Some(path) = env_file {
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => notes.env_file = Some(path.to_path_buf()),
                    Err(err) => notes
                        .warnings
                        .push(format!("could not load {}: {err}", path.display())),
                }
            }
        }
        let config = Self::from_lookup(|key| env::var(key).ok(), &mut notes);
        (config, notes)
    }

    fn from_lookup<F>(lookup: F, notes: &mut LoadNotes) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let num_points = match lookup(ENV_NUM_POINTS) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                notes
                    .warnings
                    .push(format!("ignoring {ENV_NUM_POINTS}={raw}: not a count"));
                defaults.num_points
            }),
            None => defaults.num_points,
        };
        Self {
            log_level: lookup(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: lookup(ENV_LOG_DIR).map(PathBuf::from),
            num_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let mut notes = LoadNotes::default();
        let config = StoreConfig::from_lookup(lookup_from(&[]), &mut notes);
        assert_eq!(config, StoreConfig::default());
        assert_eq!(notes, LoadNotes::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = StoreConfig::from_lookup(
            lookup_from(&[
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_DIR, "/tmp/logs"),
                (ENV_NUM_POINTS, "42"),
            ]),
            &mut LoadNotes::default(),
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(config.num_points, 42);
    }

    #[test]
    fn test_bad_count_falls_back() {
        let mut notes = LoadNotes::default();
        let config = StoreConfig::from_lookup(lookup_from(&[(ENV_NUM_POINTS, "many")]), &mut notes);
        assert_eq!(config.num_points, 10_000);
        assert_eq!(
            notes.warnings,
            vec![format!("ignoring {ENV_NUM_POINTS}=many: not a count")]
        );
    }

    #[test]
    fn test_env_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "CHANNEL_STORE_TEST_ONLY_MARKER=present\n").unwrap();
        let (_, notes) = StoreConfig::from_env(Some(path.as_path()));
        assert_eq!(notes.env_file, Some(path.clone()));
        assert_eq!(
            env::var("CHANNEL_STORE_TEST_ONLY_MARKER").as_deref(),
            Ok("present")
        );
    }
}
