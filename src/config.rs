//! Application-level configuration loading: file locations, timings and the default header.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    services::{
        phrase_service::DEFAULT_PHRASE_CHECK_INTERVAL, sync_service::DEFAULT_SYNC_INTERVAL,
    },
    state::{game::DEFAULT_HEADER_TEXT, store::DEFAULT_DEBOUNCE},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BINGO_BACK_CONFIG_PATH";

const DEFAULT_STATE_FILE: &str = "game_state.json";
const DEFAULT_PHRASES_FILE: &str = "phrases.txt";

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Snapshot file of the shared card.
    pub state_file: PathBuf,
    /// Newline-separated phrase pool.
    pub phrases_file: PathBuf,
    /// Quiet period before pending changes are written.
    pub debounce: Duration,
    /// Period of the safety-net view reconciliation.
    pub sync_interval: Duration,
    /// How often the phrase file is checked for edits.
    pub phrase_check_interval: Duration,
    /// Header shown while the game is open.
    pub header_text: String,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`, falling back to built-in defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        state_file = %app_config.state_file.display(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    state_file: PathBuf,
    phrases_file: PathBuf,
    debounce_ms: u64,
    sync_interval_ms: u64,
    phrase_check_interval_ms: u64,
    header_text: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            phrases_file: PathBuf::from(DEFAULT_PHRASES_FILE),
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            sync_interval_ms: DEFAULT_SYNC_INTERVAL.as_millis() as u64,
            phrase_check_interval_ms: DEFAULT_PHRASE_CHECK_INTERVAL.as_millis() as u64,
            header_text: DEFAULT_HEADER_TEXT.to_string(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            state_file: value.state_file,
            phrases_file: value.phrases_file,
            debounce: Duration::from_millis(value.debounce_ms),
            // `tokio::time::interval` panics on a zero period.
            sync_interval: Duration::from_millis(value.sync_interval_ms.max(1)),
            phrase_check_interval: Duration::from_millis(value.phrase_check_interval_ms.max(1)),
            header_text: value.header_text,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.state_file, PathBuf::from("game_state.json"));
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.sync_interval, Duration::from_secs(1));
        assert_eq!(config.phrase_check_interval, Duration::from_secs(1));
        assert_eq!(config.header_text, DEFAULT_HEADER_TEXT);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(
            &path,
            r#"{ "state_file": "/data/card.json", "debounce_ms": 50 }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);

        assert_eq!(config.state_file, PathBuf::from("/data/card.json"));
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.phrases_file, PathBuf::from("phrases.txt"));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "{ nope").unwrap();

        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn env_var_overrides_config_path() {
        // SAFETY: no other test reads or writes this variable.
        unsafe { env::set_var(CONFIG_PATH_ENV, "/etc/bingo/app.json") };
        assert_eq!(resolve_config_path(), PathBuf::from("/etc/bingo/app.json"));

        unsafe { env::set_var(CONFIG_PATH_ENV, "") };
        assert_eq!(resolve_config_path(), PathBuf::from(DEFAULT_CONFIG_PATH));

        unsafe { env::remove_var(CONFIG_PATH_ENV) };
    }
}
