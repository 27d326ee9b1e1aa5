//! Application-level configuration loading, including the optional replacement question bank.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::state::{
    dialog::DEFAULT_LOCK_TIMEOUT,
    question_bank::{QuestionBank, TriviaEntry},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "VOICE_TRIVIA_CONFIG_PATH";
/// Environment variable selecting the lock backend.
const LOCK_STORE_ENV: &str = "LOCK_STORE";
const DEFAULT_GAME_ID: &str = "trivia";
const DEFAULT_TEAM: &str = "blue";
const DEFAULT_PORT: u16 = 8080;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Identifier of the single game instance guarded by the lock.
    pub game_id: String,
    /// Team credited when an answer names none.
    pub default_team: String,
    /// Upper bound on each game lock call.
    pub lock_timeout: Duration,
    /// Clue inventory.
    pub bank: QuestionBank,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        game_id = %app_config.game_id,
                        questions = app_config.bank.len(),
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
        Self {
            game_id: DEFAULT_GAME_ID.to_owned(),
            default_team: DEFAULT_TEAM.to_owned(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            bank: QuestionBank::builtin(),
        }
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    game_id: Option<String>,
    default_team: Option<String>,
    lock_timeout_ms: Option<u64>,
    questions: Option<Vec<TriviaEntry>>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        let bank = match value.questions.map(QuestionBank::new) {
            Some(Ok(bank)) => bank,
            Some(Err(err)) => {
                warn!(error = %err, "invalid question bank in config; using built-in questions");
                defaults.bank
            }
            None => defaults.bank,
        };

        Self {
            game_id: non_blank(value.game_id).unwrap_or(defaults.game_id),
            default_team: non_blank(value.default_team).unwrap_or(defaults.default_team),
            lock_timeout: value
                .lock_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            bank,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Backend holding the process-wide game lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockBackend {
    /// In-process flag; only suitable for a single server instance.
    #[default]
    Memory,
    /// MongoDB conditional upsert.
    Mongo,
    /// CouchDB document guarded by its revision.
    Couch,
}

/// Error raised for an unrecognised [`LockBackend`] name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lock backend `{0}` (expected memory, mongo or couch)")]
pub struct UnknownLockBackend(String);

impl FromStr for LockBackend {
    type Err = UnknownLockBackend;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "memory" => Ok(LockBackend::Memory),
            "mongo" | "mongodb" => Ok(LockBackend::Mongo),
            "couch" | "couchdb" => Ok(LockBackend::Couch),
            _ => Err(UnknownLockBackend(value.to_owned())),
        }
    }
}

impl LockBackend {
    /// Read `LOCK_STORE`, defaulting to the in-memory lock.
    pub fn from_env() -> Result<Self, UnknownLockBackend> {
        env::var(LOCK_STORE_ENV)
            .map(|value| value.parse())
            .unwrap_or(Ok(LockBackend::Memory))
    }
}

/// Listening port from `PORT` or `SERVER_PORT`.
pub fn server_port() -> u16 {
    env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}
