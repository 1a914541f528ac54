//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_SHOW_CONFIG_PATH";
/// Environment variable that overrides the configured question bank path.
const QUESTIONS_PATH_ENV: &str = "QUIZ_SHOW_QUESTIONS_PATH";

const DEFAULT_QUESTION_BANK_PATH: &str = "config/questions.json";
const DEFAULT_CUSTOM_TEXT: &str = "Stay tuned!";
const DEFAULT_REVEAL_POINTS: i32 = 100;
const DEFAULT_MEMORY_POINTS: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Scoring and screen defaults consumed by the game engine.
pub struct GameRules {
    /// Custom screen text used until the moderator saves another one.
    pub default_custom_text: String,
    /// Points credited per correct answer when answers are revealed.
    pub reveal_points: i32,
    /// Points credited to each team that located the memory target.
    pub memory_points: i32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            default_custom_text: DEFAULT_CUSTOM_TEXT.into(),
            reveal_points: DEFAULT_REVEAL_POINTS,
            memory_points: DEFAULT_MEMORY_POINTS,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    question_bank_path: PathBuf,
    rules: GameRules,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        question_bank = %config.question_bank_path.display(),
                        "loaded configuration"
                    );
                    config
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
        };

        if let Some(path) = env_path(QUESTIONS_PATH_ENV) {
            config.question_bank_path = path;
        }
        config
    }

    /// Parse a configuration document; absent fields keep their defaults.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Where the question bank is read from.
    pub fn question_bank_path(&self) -> &PathBuf {
        &self.question_bank_path
    }

    /// Engine rules.
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_bank_path: PathBuf::from(DEFAULT_QUESTION_BANK_PATH),
            rules: GameRules::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    question_bank_path: Option<PathBuf>,
    default_custom_text: Option<String>,
    reveal_points: Option<i32>,
    memory_points: Option<i32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = GameRules::default();
        Self {
            question_bank_path: value
                .question_bank_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QUESTION_BANK_PATH)),
            rules: GameRules {
                default_custom_text: value
                    .default_custom_text
                    .filter(|text| !text.trim().is_empty())
                    .unwrap_or(defaults.default_custom_text),
                reveal_points: value.reveal_points.unwrap_or(defaults.reveal_points),
                memory_points: value.memory_points.unwrap_or(defaults.memory_points),
            },
        }
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env_path(CONFIG_PATH_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AppConfig::from_json_str(r#"{"reveal_points": 50}"#).unwrap();
        assert_eq!(config.rules().reveal_points, 50);
        assert_eq!(config.rules().memory_points, DEFAULT_MEMORY_POINTS);
        assert_eq!(config.rules().default_custom_text, DEFAULT_CUSTOM_TEXT);
        assert_eq!(
            config.question_bank_path(),
            &PathBuf::from(DEFAULT_QUESTION_BANK_PATH)
        );
    }

    #[test]
    fn blank_custom_text_is_ignored() {
        let config = AppConfig::from_json_str(r#"{"default_custom_text": "  "}"#).unwrap();
        assert_eq!(config.rules().default_custom_text, DEFAULT_CUSTOM_TEXT);
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(AppConfig::from_json_str("{not json").is_err());
    }
}
