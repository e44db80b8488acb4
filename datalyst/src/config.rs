//! Configuration.
//!
//! [`AnalystConfig`] tunes the orchestrator itself. [`Settings`] is the
//! application-level view read from environment variables:
//!
//! | Variable | Default |
//! |---|---|
//! | `GOOGLE_API_KEY` | required |
//! | `DATABASE_URL` | `sqlite:///sample_data.db` |
//! | `LOG_LEVEL` | `INFO` |
//! | `MAX_CONVERSATION_HISTORY` | `10` |
//! | `MODEL_NAME` | `gemini-2.5-flash` |
//! | `TEMPERATURE` | `0.1` |
//! | `MAX_OUTPUT_TOKENS` | `2048` |
//! | `DATALYST_STATE_DIR` | `logs` |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::session::DEFAULT_MAX_HISTORY;

/// Default database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///sample_data.db";
/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default directory for persisted state.
pub const DEFAULT_STATE_DIR: &str = "logs";

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct AnalystConfig {
    /// Messages kept per session.
    pub max_history: usize,
    /// Upper bound on every collaborator call.
    pub collaborator_timeout: Duration,
    /// Directory holding `session_state.json`, `memory_bank.json` and
    /// `metrics.json`.
    pub state_dir: PathBuf,
    /// Save state when the analyst is closed.
    pub persist_on_close: bool,
    /// Restore state from `state_dir` when the analyst is built.
    pub restore_on_start: bool,
    /// Result sets above this many rows are never charted.
    pub visualization_row_limit: usize,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            collaborator_timeout: Duration::from_secs(60),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            persist_on_close: true,
            restore_on_start: false,
            visualization_row_limit: 100,
        }
    }
}

impl AnalystConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-session history bound.
    #[must_use]
    pub const fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Set the collaborator timeout.
    #[must_use]
    pub const fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    /// Set the state directory.
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Enable or disable saving on close.
    #[must_use]
    pub const fn with_persist_on_close(mut self, enabled: bool) -> Self {
        self.persist_on_close = enabled;
        self
    }

    /// Enable or disable restoring on start.
    #[must_use]
    pub const fn with_restore_on_start(mut self, enabled: bool) -> Self {
        self.restore_on_start = enabled;
        self
    }
}

/// Application settings read from the environment.
#[derive(Clone)]
pub struct Settings {
    /// Gemini API key.
    pub google_api_key: String,
    /// Database URL as configured.
    pub database_url: String,
    /// SQLite file derived from `database_url`.
    pub database_path: PathBuf,
    /// Log level name.
    pub log_level: String,
    /// Messages kept per session.
    pub max_history: usize,
    /// Gemini model name.
    pub model_name: String,
    /// Sampling temperature for SQL generation.
    pub temperature: f32,
    /// Output token cap for the model.
    pub max_output_tokens: u32,
    /// Directory for persisted state.
    pub state_dir: PathBuf,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("google_api_key", &"<REDACTED>")
            .field("database_url", &self.database_url)
            .field("log_level", &self.log_level)
            .field("max_history", &self.max_history)
            .field("model_name", &self.model_name)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Read settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] without `GOOGLE_API_KEY` and
    /// [`ConfigError::Invalid`] for malformed values.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`Settings::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = get("GOOGLE_API_KEY").ok_or_else(|| {
            ConfigError::missing("GOOGLE_API_KEY not found in environment variables")
        })?;
        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned());
        let database_path = sqlite_path(&database_url)?;

        let max_history = parse_or(
            get("MAX_CONVERSATION_HISTORY"),
            "MAX_CONVERSATION_HISTORY",
            DEFAULT_MAX_HISTORY,
        )?;
        if max_history == 0 {
            return Err(ConfigError::invalid("MAX_CONVERSATION_HISTORY must be at least 1"));
        }

        Ok(Self {
            google_api_key,
            database_url,
            database_path,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "INFO".to_owned()),
            max_history,
            model_name: get("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            temperature: parse_or(get("TEMPERATURE"), "TEMPERATURE", 0.1)?,
            max_output_tokens: parse_or(get("MAX_OUTPUT_TOKENS"), "MAX_OUTPUT_TOKENS", 2048)?,
            state_dir: get("DATALYST_STATE_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from),
        })
    }

    /// Orchestrator configuration derived from these settings.
    #[must_use]
    pub fn analyst_config(&self) -> AnalystConfig {
        AnalystConfig::default()
            .with_max_history(self.max_history)
            .with_state_dir(self.state_dir.clone())
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, key: &str, default: T) -> ConfigResult<T> {
    raw.map_or(Ok(default), |value| {
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(format!("{key}: cannot parse {value:?}")))
    })
}

/// Resolve a `sqlite://` URL (or a bare path) to a file path.
///
/// `sqlite:///data.db` is relative, `sqlite:////var/data.db` is absolute.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for other schemes and for URLs without
/// a path.
pub fn sqlite_path(url: &str) -> ConfigResult<PathBuf> {
    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest.strip_prefix('/').unwrap_or(rest)
    } else if url.contains("://") {
        return Err(ConfigError::invalid(format!(
            "unsupported database URL {url:?}: only sqlite is supported"
        )));
    } else {
        url
    };

    if path.is_empty() {
        return Err(ConfigError::invalid(format!("database URL {url:?} has no path")));
    }
    Ok(Path::new(path).to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[("GOOGLE_API_KEY", "k")])).unwrap();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.database_path, PathBuf::from("sample_data.db"));
        assert_eq!(settings.log_level, "INFO");
        assert_eq!(settings.max_history, 10);
        assert_eq!(settings.model_name, "gemini-2.5-flash");
        assert!((settings.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(settings.max_output_tokens, 2048);
        assert_eq!(settings.state_dir, PathBuf::from("logs"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));

        let err = Settings::from_lookup(lookup(&[("GOOGLE_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("GOOGLE_API_KEY", "k"),
            ("DATABASE_URL", "sqlite:////tmp/shop.db"),
            ("MAX_CONVERSATION_HISTORY", "4"),
            ("TEMPERATURE", "0.5"),
            ("DATALYST_STATE_DIR", "/var/lib/datalyst"),
        ]))
        .unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/shop.db"));
        assert_eq!(settings.max_history, 4);

        let config = settings.analyst_config();
        assert_eq!(config.max_history, 4);
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/datalyst"));
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("MAX_CONVERSATION_HISTORY", "lots"),
            ("MAX_CONVERSATION_HISTORY", "0"),
            ("TEMPERATURE", "warm"),
            ("DATABASE_URL", "postgresql://localhost/shop"),
        ] {
            let err = Settings::from_lookup(lookup(&[("GOOGLE_API_KEY", "k"), (key, value)]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{key}={value}");
        }
    }

    #[test]
    fn test_sqlite_path() {
        assert_eq!(sqlite_path("data.db").unwrap(), PathBuf::from("data.db"));
        assert_eq!(sqlite_path("sqlite:///a/b.db").unwrap(), PathBuf::from("a/b.db"));
        assert!(sqlite_path("sqlite://").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let settings = Settings::from_lookup(lookup(&[("GOOGLE_API_KEY", "secret-key")])).unwrap();
        assert!(!format!("{settings:?}").contains("secret-key"));
    }
}
