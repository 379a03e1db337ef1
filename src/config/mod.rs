//! Configuration
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/finwatch/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;

use crate::query::DEFAULT_PER_PAGE;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ─────────────────────────────────────────────────────────────────────────────
// Log Rotation
// ─────────────────────────────────────────────────────────────────────────────

/// Log file rotation strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogRotation {
    /// Rotate log files hourly
    Hourly,
    /// Rotate log files daily (default)
    #[default]
    Daily,
    /// Never rotate - single log file
    Never,
}

impl LogRotation {
    /// Parse rotation string from config
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "never" => Self::Never,
            _ => Self::Daily,
        }
    }

    /// Convert to string for TOML serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Enable file logging (in addition to TUI buffer or stdout)
    pub file_enabled: bool,
    /// Directory for log files
    pub file_dir: PathBuf,
    /// Log file rotation strategy
    pub file_rotation: LogRotation,
    /// Prefix for log file names (e.g., "finwatch" -> "finwatch.2024-01-15.log")
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false, // Opt-in feature
            file_dir: PathBuf::from("./logs"),
            file_rotation: LogRotation::Daily,
            file_prefix: "finwatch".to_string(),
        }
    }
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileLogging {
    pub level: Option<String>,
    pub file_enabled: Option<bool>,
    pub file_dir: Option<String>,
    pub file_rotation: Option<String>,
    pub file_prefix: Option<String>,
}

impl LoggingConfig {
    /// Create from file config with defaults
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            level: file.level.unwrap_or(defaults.level),
            file_enabled: file.file_enabled.unwrap_or(defaults.file_enabled),
            file_dir: file
                .file_dir
                .map(PathBuf::from)
                .unwrap_or(defaults.file_dir),
            file_rotation: file
                .file_rotation
                .map(|s| LogRotation::parse(&s))
                .unwrap_or(defaults.file_rotation),
            file_prefix: file.file_prefix.unwrap_or(defaults.file_prefix),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the ledger service API
    pub api_url: String,

    /// Bearer token attached to every request (the service issues these)
    pub token: Option<String>,

    /// Default page size for the transactions table
    pub per_page: u32,

    /// Whether to enable the TUI (can be disabled for headless mode)
    pub enable_tui: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api".to_string(),
            token: None,
            per_page: DEFAULT_PER_PAGE,
            enable_tui: true,
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub per_page: Option<u32>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/finwatch/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("finwatch").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    ///
    /// A config file that exists but cannot be parsed fails fast with a clear
    /// message instead of silently falling back to defaults.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Failed to parse config file {}:", path.display());
                    eprintln!("  {e}");
                    eprintln!("To reset, delete the file and restart finwatch.");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("Cannot read config file {}: {e}", path.display());
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        let defaults = Self::default();

        // API URL: env > file > default
        let api_url = std::env::var("FINWATCH_API_URL")
            .ok()
            .or(file.api_url)
            .unwrap_or(defaults.api_url);

        // Token: env > file (never has a built-in default)
        let token = std::env::var("FINWATCH_TOKEN").ok().or(file.token);

        // Page size: env > file > default
        let per_page = std::env::var("FINWATCH_PER_PAGE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.per_page)
            .unwrap_or(defaults.per_page);

        // TUI toggle: env only (runtime flag)
        let enable_tui = std::env::var("FINWATCH_NO_TUI")
            .map(|v| v != "1" && v.to_lowercase() != "true")
            .unwrap_or(true);

        let logging = LoggingConfig::from_file(file.logging);

        Self {
            api_url,
            token,
            per_page,
            enable_tui,
            logging,
        }
    }

    /// Render the config as a TOML template (single source of truth for the
    /// generated file; must round-trip through [`FileConfig`]).
    pub fn to_toml(&self) -> String {
        let token_line = match &self.token {
            Some(token) => format!("token = {token:?}"),
            None => "# token = \"...\"  # bearer token issued by the service".to_string(),
        };
        format!(
            r#"# finwatch configuration
# Values here are overridden by FINWATCH_* environment variables.

api_url = {api_url:?}
{token_line}
per_page = {per_page}

[logging]
level = {level:?}            # trace | debug | info | warn | error
file_enabled = {file_enabled}
file_dir = {file_dir:?}
file_rotation = {file_rotation:?}  # hourly | daily | never
file_prefix = {file_prefix:?}
"#,
            api_url = self.api_url,
            token_line = token_line,
            per_page = self.per_page,
            level = self.logging.level,
            file_enabled = self.logging.file_enabled,
            file_dir = self.logging.file_dir.display().to_string(),
            file_rotation = self.logging.file_rotation.as_str(),
            file_prefix = self.logging.file_prefix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that the generated template parses back.
    /// Catches TOML syntax errors in the to_toml format string.
    #[test]
    fn config_template_round_trips() {
        let config = Config::default();
        let toml_str = config.to_toml();

        let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
        assert!(
            parsed.is_ok(),
            "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
            toml_str,
            parsed.err()
        );

        let file = parsed.unwrap();
        assert_eq!(file.api_url.as_deref(), Some(config.api_url.as_str()));
        assert_eq!(file.per_page, Some(config.per_page));
        assert_eq!(
            file.logging.unwrap().level.as_deref(),
            Some(config.logging.level.as_str())
        );
    }

    #[test]
    fn config_template_round_trips_with_token() {
        let config = Config {
            token: Some("secret-token".into()),
            ..Config::default()
        };
        let parsed: FileConfig = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed.token.as_deref(), Some("secret-token"));
    }

    #[test]
    fn rotation_parses_known_values_and_defaults_to_daily() {
        assert_eq!(LogRotation::parse("hourly"), LogRotation::Hourly);
        assert_eq!(LogRotation::parse("NEVER"), LogRotation::Never);
        assert_eq!(LogRotation::parse("weekly"), LogRotation::Daily);
    }
}
