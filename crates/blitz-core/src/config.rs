// Configuration loading and validation (config.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::dispatch::{default_quick_actions, QuickAction};
use crate::output::DEFAULT_HISTORY;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    /// System actions offered to the user, in display order.
    pub quick_actions: Vec<QuickAction>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            connection: ConnectionConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            quick_actions: default_quick_actions(),
        }
    }
}

/// The socket port is fixed and has no setting.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host to connect to at startup, if any.
    pub default_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of output-log entries kept.
    pub history: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            history: DEFAULT_HISTORY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// Directory for the log file, relative to the working directory.
    pub dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "blitz_core=info,blitz_remote=info,warn".to_string(),
            dir: "logs".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config document.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Load and validate the config file at `path`. The file must exist.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    parse_config(&text, path)
}

/// Platform config location, e.g. `~/.config/blitz-remote/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "blitz-remote").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load config from an explicit path, or from the platform config directory.
///
/// An explicit path must exist. Without one, a missing platform file falls
/// back to built-in defaults; a present but invalid file is still an error.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Ok(Config::default()),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.output.history == 0 {
        return Err(ConfigError::ValidationError {
            field: "output.history".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "logging.filter".into(),
            message: "must not be empty".into(),
        });
    }

    if let Some(host) = &config.connection.default_host {
        if host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "connection.default_host".into(),
                message: "must not be blank; omit it instead".into(),
            });
        }
    }

    for (i, action) in config.quick_actions.iter().enumerate() {
        let field = format!("quick_actions[{i}].command");
        if action.command.is_empty() {
            return Err(ConfigError::ValidationError {
                field,
                message: "must not be empty".into(),
            });
        }
        if action.command.contains(char::is_whitespace) {
            return Err(ConfigError::ValidationError {
                field,
                message: format!("must not contain whitespace, got {:?}", action.command),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        parse_config(text, Path::new("test.toml"))
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output.history, DEFAULT_HISTORY);
        assert_eq!(config.quick_actions.len(), default_quick_actions().len());
    }

    #[test]
    fn full_document_overrides_defaults() {
        let config = parse(
            r#"
            [connection]
            default_host = "192.168.1.50"

            [output]
            history = 10

            [logging]
            filter = "debug"
            dir = "/tmp/blitz"

            [[quick_actions]]
            command = "reboot"
            label = "Reboot"
            "#,
        )
        .unwrap();

        assert_eq!(config.connection.default_host.as_deref(), Some("192.168.1.50"));
        assert_eq!(config.output.history, 10);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.quick_actions, vec![QuickAction::new("reboot", "Reboot")]);
    }

    #[test]
    fn rejects_zero_history() {
        let err = parse("[output]\nhistory = 0").unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "output.history"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_blank_filter_and_host() {
        assert!(matches!(
            parse("[logging]\nfilter = \"  \""),
            Err(ConfigError::ValidationError { .. })
        ));
        assert!(matches!(
            parse("[connection]\ndefault_host = \"\""),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn rejects_bad_quick_action_commands() {
        let err = parse("[[quick_actions]]\ncommand = \"two words\"\nlabel = \"x\"").unwrap_err();
        match err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "quick_actions[0].command")
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        assert!(parse("[[quick_actions]]\ncommand = \"\"\nlabel = \"x\"").is_err());
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let err = parse("[output\nhistory = ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let path = std::env::temp_dir().join("blitz-remote-does-not-exist.toml");
        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = std::env::temp_dir().join(format!("blitz-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, "[output]\nhistory = 3\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.output.history, 3);

        fs::remove_dir_all(&dir).unwrap();
    }
}
