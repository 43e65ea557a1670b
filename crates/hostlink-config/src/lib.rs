//! Deployment configuration for the hostlink daemon.
//!
//! The daemon takes no command-line flags; every knob resolves in layer
//! order: built-in defaults, then an optional `hostlink.toml` next to the
//! working directory, then `HOSTLINK_*` environment variables. Loading is
//! injectable so tests can exercise precedence without touching the
//! process environment.

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_BIND_HOST, DEFAULT_COMMAND_PORT, DEFAULT_DISCOVERY_PORT, DEFAULT_LOG_FILTER,
    DEFAULT_SESSION_TIMEOUT_SECS, default_browse_root, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

use std::fs;
use std::io;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::Deserialize;
use thiserror::Error;

/// File consulted for the optional configuration layer.
pub const CONFIG_FILE: &str = "hostlink.toml";

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host address both listeners bind to.
    pub bind_host: String,
    /// TCP port serving the command protocol.
    pub command_port: u16,
    /// UDP port answering discovery probes.
    pub discovery_port: u16,
    /// Root directory enumerated by the directory-listing command.
    pub browse_root: Utf8PathBuf,
    /// Per-connection read/write timeout in seconds; zero disables.
    pub session_timeout_secs: u64,
    /// Tracing filter expression.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_owned(),
            command_port: DEFAULT_COMMAND_PORT,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            browse_root: default_browse_root(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            log_format: default_log_format(),
        }
    }
}

/// Partial configuration parsed from the TOML layer.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileOverlay {
    bind_host: Option<String>,
    command_port: Option<u16>,
    discovery_port: Option<u16>,
    browse_root: Option<Utf8PathBuf>,
    session_timeout_secs: Option<u64>,
    log_filter: Option<String>,
    log_format: Option<LogFormat>,
}

impl Config {
    /// Loads configuration from the working directory and process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the configuration file exists but
    /// cannot be read or parsed, or when an environment override carries a
    /// value that does not parse for its key.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match fs::read_to_string(CONFIG_FILE) {
            Ok(contents) => Some(contents),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(ConfigError::ReadFile {
                    path: CONFIG_FILE.to_owned(),
                    source,
                });
            }
        };
        Self::from_layers(file.as_deref(), &|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an optional file layer and an
    /// environment lookup, in that precedence order over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file layer fails to parse or an
    /// environment value is invalid for its key.
    pub fn from_layers(
        file: Option<&str>,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = file {
            let overlay: FileOverlay =
                toml::from_str(raw).map_err(|source| ConfigError::ParseFile { source })?;
            config.apply_overlay(overlay);
        }
        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_overlay(&mut self, overlay: FileOverlay) {
        if let Some(value) = overlay.bind_host {
            self.bind_host = value;
        }
        if let Some(value) = overlay.command_port {
            self.command_port = value;
        }
        if let Some(value) = overlay.discovery_port {
            self.discovery_port = value;
        }
        if let Some(value) = overlay.browse_root {
            self.browse_root = value;
        }
        if let Some(value) = overlay.session_timeout_secs {
            self.session_timeout_secs = value;
        }
        if let Some(value) = overlay.log_filter {
            self.log_filter = value;
        }
        if let Some(value) = overlay.log_format {
            self.log_format = value;
        }
    }

    fn apply_env(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = env("HOSTLINK_BIND_HOST") {
            self.bind_host = value;
        }
        if let Some(value) = env("HOSTLINK_COMMAND_PORT") {
            self.command_port = parse_env("HOSTLINK_COMMAND_PORT", &value)?;
        }
        if let Some(value) = env("HOSTLINK_DISCOVERY_PORT") {
            self.discovery_port = parse_env("HOSTLINK_DISCOVERY_PORT", &value)?;
        }
        if let Some(value) = env("HOSTLINK_BROWSE_ROOT") {
            self.browse_root = Utf8PathBuf::from(value);
        }
        if let Some(value) = env("HOSTLINK_SESSION_TIMEOUT_SECS") {
            self.session_timeout_secs = parse_env("HOSTLINK_SESSION_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = env("HOSTLINK_LOG_FILTER") {
            self.log_filter = value;
        }
        if let Some(value) = env("HOSTLINK_LOG_FORMAT") {
            self.log_format = parse_env("HOSTLINK_LOG_FORMAT", &value)?;
        }
        Ok(())
    }

    /// Socket address string for the TCP command listener.
    #[must_use]
    pub fn command_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.command_port)
    }

    /// Socket address string for the UDP discovery responder.
    #[must_use]
    pub fn discovery_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.discovery_port)
    }
}

fn parse_env<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|error: T::Err| ConfigError::InvalidEnv {
        key,
        value: value.to_owned(),
        message: error.to_string(),
    })
}

/// Errors raised while resolving the daemon configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadFile {
        /// Path of the unreadable file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse configuration file: {source}")]
    ParseFile {
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// An environment override carries an unparseable value.
    #[error("invalid value '{value}' for {key}: {message}")]
    InvalidEnv {
        /// Environment variable name.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Parser diagnostic.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_resolve_without_layers() {
        let config = Config::from_layers(None, &no_env).expect("defaults should load");
        assert_eq!(config, Config::default());
        assert_eq!(config.command_port, DEFAULT_COMMAND_PORT);
        assert_eq!(config.discovery_port, DEFAULT_DISCOVERY_PORT);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let file = "command_port = 2200\nlog_format = \"compact\"\n";
        let config = Config::from_layers(Some(file), &no_env).expect("file layer should parse");
        assert_eq!(config.command_port, 2200);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert_eq!(config.discovery_port, DEFAULT_DISCOVERY_PORT);
    }

    #[test]
    fn environment_overrides_file_layer() {
        let file = "command_port = 2200\n";
        let env = |key: &str| (key == "HOSTLINK_COMMAND_PORT").then(|| "2300".to_owned());
        let config = Config::from_layers(Some(file), &env).expect("layers should resolve");
        assert_eq!(config.command_port, 2300);
    }

    #[test]
    fn browse_root_and_timeout_come_through() {
        let env = |key: &str| match key {
            "HOSTLINK_BROWSE_ROOT" => Some("/srv/share".to_owned()),
            "HOSTLINK_SESSION_TIMEOUT_SECS" => Some("0".to_owned()),
            _ => None,
        };
        let config = Config::from_layers(None, &env).expect("env layer should resolve");
        assert_eq!(config.browse_root, Utf8PathBuf::from("/srv/share"));
        assert_eq!(config.session_timeout_secs, 0);
    }

    #[rstest]
    #[case("HOSTLINK_COMMAND_PORT", "not-a-port")]
    #[case("HOSTLINK_SESSION_TIMEOUT_SECS", "-5")]
    #[case("HOSTLINK_LOG_FORMAT", "yaml")]
    fn invalid_environment_values_are_rejected(#[case] key: &'static str, #[case] bad: &str) {
        let bad = bad.to_owned();
        let env = move |candidate: &str| (candidate == key).then(|| bad.clone());
        let result = Config::from_layers(None, &env);
        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let result = Config::from_layers(Some("mystery_knob = true\n"), &no_env);
        assert!(matches!(result, Err(ConfigError::ParseFile { .. })));
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        let format: LogFormat = "COMPACT".parse().expect("case-insensitive parse");
        assert_eq!(format, LogFormat::Compact);
    }
}
