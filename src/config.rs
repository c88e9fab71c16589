use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration settings for the controller and its driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Maximum number of executions running at the same time
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Executions running longer than this are reported as failed
    #[serde(default, with = "humantime_serde")]
    pub execution_timeout: Option<Duration>,

    /// Prompt printed by the interactive loop
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "cmdctl=trace")
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            execution_timeout: None,
            prompt: default_prompt(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ControllerError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("cmdctl").join("config.toml"))
    }

    /// Load from `path` if given, otherwise from the default location.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::load_from_file(p),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Merge with command-line arguments, giving priority to CLI args
    pub fn merge_with_cli_args(mut self, cli_args: &crate::cli::Cli) -> Self {
        if let Some(n) = cli_args.max_concurrent {
            self.max_concurrent = n;
        }
        if let Some(timeout) = cli_args.timeout {
            self.execution_timeout = Some(Duration::from(timeout));
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(ControllerError::configuration(
                "max_concurrent must be at least 1",
            ));
        }
        if self.execution_timeout == Some(Duration::ZERO) {
            return Err(ControllerError::configuration(
                "execution_timeout must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_max_concurrent() -> usize {
    16
}

fn default_prompt() -> String {
    "> ".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrent, 16);
        assert_eq!(config.execution_timeout, None);
        assert_eq!(config.prompt, "> ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml("execution_timeout = \"1m 30s\"\n").unwrap();
        assert_eq!(config.execution_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.max_concurrent, 16);
        assert_eq!(config.prompt, "> ");
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "max_concurrent = 2\nprompt = \"$ \"\nlog_level = \"debug\"\n",
        )
        .unwrap();

        let config = Config::load(Some(config_path.as_path())).unwrap();
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.prompt, "$ ");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let err = Config::load(Some(temp_dir.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, ControllerError::Io(_)));
    }

    #[test]
    fn test_bad_file_is_a_configuration_error() {
        let err = Config::from_toml("max_concurrent = \"many\"").unwrap_err();
        assert!(matches!(err, ControllerError::Configuration(_)));

        let err = Config::from_toml("unknown_key = 1").unwrap_err();
        assert!(matches!(err, ControllerError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = Config {
            max_concurrent: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            execution_timeout: Some(Duration::ZERO),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_args_override_file_values() {
        let file = Config::from_toml("max_concurrent = 2\nexecution_timeout = \"5s\"\n").unwrap();
        let cli = crate::cli::Cli::parse_from(["cmdctl", "--max-concurrent", "8"]);

        let merged = file.clone().merge_with_cli_args(&cli);
        assert_eq!(merged.max_concurrent, 8);
        assert_eq!(merged.execution_timeout, Some(Duration::from_secs(5)));

        let cli = crate::cli::Cli::parse_from(["cmdctl", "--timeout", "250ms"]);
        let merged = file.merge_with_cli_args(&cli);
        assert_eq!(merged.max_concurrent, 2);
        assert_eq!(merged.execution_timeout, Some(Duration::from_millis(250)));
    }
}
