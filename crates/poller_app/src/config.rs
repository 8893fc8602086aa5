//! Runtime configuration for the poller binary.
//!
//! Values come from built-in defaults, then an optional `cv_poller.ron`
//! file, then `CV_POLLER_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use poller_engine::ApiSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "cv_poller.ron";
pub const DEFAULT_SESSION_FILE: &str = ".cv_poller_session.ron";

pub const ENV_API_URL: &str = "CV_POLLER_API_URL";
pub const ENV_TOKEN: &str = "CV_POLLER_TOKEN";
pub const ENV_LOG_LEVEL: &str = "CV_POLLER_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_url: String,
    pub upload_path: String,
    pub status_path: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub session_file: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Token from the environment; never written to disk.
    #[serde(skip)]
    pub token_override: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            api_url: api.base_url,
            upload_path: api.upload_path,
            status_path: api.status_path,
            connect_timeout_ms: api.connect_timeout.as_millis() as u64,
            request_timeout_ms: api.request_timeout.as_millis() as u64,
            poll_interval_ms: api.poll_interval.as_millis() as u64,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from(poller_logging::DEFAULT_LOG_FILE)),
            token_override: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`. A missing file yields the defaults unless `required`.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        ron::from_str(content).map_err(|err| err.to_string())
    }

    /// Applies `CV_POLLER_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.token_override = Some(token);
        }
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_url.clone(),
            upload_path: self.upload_path.clone(),
            status_path: self.status_path.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            // A zero period would make the timer spin.
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(100)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload the file and follow processing to the end.
    Upload(PathBuf),
    /// Only check the current processing status (and follow it if running).
    Status,
    /// Store a bearer token for later runs.
    Login(String),
    /// Forget the stored token.
    Logout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

pub const USAGE: &str = "usage: cv_poller [--config FILE] (<cv.pdf> | --status | --login TOKEN | --logout)";

impl CliArgs {
    /// Parses arguments, excluding the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let mut config_path = None;
        let mut command = None;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let next = match arg.as_str() {
                "--config" => {
                    let value = args.next().ok_or_else(|| usage("--config needs a path"))?;
                    config_path = Some(PathBuf::from(value));
                    continue;
                }
                "--status" => Command::Status,
                "--logout" => Command::Logout,
                "--login" => Command::Login(args.next().ok_or_else(|| usage("--login needs a token"))?),
                "-h" | "--help" => return Err(usage("")),
                flag if flag.starts_with("--") => return Err(usage(&format!("unknown flag {flag}"))),
                path => Command::Upload(PathBuf::from(path)),
            };
            if command.replace(next).is_some() {
                return Err(usage("only one command may be given"));
            }
        }

        let command = command.ok_or_else(|| usage("no command given"))?;
        Ok(Self {
            config_path,
            command,
        })
    }
}

fn usage(problem: &str) -> ConfigError {
    if problem.is_empty() {
        ConfigError::Usage(USAGE.to_string())
    } else {
        ConfigError::Usage(format!("{problem}\n{USAGE}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = AppConfig::parse("(api_url: \"https://cv.example.com\", poll_interval_ms: 500)")
            .unwrap();
        assert_eq!(config.api_url, "https://cv.example.com");
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.upload_path, "/v1/profile/cv");
        assert_eq!(config.session_file, PathBuf::from(DEFAULT_SESSION_FILE));
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(&temp.path().join("absent.ron"), false).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(matches!(
            AppConfig::load(&temp.path().join("absent.ron"), true),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("cv_poller.ron");
        fs::write(&path, "(api_url: 42)").unwrap();
        assert!(matches!(
            AppConfig::load(&path, true),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_win_and_blank_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            ENV_API_URL => Some("http://staging:9000".to_string()),
            ENV_TOKEN => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_url, "http://staging:9000");
        assert_eq!(config.token_override, None);
    }

    #[test]
    fn api_settings_clamp_zero_interval() {
        let config = AppConfig {
            poll_interval_ms: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.api_settings().poll_interval, Duration::from_millis(100));
        assert_eq!(
            AppConfig::default().api_settings(),
            ApiSettings::default()
        );
    }

    #[test]
    fn cli_parses_each_command() {
        assert_eq!(
            CliArgs::parse(args(&["cv.pdf"])).unwrap().command,
            Command::Upload(PathBuf::from("cv.pdf"))
        );
        assert_eq!(
            CliArgs::parse(args(&["--config", "x.ron", "--status"])).unwrap(),
            CliArgs {
                config_path: Some(PathBuf::from("x.ron")),
                command: Command::Status,
            }
        );
        assert_eq!(
            CliArgs::parse(args(&["--login", "abc"])).unwrap().command,
            Command::Login("abc".to_string())
        );
    }

    #[test]
    fn cli_rejects_ambiguous_or_empty_input() {
        assert!(CliArgs::parse(args(&[])).is_err());
        assert!(CliArgs::parse(args(&["a.pdf", "b.pdf"])).is_err());
        assert!(CliArgs::parse(args(&["--verbose"])).is_err());
        assert!(CliArgs::parse(args(&["--login"])).is_err());
    }
}
