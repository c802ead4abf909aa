use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::browser::{BrowserOptions, DEFAULT_LAUNCH_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT};
use crate::correlation::DEFAULT_LOG_CAPACITY;
use crate::error::{HubError, Result};

/// Config file picked up from the working directory when none is given.
pub const LOCAL_CONFIG_FILE: &str = "utilityhub.toml";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub browser: BrowserConfig,
    pub tracker: TrackerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Base level directive (trace|debug|info|warn|error).
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(self.level.trim())
            .map_err(|_| HubError::config(format!("unknown log level '{}'", self.level)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub sandbox: bool,
    pub args: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub launch_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Duration,
    /// Start the browser at boot instead of on the first request.
    pub warm_up: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            sandbox: true,
            args: Vec::new(),
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            warm_up: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Records kept in memory for `/logs`.
    pub capacity: usize,
    /// Optional JSON-lines file every record is appended to.
    pub log_file: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
            log_file: None,
        }
    }
}

impl Config {
    /// Loads the given file, else `./utilityhub.toml` when present, else
    /// built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(LOCAL_CONFIG_FILE)).filter(|p| p.is_file()),
        };

        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|err| {
                    HubError::config(format!("failed to read {}: {}", path.display(), err))
                })?;
                Self::from_toml_str(&raw).map_err(|err| match err {
                    HubError::Config(msg) => {
                        HubError::config(format!("{}: {}", path.display(), msg))
                    }
                    other => other,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| HubError::config(err.to_string()))
    }

    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(HubError::config("server.host must not be empty"));
        }
        if self.server.port == 0 {
            return Err(HubError::config("server.port must be between 1 and 65535"));
        }
        if self.server.max_body_bytes == 0 {
            return Err(HubError::config("server.max_body_bytes must be positive"));
        }
        if self.tracker.capacity == 0 {
            return Err(HubError::config("tracker.capacity must be positive"));
        }
        if self.browser.navigation_timeout.is_zero() {
            return Err(HubError::config("browser.navigation_timeout must be positive"));
        }
        if self.browser.launch_timeout.is_zero() {
            return Err(HubError::config("browser.launch_timeout must be positive"));
        }
        self.logging.level_filter()?;
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            executable: self.browser.executable.clone(),
            headless: self.browser.headless,
            sandbox: self.browser.sandbox,
            args: self.browser.args.clone(),
            launch_timeout: self.browser.launch_timeout,
            navigation_timeout: self.browser.navigation_timeout,
        }
    }
}
