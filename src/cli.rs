use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use utilityhub_lib::config::LogFormat;
use utilityhub_lib::Config;

#[derive(Parser, Debug)]
#[command(name = "utilityhub")]
#[command(
    version,
    about = "UtilityHub - HTML/URL to PDF conversion service with request tracking",
    long_about = "UtilityHub\n\nServes POST /convert/url and POST /convert/html, rendering through a shared headless Chromium session. Every request is tagged with an id (taken from X-Request-ID or generated) and its log records can be read back from GET /logs.\n\nSettings come from a TOML file (--config, or ./utilityhub.toml when present); flags and environment variables override it."
)]
pub struct Cli {
    #[arg(
        long,
        env = "UTILITYHUB_CONFIG",
        value_name = "PATH",
        help = "Optional config file (TOML); flags override its values"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, env = "HOST", help = "Address to bind")]
    pub host: Option<String>,

    #[arg(long, env = "PORT", help = "Port to listen on")]
    pub port: Option<u16>,

    #[arg(
        long,
        env = "LOG_LEVEL",
        value_name = "LEVEL",
        help = "Base log level (trace|debug|info|warn|error)"
    )]
    pub log_level: Option<String>,

    #[arg(long, help = "Emit logs as JSON lines instead of compact text")]
    pub log_json: bool,

    #[arg(
        long,
        env = "LOG_FILE",
        value_name = "PATH",
        help = "Append every tracked record to this JSON-lines file"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        help = "Number of tracked records kept in memory for /logs"
    )]
    pub log_capacity: Option<usize>,

    #[arg(
        long,
        env = "CHROME_PATH",
        value_name = "PATH",
        help = "Chromium/Chrome executable (auto-detected when omitted)"
    )]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, help = "Launch Chromium without its sandbox (needed in most containers)")]
    pub no_sandbox: bool,

    #[arg(long, value_name = "MS", help = "Navigation timeout in milliseconds")]
    pub nav_timeout: Option<u64>,

    #[arg(long, help = "Start the browser at boot instead of on the first request")]
    pub warm_up: bool,
}

impl Cli {
    /// Overlays the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.log_json {
            config.logging.format = LogFormat::Json;
        }
        if let Some(path) = &self.log_file {
            config.tracker.log_file = Some(path.clone());
        }
        if let Some(capacity) = self.log_capacity {
            config.tracker.capacity = capacity;
        }
        if let Some(path) = &self.chrome_path {
            config.browser.executable = Some(path.clone());
        }
        if self.no_sandbox {
            config.browser.sandbox = false;
        }
        if let Some(ms) = self.nav_timeout {
            config.browser.navigation_timeout = Duration::from_millis(ms);
        }
        if self.warm_up {
            config.browser.warm_up = true;
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
