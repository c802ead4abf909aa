use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{HubError, Result};

/// Directives applied on top of the base level to quiet the browser driver.
const QUIET_DIRECTIVES: [&str; 2] = ["chromiumoxide=warn", "tungstenite=warn"];

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(logging.level_filter()?.into())
        .from_env_lossy();
    for directive in QUIET_DIRECTIVES {
        let directive = directive
            .parse()
            .map_err(|err| HubError::Telemetry(format!("invalid directive {directive}: {err}")))?;
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| HubError::Telemetry(format!("failed to install tracing subscriber: {err}")))
}
