//! Native log output. The core only emits `tracing` events; the host picks
//! whether and how they are printed.

use crate::core::keys::env;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or does not parse.
pub const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    /// One JSON object per line, for log shippers.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format: {0}")]
pub struct UnknownLogFormat(pub String);

impl std::str::FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(UnknownLogFormat(value.trim().to_string())),
        }
    }
}

impl LogFormat {
    /// `AVALAUNCH_LOG_FORMAT` if it parses, else `json` when
    /// `AVALAUNCH_LOG_JSON=1`, else pretty.
    pub fn from_env() -> Self {
        if let Some(format) = std::env::var(env::LOG_FORMAT).ok().and_then(|raw| raw.parse().ok()) {
            return format;
        }
        match std::env::var(env::LOG_JSON) {
            Ok(flag) if flag.trim() == "1" => LogFormat::Json,
            _ => LogFormat::default(),
        }
    }
}

/// Install the global subscriber in the format the environment asks for.
pub fn init_logging() -> bool { init_logging_with(LogFormat::from_env()) }

/// Install the global subscriber, writing to stderr. Returns `false` when one
/// was already installed, in which case nothing changes.
pub fn init_logging_with(format: LogFormat) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = fmt::Subscriber::builder().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}
