//! Process-wide tracing setup.
//!
//! JSON lines to stdout by default; `TRIPSHEET_LOG_FORMAT=pretty` switches to the
//! human-readable formatter. Filtering follows `RUST_LOG` (default `info`).

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" | "human" => Some(Self::Pretty),
            _ => None,
        }
    }
}

pub fn init_tracing_from_env() -> Result<()> {
    let format = match std::env::var("TRIPSHEET_LOG_FORMAT") {
        Ok(v) => LogFormat::parse(&v).ok_or_else(|| {
            Error::Config(format!("TRIPSHEET_LOG_FORMAT must be 'json' or 'pretty', got '{v}'"))
        })?,
        Err(_) => LogFormat::Json,
    };
    init_tracing(format)
}

pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let res = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    res.map_err(|e| Error::Conflict(format!("tracing already initialized: {e}")))
}
