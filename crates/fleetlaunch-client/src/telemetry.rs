//! Logging initialisation.
//!
//! Call [`init_tracing`] once at process startup.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `FLEETLAUNCH_LOG_FORMAT=json` | Emit newline-delimited JSON logs, whatever the configured format. |
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetlaunch_client::{ClientConfig, telemetry};
//!
//! let cfg = ClientConfig::default();
//! telemetry::init_tracing(cfg.log_format).expect("logging already initialised");
//! ```

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogFormat;

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let override_format = std::env::var("FLEETLAUNCH_LOG_FORMAT").ok();
    match effective_format(format, override_format.as_deref()) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    }
}

fn effective_format(configured: LogFormat, env: Option<&str>) -> LogFormat {
    match env {
        Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => configured,
    }
}
