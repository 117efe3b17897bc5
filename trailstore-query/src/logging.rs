//! Logging setup for trailstore.
//!
//! All crates emit `tracing` events; this module installs a subscriber for
//! binaries that do not bring their own.
//!
//! # Environment Variables
//!
//! - `TRAILSTORE_DEBUG=true|1|yes` - Enable debug logging
//! - `TRAILSTORE_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `TRAILSTORE_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use trailstore_query::logging;
//!
//! logging::init();
//! ```

use crate::env::{EnvSource, StdEnvSource};
use std::sync::Once;

/// Enables debug logging.
pub const DEBUG_VAR: &str = "TRAILSTORE_DEBUG";
/// Overrides the log level.
pub const LEVEL_VAR: &str = "TRAILSTORE_LOG_LEVEL";
/// Selects the output format.
pub const FORMAT_VAR: &str = "TRAILSTORE_LOG_FORMAT";

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether logging was requested at all.
    pub enabled: bool,
    /// Level directive applied to the trailstore crates.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Resolve settings from an environment source.
    ///
    /// The level defaults to `debug` when debug logging is enabled and to
    /// `warn` otherwise. Unknown levels fall back to that default.
    pub fn from_source(env: &dyn EnvSource) -> Self {
        let debug = env.flag(DEBUG_VAR);
        let default_level = if debug { "debug" } else { "warn" };

        let level = env
            .get(LEVEL_VAR)
            .map(|level| match level.trim().to_lowercase().as_str() {
                "trace" => "trace",
                "debug" => "debug",
                "info" => "info",
                "warn" => "warn",
                "error" => "error",
                _ => default_level,
            })
            .unwrap_or(default_level);

        let format = env
            .get(FORMAT_VAR)
            .map(|f| match f.trim().to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Json,
            })
            .unwrap_or(LogFormat::Json);

        Self {
            enabled: debug || env.contains(LEVEL_VAR),
            level,
            format,
        }
    }

    /// The `EnvFilter` directive string for these settings.
    pub fn directive(&self) -> String {
        format!(
            "trailstore={lvl},trailstore_query={lvl},trailstore_mongodb={lvl}",
            lvl = self.level
        )
    }
}

/// Check if debug logging is enabled via `TRAILSTORE_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    StdEnvSource.flag(DEBUG_VAR)
}

/// Initialize logging from the process environment.
///
/// Subsequent calls are no-ops. Nothing is installed unless
/// `TRAILSTORE_DEBUG` or `TRAILSTORE_LOG_LEVEL` is set.
pub fn init() {
    init_from(&StdEnvSource);
}

/// Initialize logging from an explicit environment source.
pub fn init_from(env: &dyn EnvSource) {
    let settings = LogSettings::from_source(env);

    INIT.call_once(|| {
        if !settings.enabled {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.directive())
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            // try_init: an embedding application may already own the global subscriber
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = settings.level,
                    format = ?settings.format,
                    "trailstore logging initialized"
                );
            }
        }
    });
}
