//! Logging to standard output and the system log.
//!
//! ```rust,no_run
//! use svddisplay::logs::{init_logging, LoggingOptions};
//!
//! let config = svdconfig::Config::load_config("")?;
//! init_logging(LoggingOptions::from_config(&config))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

#[cfg(unix)]
mod sysloglayer;

#[cfg(unix)]
pub use sysloglayer::SyslogLayer;

use std::str::FromStr;

use anyhow::{Context, Result};
use svdconfig::Config;
use tracing_subscriber::{Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Name the program logs under
pub const SYSLOG_IDENT: &str = "SonosDisplay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub min_level: LevelFilter,
    pub enable_console: bool,
    pub enable_syslog: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::INFO,
            enable_console: true,
            enable_syslog: true,
        }
    }
}

impl LoggingOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_level: string_to_levelfilter(&config.get_log_min_level())
                .unwrap_or(LevelFilter::INFO),
            enable_console: config.get_log_enable_console(),
            enable_syslog: config.get_log_enable_syslog(),
        }
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(options: LoggingOptions) -> Result<()> {
    let console = options.enable_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_ansi(true)
    });

    #[cfg(unix)]
    let syslog = options.enable_syslog.then(|| SyslogLayer::new(SYSLOG_IDENT));
    #[cfg(not(unix))]
    let syslog: Option<LevelFilter> = None;

    Registry::default()
        .with(options.min_level)
        .with(console)
        .with(syslog)
        .try_init()
        .context("Failed to install the log subscriber")
}

fn string_to_levelfilter(level: &str) -> Option<LevelFilter> {
    LevelFilter::from_str(level.trim()).ok()
}
