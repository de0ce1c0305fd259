//! Command-line interface for svcreg.
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::policy::StartupPolicy;

/// Wrapper around `LevelFilter` so clap can parse log levels from either
/// string names ("info", "debug", etc.) or numeric shorthands (0-5).
#[derive(Clone, Copy, Debug)]
pub struct LogLevelArg(LevelFilter);

impl LogLevelArg {
    /// String representation suitable for `RUST_LOG`.
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            LevelFilter::OFF => "off",
            LevelFilter::ERROR => "error",
            LevelFilter::WARN => "warn",
            LevelFilter::INFO => "info",
            LevelFilter::DEBUG => "debug",
            LevelFilter::TRACE => "trace",
        }
    }
}

impl FromStr for LogLevelArg {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("log level cannot be empty".into());
        }

        if let Ok(number) = trimmed.parse::<u8>() {
            let level = match number {
                0 => LevelFilter::OFF,
                1 => LevelFilter::ERROR,
                2 => LevelFilter::WARN,
                3 => LevelFilter::INFO,
                4 => LevelFilter::DEBUG,
                5 => LevelFilter::TRACE,
                _ => {
                    return Err(format!(
                        "unsupported log level number '{number}' (expected 0-5)"
                    ));
                }
            };

            return Ok(LogLevelArg(level));
        }

        let lowercase = trimmed.to_ascii_lowercase();
        let level = match lowercase.as_str() {
            "off" => Some(LevelFilter::OFF),
            "error" | "err" => Some(LevelFilter::ERROR),
            "warn" | "warning" => Some(LevelFilter::WARN),
            "info" | "information" => Some(LevelFilter::INFO),
            "debug" => Some(LevelFilter::DEBUG),
            "trace" => Some(LevelFilter::TRACE),
            _ => None,
        }
        .ok_or_else(|| format!("invalid log level '{trimmed}'"))?;

        Ok(LogLevelArg(level))
    }
}

/// Command-line interface for svcreg.
#[derive(Parser)]
#[command(name = "svcreg", version, author)]
#[command(about = "A client for the Windows service control manager", long_about = None)]
pub struct Cli {
    /// Override the logging verbosity for this invocation only.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevelArg>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for svcreg.
#[derive(Subcommand)]
pub enum Commands {
    /// Register a new service entry (own-process, demand-start).
    Register {
        /// Name of the service entry to create.
        name: String,

        /// Path to the service executable.
        path: String,

        /// Display name (defaults to the service name).
        #[arg(short, long)]
        display_name: Option<String>,
    },

    /// Flag a service entry for deletion.
    Unregister {
        /// Name of the service entry to delete.
        name: String,
    },

    /// Start a service and wait for it to reach Running.
    Start {
        /// Name of the service to start.
        name: String,
    },

    /// Send the stop control signal without waiting for Stopped.
    Stop {
        /// Name of the service to stop.
        name: String,
    },

    /// Show whether a service is registered and running.
    Status {
        /// Name of the service to query.
        name: String,

        /// Emit machine-readable JSON output instead of a status line.
        #[arg(long)]
        json: bool,
    },

    /// Show or change the startup policy.
    Startup {
        /// Name of the service to configure.
        name: String,

        /// New policy (automatic, manual, or disabled); omit to read.
        policy: Option<StartupPolicy>,
    },

    /// Show the display name and executable path of a service.
    Info {
        /// Name of the service to inspect.
        name: String,
    },
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
