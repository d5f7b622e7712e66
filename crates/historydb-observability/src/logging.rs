//! Log Severity Mapping
//!
//! Deployments configure verbosity with the severity names
//! `DATA`, `ERROR`, `INFO`, `NOTICE` and `DEBUG` (case-insensitive), from
//! least to most verbose. They map onto tracing levels as follows:
//!
//! | Severity | Max tracing level |
//! |----------|-------------------|
//! | DATA     | ERROR             |
//! | ERROR    | WARN              |
//! | INFO     | INFO              |
//! | NOTICE   | DEBUG             |
//! | DEBUG    | TRACE             |
//!
//! Unknown names fall back to `INFO`.

use std::fmt;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Severity {
    Data,
    Error,
    #[default]
    Info,
    Notice,
    Debug,
}

impl Severity {
    /// Parse a severity name, falling back to `Info` for anything unknown.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    pub fn max_level(self) -> Level {
        match self {
            Severity::Data => Level::ERROR,
            Severity::Error => Level::WARN,
            Severity::Info => Level::INFO,
            Severity::Notice => Level::DEBUG,
            Severity::Debug => Level::TRACE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Data => "DATA",
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Debug => "DEBUG",
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DATA" => Ok(Severity::Data),
            "ERROR" => Ok(Severity::Error),
            "INFO" => Ok(Severity::Info),
            "NOTICE" => Ok(Severity::Notice),
            "DEBUG" => Ok(Severity::Debug),
            other => Err(format!("unknown log severity: {}", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracing level for a severity name.
pub fn parse_log_level(name: &str) -> Level {
    Severity::parse_lenient(name).max_level()
}

/// Install the global fmt subscriber for the given severity name.
pub fn init(severity: &str) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let severity = Severity::parse_lenient(severity);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(severity.max_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!(severity = %severity, "Logging initialized");
    Ok(())
}
