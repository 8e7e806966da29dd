use std::fmt;

use tracing::{debug, error, info, trace, warn};

use crate::config::LogLevel;

// -----------------------------------------------------------------------------
// ----- Logger ----------------------------------------------------------------

/// Sink for a connection's own log lines.
pub trait Logger: Send + Sync + fmt::Debug {
    fn output(&self, level: LogLevel, message: &str);
}

// -----------------------------------------------------------------------------
// ----- TracingLogger ---------------------------------------------------------

/// Routes connection log lines into `tracing`, tagged with the connection name.
#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: String,
}

impl TracingLogger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for TracingLogger {
    fn default() -> Self {
        Self::new("nsqpool")
    }
}

impl Logger for TracingLogger {
    fn output(&self, level: LogLevel, message: &str) {
        let name = &self.name;
        match level {
            LogLevel::Trace => trace!("[{name}] {message}"),
            LogLevel::Debug => debug!("[{name}] {message}"),
            LogLevel::Info => info!("[{name}] {message}"),
            LogLevel::Warn => warn!("[{name}] {message}"),
            LogLevel::Error => error!("[{name}] {message}"),
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
