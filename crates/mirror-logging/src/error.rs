//! Error types for logging setup

use thiserror::Error;

/// Errors that can occur while installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    /// A global subscriber is already installed
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The rolling file appender could not be created
    #[error("failed to create log appender: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    /// The log file or directory could not be created
    #[error("failed to create log file: {0}")]
    Io(#[from] std::io::Error),
}
