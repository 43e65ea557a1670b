//! Interactive-messaging port.

use thiserror::Error;

use tracing::info;

use super::PORTS_TARGET;

/// Failure reported by a messaging backend.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct MessageError {
    /// Underlying failure text.
    pub message: String,
}

/// Displays operator messages to whoever is at the host.
#[cfg_attr(test, mockall::automock)]
pub trait MessagePort: Send + Sync {
    /// Shows a message; success means the request was accepted.
    fn show_message(&self, text: &str) -> Result<(), MessageError>;
}

/// Default port that records messages via tracing. The interactive display
/// surface is an external collaborator.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMessenger;

impl LoggingMessenger {
    /// Builds the logging port.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MessagePort for LoggingMessenger {
    fn show_message(&self, text: &str) -> Result<(), MessageError> {
        info!(target: PORTS_TARGET, text, "message display requested");
        Ok(())
    }
}
