//! Peripheral-control port: input blocking and monitor power.

use thiserror::Error;

use tracing::info;

use super::PORTS_TARGET;

/// Failure reported by a peripheral backend.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PeripheralError {
    /// Underlying failure text.
    pub message: String,
}

impl PeripheralError {
    /// Builds an error from a failure description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Peripheral operations the session engine needs.
///
/// `set_monitor_power` is fire-and-forget: the wire protocol acknowledges
/// the request, not the observed hardware state.
#[cfg_attr(test, mockall::automock)]
pub trait PeripheralPort: Send + Sync {
    /// Blocks or unblocks local mouse/keyboard input.
    fn set_input_blocked(&self, blocked: bool) -> Result<(), PeripheralError>;

    /// Turns the monitor on or off.
    fn set_monitor_power(&self, on: bool);
}

/// Default port that records requests via tracing.
///
/// The OS-level hooks (input hooks, display power) live outside the
/// protocol core; deployments wire their own [`PeripheralPort`] in.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPeripherals;

impl LoggingPeripherals {
    /// Builds the logging port.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PeripheralPort for LoggingPeripherals {
    fn set_input_blocked(&self, blocked: bool) -> Result<(), PeripheralError> {
        info!(target: PORTS_TARGET, blocked, "input block requested");
        Ok(())
    }

    fn set_monitor_power(&self, on: bool) {
        info!(target: PORTS_TARGET, on, "monitor power requested");
    }
}
