//! Error types for the command listener.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the command listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The bind host did not resolve to a usable address.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Underlying resolution error.
        #[source]
        source: io::Error,
    },
    /// Creating or configuring the socket failed.
    #[error("failed to prepare listener socket: {source}")]
    Socket {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Binding the resolved address failed.
    #[error("failed to bind tcp {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to switch listener to non-blocking accepts: {source}")]
    NonBlocking {
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The accept-loop thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
