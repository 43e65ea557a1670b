//! Remote host-administration daemon.
//!
//! The daemon serves a private, unauthenticated, line-oriented TCP command
//! protocol for browsing and transferring files, managing processes, and
//! toggling peripheral state, and answers UDP broadcast probes so clients
//! can discover it. Each accepted connection runs its own [`session`]
//! state machine, which interleaves newline-delimited commands with
//! length-prefixed binary file frames on a single byte stream.
//!
//! The protocol core stays narrow: OS capabilities (filesystem, process
//! table, peripheral control, interactive messaging) sit behind the trait
//! seams in [`ports`], so deployments and tests can substitute their own
//! backends.

pub mod discovery;
pub mod identity;
pub mod ports;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod transport;

pub use identity::ServerIdentity;
pub use server::{Collaborators, HostDaemon, ServerError, start};
pub use session::{Command, Session, SessionContext, SessionError, Verb};
pub use state::SharedToggleState;
pub use telemetry::{TelemetryError, TelemetryHandle};
