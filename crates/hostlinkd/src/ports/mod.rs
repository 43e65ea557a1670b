//! Collaborator ports consumed by the session engine.
//!
//! Each port is a narrow trait seam over a capability the protocol core
//! depends on but does not own: the filesystem, the process table,
//! peripheral control, and interactive messaging. Production
//! implementations ship alongside the traits; tests substitute doubles.

mod fs;
mod messaging;
mod peripherals;
mod process;

pub use self::fs::{EntryInfo, EntryKind, FileStore, FsError, HostFileStore};
pub use self::messaging::{LoggingMessenger, MessageError, MessagePort};
pub use self::peripherals::{LoggingPeripherals, PeripheralError, PeripheralPort};
pub use self::process::{ProcessError, ProcessRecord, ProcessTable, SystemProcessTable};

#[cfg(test)]
pub(crate) use self::messaging::MockMessagePort;
#[cfg(test)]
pub(crate) use self::peripherals::MockPeripheralPort;
#[cfg(test)]
pub(crate) use self::process::MockProcessTable;

pub(crate) const PORTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::ports");
