//! Daemon assembly: wires the acceptor, the discovery responder, and the
//! session engine together behind a single start/shutdown handle.

use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use hostlink_config::Config;

use crate::discovery::{DiscoveryError, DiscoveryHandle, DiscoveryResponder};
use crate::identity::ServerIdentity;
use crate::ports::{
    FileStore, HostFileStore, LoggingMessenger, LoggingPeripherals, MessagePort, PeripheralPort,
    ProcessTable, SystemProcessTable,
};
use crate::session::{Session, SessionContext};
use crate::state::SharedToggleState;
use crate::transport::{CommandListener, ConnectionHandler, ListenerError, ListenerHandle};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Collaborator ports injected into every session.
pub struct Collaborators {
    /// Filesystem collaborator.
    pub files: Arc<dyn FileStore>,
    /// Process-table collaborator.
    pub processes: Arc<dyn ProcessTable>,
    /// Peripheral-control collaborator.
    pub peripherals: Arc<dyn PeripheralPort>,
    /// Messaging collaborator.
    pub messages: Arc<dyn MessagePort>,
}

impl Collaborators {
    /// Production set backed by the host OS.
    #[must_use]
    pub fn host() -> Self {
        Self {
            files: Arc::new(HostFileStore::new()),
            processes: Arc::new(SystemProcessTable::new()),
            peripherals: Arc::new(LoggingPeripherals::new()),
            messages: Arc::new(LoggingMessenger::new()),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::host()
    }
}

/// Errors surfaced while starting or stopping the daemon.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The command listener failed.
    #[error("command listener: {0}")]
    Listener(#[from] ListenerError),
    /// The discovery responder failed.
    #[error("discovery responder: {0}")]
    Discovery(#[from] DiscoveryError),
    /// A bound socket would not report its local address.
    #[error("failed to inspect bound address: {0}")]
    LocalAddr(#[from] io::Error),
}

/// A running daemon: command listener plus discovery responder.
pub struct HostDaemon {
    command_addr: SocketAddr,
    discovery_addr: SocketAddr,
    listener: ListenerHandle,
    discovery: DiscoveryHandle,
}

impl HostDaemon {
    /// Address of the TCP command endpoint.
    #[must_use]
    pub fn command_addr(&self) -> SocketAddr {
        self.command_addr
    }

    /// Address of the UDP discovery endpoint.
    #[must_use]
    pub fn discovery_addr(&self) -> SocketAddr {
        self.discovery_addr
    }

    /// Stops accepting connections and answering probes.
    ///
    /// In-flight sessions are not signalled; they end with their
    /// connections.
    pub fn shutdown(&self) {
        self.listener.shutdown();
        self.discovery.shutdown();
    }

    /// Waits for both background loops to exit.
    ///
    /// # Errors
    ///
    /// Returns a [`ServerError`] if either loop thread panicked.
    pub fn join(self) -> Result<(), ServerError> {
        self.listener.join()?;
        self.discovery.join()?;
        Ok(())
    }
}

/// Binds both endpoints and starts serving.
///
/// # Errors
///
/// Returns a [`ServerError`] when either endpoint cannot be bound; bind
/// failure at startup is fatal.
pub fn start(config: &Config, collaborators: Collaborators) -> Result<HostDaemon, ServerError> {
    let listener = CommandListener::bind(&config.bind_host, config.command_port)?;
    let command_addr = listener.local_addr()?;

    let identity = ServerIdentity::resolve(command_addr.port());
    let responder =
        DiscoveryResponder::bind(&config.bind_host, config.discovery_port, identity.clone())?;
    let discovery_addr = responder.local_addr()?;

    let ctx = Arc::new(SessionContext {
        files: collaborators.files,
        processes: collaborators.processes,
        peripherals: collaborators.peripherals,
        messages: collaborators.messages,
        input_block: SharedToggleState::new(),
        browse_root: config.browse_root.clone(),
    });
    let timeout = (config.session_timeout_secs > 0)
        .then(|| Duration::from_secs(config.session_timeout_secs));
    let handler: Arc<dyn ConnectionHandler> = Arc::new(SessionConnectionHandler { ctx, timeout });

    let listener = listener.start(handler)?;
    let discovery = responder.start();

    info!(
        target: SERVER_TARGET,
        command = %command_addr,
        discovery = %discovery_addr,
        identity = %identity,
        "daemon serving"
    );

    Ok(HostDaemon {
        command_addr,
        discovery_addr,
        listener,
        discovery,
    })
}

/// Bridges accepted connections into session runs.
struct SessionConnectionHandler {
    ctx: Arc<SessionContext>,
    timeout: Option<Duration>,
}

impl SessionConnectionHandler {
    fn serve(&self, stream: TcpStream) -> Result<(), crate::session::SessionError> {
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Session::new(reader, writer, Arc::clone(&self.ctx)).run()
    }
}

impl ConnectionHandler for SessionConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        debug!(target: SERVER_TARGET, ?peer, "session opened");
        match self.serve(stream) {
            Ok(()) => debug!(target: SERVER_TARGET, ?peer, "session closed"),
            Err(error) => {
                debug!(target: SERVER_TARGET, ?peer, %error, "session closed on fault");
            }
        }
    }
}
