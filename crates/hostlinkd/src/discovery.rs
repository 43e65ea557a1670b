//! UDP discovery responder.
//!
//! Clients locate the daemon by broadcasting a probe datagram; the
//! responder answers probes whose trimmed payload is exactly [`PROBE`]
//! with the server identity and ignores everything else. Datagram-level
//! faults are isolated: they are logged and the loop continues.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::identity::ServerIdentity;
use crate::transport::resolve_bind_addr;

/// Exact probe payload the responder answers.
pub const PROBE: &str = "DISCOVER";

const MAX_DATAGRAM: usize = 1024;
const RECV_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Errors surfaced while binding the discovery socket.
#[derive(Debug, Error)]
pub enum DiscoveryError {
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
    #[error("failed to prepare discovery socket: {source}")]
    Socket {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Binding the resolved address failed.
    #[error("failed to bind udp {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying bind error.
        #[source]
        source: io::Error,
    },
    /// The responder thread panicked.
    #[error("discovery thread panicked")]
    ThreadPanic,
}

/// Responder bound to the discovery port, independent of all TCP state.
#[derive(Debug)]
pub struct DiscoveryResponder {
    socket: UdpSocket,
    identity: ServerIdentity,
}

impl DiscoveryResponder {
    /// Binds the discovery port with broadcast reception and address reuse.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscoveryError`] when resolution, socket options, or
    /// the bind fails.
    pub fn bind(host: &str, port: u16, identity: ServerIdentity) -> Result<Self, DiscoveryError> {
        let addr = resolve_bind_addr(host, port).map_err(|source| DiscoveryError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
            .map_err(|source| DiscoveryError::Socket { source })?;
        socket
            .set_reuse_address(true)
            .map_err(|source| DiscoveryError::Socket { source })?;
        socket
            .set_broadcast(true)
            .map_err(|source| DiscoveryError::Socket { source })?;
        socket
            .bind(&addr.into())
            .map_err(|source| DiscoveryError::Bind { addr, source })?;
        let socket: UdpSocket = socket.into();
        socket
            .set_nonblocking(true)
            .map_err(|source| DiscoveryError::Socket { source })?;
        Ok(Self { socket, identity })
    }

    /// Address the responder actually bound (relevant with port 0).
    ///
    /// # Errors
    ///
    /// Propagates the underlying socket error.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Starts the receive loop on a background thread.
    #[must_use]
    pub fn start(self) -> DiscoveryHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_recv_loop(&self, &shutdown_flag));
        DiscoveryHandle {
            shutdown,
            handle: Some(handle),
        }
    }
}

/// Handle to the background receive loop.
pub struct DiscoveryHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DiscoveryHandle {
    /// Requests the receive loop to stop.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the receive loop to exit.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::ThreadPanic`] if the loop thread panicked.
    pub fn join(mut self) -> Result<(), DiscoveryError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| DiscoveryError::ThreadPanic)
        } else {
            Ok(())
        }
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_recv_loop(responder: &DiscoveryResponder, shutdown: &AtomicBool) {
    info!(
        target: DISCOVERY_TARGET,
        addr = ?responder.socket.local_addr().ok(),
        identity = %responder.identity,
        "discovery responder active"
    );
    let mut buffer = [0u8; MAX_DATAGRAM];
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match responder.socket.recv_from(&mut buffer) {
            Ok((length, peer)) => {
                last_error = None;
                answer_probe(responder, &buffer[..length], peer);
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(RECV_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(target: DISCOVERY_TARGET, %error, "datagram receive error");
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: DISCOVERY_TARGET, "discovery responder stopped");
}

fn answer_probe(responder: &DiscoveryResponder, payload: &[u8], peer: SocketAddr) {
    let text = String::from_utf8_lossy(payload);
    if text.trim() != PROBE {
        return;
    }
    let reply = responder.identity.discovery_reply();
    match responder.socket.send_to(reply.as_bytes(), peer) {
        Ok(_) => debug!(target: DISCOVERY_TARGET, %peer, "answered discovery probe"),
        Err(error) => warn!(target: DISCOVERY_TARGET, %peer, %error, "probe reply failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;
    use std::time::Duration;

    fn bound_responder() -> (DiscoveryHandle, SocketAddr) {
        let identity = ServerIdentity::new("atlas", 12345);
        let responder =
            DiscoveryResponder::bind("127.0.0.1", 0, identity).expect("bind responder");
        let addr = responder.local_addr().expect("local addr");
        (responder.start(), addr)
    }

    fn probe_client() -> UdpSocket {
        let client = UdpSocket::bind(("127.0.0.1", 0)).expect("bind client");
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("read timeout");
        client
    }

    #[test]
    fn answers_exact_probes_with_identity() {
        let (handle, addr) = bound_responder();
        let client = probe_client();
        client.send_to(b"DISCOVER", addr).expect("send probe");

        let mut buffer = [0u8; 256];
        let (length, _) = client.recv_from(&mut buffer).expect("receive reply");
        assert_eq!(&buffer[..length], b"SERVER_RESPONSE:atlas:12345");

        handle.shutdown();
        handle.join().expect("join responder");
    }

    #[test]
    fn probe_with_surrounding_whitespace_still_matches() {
        let (handle, addr) = bound_responder();
        let client = probe_client();
        client.send_to(b"DISCOVER\n", addr).expect("send probe");

        let mut buffer = [0u8; 256];
        let (length, _) = client.recv_from(&mut buffer).expect("receive reply");
        assert_eq!(&buffer[..length], b"SERVER_RESPONSE:atlas:12345");

        handle.shutdown();
        handle.join().expect("join responder");
    }

    #[test]
    fn ignores_other_payloads_and_keeps_running() {
        let (handle, addr) = bound_responder();
        let client = probe_client();
        client.send_to(b"DISCOVERY", addr).expect("send near-miss");
        client.send_to(&[0xFF, 0xFE, 0x00], addr).expect("send junk");
        client.send_to(b"DISCOVER", addr).expect("send real probe");

        // Only the exact probe draws a reply.
        let mut buffer = [0u8; 256];
        let (length, _) = client.recv_from(&mut buffer).expect("receive reply");
        assert_eq!(&buffer[..length], b"SERVER_RESPONSE:atlas:12345");
        assert!(client.recv_from(&mut buffer).is_err(), "no further replies");

        handle.shutdown();
        handle.join().expect("join responder");
    }
}
