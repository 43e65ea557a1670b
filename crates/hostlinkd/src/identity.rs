//! Server identity advertised to discovery clients.

use std::fmt;

/// Host name and advertised command port, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    hostname: String,
    command_port: u16,
}

impl ServerIdentity {
    /// Resolves the local host name and pairs it with the advertised port.
    #[must_use]
    pub fn resolve(command_port: u16) -> Self {
        let hostname =
            sysinfo::System::host_name().unwrap_or_else(|| String::from("unknown-host"));
        Self {
            hostname,
            command_port,
        }
    }

    /// Builds an identity from explicit parts.
    #[must_use]
    pub fn new(hostname: impl Into<String>, command_port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            command_port,
        }
    }

    /// Host name component.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Advertised TCP command port.
    #[must_use]
    pub fn command_port(&self) -> u16 {
        self.command_port
    }

    /// Payload sent in reply to a discovery probe.
    #[must_use]
    pub fn discovery_reply(&self) -> String {
        format!("SERVER_RESPONSE:{}:{}", self.hostname, self.command_port)
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.hostname, self.command_port)
    }
}
