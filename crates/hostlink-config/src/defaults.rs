use camino::Utf8PathBuf;

/// Default TCP port for the command protocol.
pub const DEFAULT_COMMAND_PORT: u16 = 12345;

/// Default UDP port for discovery probes.
pub const DEFAULT_DISCOVERY_PORT: u16 = 54321;

/// Default host both listeners bind to.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default per-connection read/write timeout in seconds. Zero disables.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 300;

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the daemon.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Computes the default root the directory-listing command enumerates.
pub fn default_browse_root() -> Utf8PathBuf {
    #[cfg(windows)]
    {
        Utf8PathBuf::from("C:\\")
    }

    #[cfg(not(windows))]
    {
        Utf8PathBuf::from("/")
    }
}
