//! Process-table port backed by `sysinfo` and `std::process`.

use std::process::{Command, Stdio};

use sysinfo::{Pid, System};
use thiserror::Error;

/// One enumerated process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    /// Operating-system process identifier.
    pub pid: u32,
    /// Process name as reported by the OS.
    pub name: String,
    /// Resident memory in bytes.
    pub memory_bytes: u64,
}

/// Failures surfaced by the process table.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No process with the given identifier exists.
    #[error("no such process: {pid}")]
    NotFound {
        /// Requested identifier.
        pid: u32,
    },
    /// A spawn request carried no program name.
    #[error("empty command line")]
    EmptyCommandLine,
    /// Any other process-table failure.
    #[error("{message}")]
    Other {
        /// Underlying failure text.
        message: String,
    },
}

/// Process operations the session engine needs.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTable: Send + Sync {
    /// Enumerates running processes.
    fn list(&self) -> Result<Vec<ProcessRecord>, ProcessError>;

    /// Requests termination of a process; `0` means the request succeeded.
    fn terminate(&self, pid: u32) -> Result<i32, ProcessError>;

    /// Launches a command line without waiting for it, returning the new pid.
    fn spawn(&self, command_line: &str) -> Result<u32, ProcessError>;
}

/// Production [`ProcessTable`] querying the host via `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl SystemProcessTable {
    /// Builds a new table.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn snapshot() -> System {
        let mut system = System::new();
        system.refresh_processes();
        system
    }
}

impl ProcessTable for SystemProcessTable {
    fn list(&self) -> Result<Vec<ProcessRecord>, ProcessError> {
        let system = Self::snapshot();
        let mut records: Vec<ProcessRecord> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRecord {
                pid: pid.as_u32(),
                name: process.name().to_owned(),
                memory_bytes: process.memory(),
            })
            .collect();
        records.sort_by_key(|record| record.pid);
        Ok(records)
    }

    fn terminate(&self, pid: u32) -> Result<i32, ProcessError> {
        let system = Self::snapshot();
        match system.processes().get(&Pid::from_u32(pid)) {
            Some(process) => Ok(if process.kill() { 0 } else { 1 }),
            None => Err(ProcessError::NotFound { pid }),
        }
    }

    fn spawn(&self, command_line: &str) -> Result<u32, ProcessError> {
        // The line is split into program + arguments and executed directly,
        // never handed to a shell.
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(ProcessError::EmptyCommandLine);
        };
        let child = Command::new(program)
            .args(parts)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| ProcessError::Other {
                message: error.to_string(),
            })?;
        // The child outlives the session; it is not reaped here.
        Ok(child.id())
    }
}
