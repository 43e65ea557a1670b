//! Declarative command table: verb tokens, arities, and the parsed command.

use thiserror::Error;

/// Operation selector sent as the first line of every command.
///
/// Each verb carries a fixed argument arity known statically; the protocol
/// has no generic length or arity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Enumerate the immediate subdirectories of the browse root.
    ListDirs,
    /// List the entries of a directory.
    ListFiles,
    /// Delete a regular file.
    DeleteFile,
    /// Rename a filesystem entry.
    Rename,
    /// Stream a file to the client.
    GetFile,
    /// Receive a file from the client.
    PutFile,
    /// Enumerate running processes.
    ListProcesses,
    /// Terminate a process by pid.
    KillProcess,
    /// Launch a command line without waiting.
    StartProcess,
    /// Flip the shared input-block flag.
    ToggleInput,
    /// Switch the monitor on or off.
    ToggleMonitor,
    /// Display a message on the host.
    ShowMessage,
}

impl Verb {
    /// Wire token to verb, in protocol order.
    pub const TABLE: &'static [(&'static str, Self)] = &[
        ("LIST_DIRS_C", Self::ListDirs),
        ("LIST_FILES", Self::ListFiles),
        ("DELETE_FILE", Self::DeleteFile),
        ("RENAME", Self::Rename),
        ("GET_FILE", Self::GetFile),
        ("PUT_FILE", Self::PutFile),
        ("LIST_PROCESSES", Self::ListProcesses),
        ("KILL_PROCESS", Self::KillProcess),
        ("START_PROCESS", Self::StartProcess),
        ("TOGGLE_MOUSE_KEYBOARD", Self::ToggleInput),
        ("TOGGLE_MONITOR", Self::ToggleMonitor),
        ("SHOW_MESSAGE", Self::ShowMessage),
    ];

    /// Resolves a verb from its exact wire token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(candidate, _)| *candidate == token)
            .map(|(_, verb)| *verb)
    }

    /// Wire token for this verb.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::ListDirs => "LIST_DIRS_C",
            Self::ListFiles => "LIST_FILES",
            Self::DeleteFile => "DELETE_FILE",
            Self::Rename => "RENAME",
            Self::GetFile => "GET_FILE",
            Self::PutFile => "PUT_FILE",
            Self::ListProcesses => "LIST_PROCESSES",
            Self::KillProcess => "KILL_PROCESS",
            Self::StartProcess => "START_PROCESS",
            Self::ToggleInput => "TOGGLE_MOUSE_KEYBOARD",
            Self::ToggleMonitor => "TOGGLE_MONITOR",
            Self::ShowMessage => "SHOW_MESSAGE",
        }
    }

    /// Number of argument lines that follow the verb line.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::ListDirs | Self::ListProcesses | Self::ToggleInput => 0,
            Self::ListFiles
            | Self::DeleteFile
            | Self::GetFile
            | Self::PutFile
            | Self::KillProcess
            | Self::StartProcess
            | Self::ToggleMonitor
            | Self::ShowMessage => 1,
            Self::Rename => 2,
        }
    }
}

/// A fully read command: verb plus its declared argument lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `LIST_DIRS_C`
    ListDirs,
    /// `LIST_FILES <path>`
    ListFiles {
        /// Directory to list.
        path: String,
    },
    /// `DELETE_FILE <path>`
    DeleteFile {
        /// File to delete.
        path: String,
    },
    /// `RENAME <from> <to>`
    Rename {
        /// Existing path.
        from: String,
        /// New path.
        to: String,
    },
    /// `GET_FILE <path>`
    GetFile {
        /// File to stream out.
        path: String,
    },
    /// `PUT_FILE <path>`
    PutFile {
        /// Destination path.
        path: String,
    },
    /// `LIST_PROCESSES`
    ListProcesses,
    /// `KILL_PROCESS <pid>`
    KillProcess {
        /// Pid argument as received.
        pid: String,
    },
    /// `START_PROCESS <command line>`
    StartProcess {
        /// Raw command line.
        command_line: String,
    },
    /// `TOGGLE_MOUSE_KEYBOARD`
    ToggleInput,
    /// `TOGGLE_MONITOR <"true"|"false">` — "true" powers the monitor off.
    ToggleMonitor {
        /// Power-off argument as received.
        power_off: String,
    },
    /// `SHOW_MESSAGE <text>`
    ShowMessage {
        /// Message text.
        text: String,
    },
}

/// Argument count did not match the verb's declared arity.
#[derive(Debug, Error)]
#[error("verb {verb} expects {expected} argument(s), got {actual}")]
pub struct ArityMismatch {
    /// Verb token.
    pub verb: &'static str,
    /// Declared arity.
    pub expected: usize,
    /// Arguments supplied.
    pub actual: usize,
}

impl Command {
    /// Builds a command from a verb and its argument lines.
    ///
    /// # Errors
    ///
    /// Returns [`ArityMismatch`] if the argument count differs from the
    /// verb's declared arity.
    pub fn assemble(verb: Verb, args: Vec<String>) -> Result<Self, ArityMismatch> {
        if args.len() != verb.arity() {
            return Err(ArityMismatch {
                verb: verb.token(),
                expected: verb.arity(),
                actual: args.len(),
            });
        }
        let mut args = args.into_iter();
        let mut next = move || args.next().unwrap_or_default();
        Ok(match verb {
            Verb::ListDirs => Self::ListDirs,
            Verb::ListFiles => Self::ListFiles { path: next() },
            Verb::DeleteFile => Self::DeleteFile { path: next() },
            Verb::Rename => Self::Rename {
                from: next(),
                to: next(),
            },
            Verb::GetFile => Self::GetFile { path: next() },
            Verb::PutFile => Self::PutFile { path: next() },
            Verb::ListProcesses => Self::ListProcesses,
            Verb::KillProcess => Self::KillProcess { pid: next() },
            Verb::StartProcess => Self::StartProcess {
                command_line: next(),
            },
            Verb::ToggleInput => Self::ToggleInput,
            Verb::ToggleMonitor => Self::ToggleMonitor { power_off: next() },
            Verb::ShowMessage => Self::ShowMessage { text: next() },
        })
    }
}
