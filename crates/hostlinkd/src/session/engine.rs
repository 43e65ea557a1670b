//! The per-connection state machine and its command handlers.

use std::io::{BufRead, Write};
use std::path::MAIN_SEPARATOR;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use crate::ports::{
    EntryKind, FileStore, FsError, MessagePort, PeripheralPort, ProcessTable,
};
use crate::state::SharedToggleState;

use super::SESSION_TARGET;
use super::command::{Command, Verb};
use super::errors::SessionError;
use super::framing::{self, CopyError};

/// Everything a session needs beyond its two stream cursors.
///
/// One context is shared by all sessions of a daemon; the toggle state
/// inside it is the only cross-session mutable datum.
pub struct SessionContext {
    /// Filesystem collaborator.
    pub files: Arc<dyn FileStore>,
    /// Process-table collaborator.
    pub processes: Arc<dyn ProcessTable>,
    /// Peripheral-control collaborator.
    pub peripherals: Arc<dyn PeripheralPort>,
    /// Messaging collaborator.
    pub messages: Arc<dyn MessagePort>,
    /// Shared input-block flag.
    pub input_block: SharedToggleState,
    /// Root enumerated by `LIST_DIRS_C`.
    pub browse_root: Utf8PathBuf,
}

/// One accepted connection's command/response exchange.
///
/// The session reads a verb line, looks up its arity, reads that many
/// argument lines, executes the handler, and writes the newline-terminated
/// response, looping until the peer closes or a transport fault occurs.
/// File-transfer verbs temporarily switch the reader into exact-length
/// binary mode; a framing violation there is fatal to the whole session.
pub struct Session<R, W> {
    reader: R,
    writer: W,
    ctx: Arc<SessionContext>,
}

impl<R: BufRead, W: Write> Session<R, W> {
    /// Creates a session over a buffered reader/writer pair.
    pub fn new(reader: R, writer: W, ctx: Arc<SessionContext>) -> Self {
        Self {
            reader,
            writer,
            ctx,
        }
    }

    /// Runs the command loop to completion.
    ///
    /// Returns `Ok(())` when the peer closes the stream between commands.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] on any transport fault or framing
    /// violation; the connection is unusable afterwards.
    pub fn run(&mut self) -> Result<(), SessionError> {
        while let Some(line) = framing::read_line(&mut self.reader)? {
            let Some(verb) = Verb::parse(&line) else {
                debug!(target: SESSION_TARGET, verb = %line, "unknown command");
                self.respond("UNKNOWN_COMMAND")?;
                continue;
            };
            let mut args = Vec::with_capacity(verb.arity());
            for _ in 0..verb.arity() {
                match framing::read_line(&mut self.reader)? {
                    Some(arg) => args.push(arg),
                    None => {
                        return Err(SessionError::TruncatedCommand {
                            verb: verb.token(),
                        });
                    }
                }
            }
            match Command::assemble(verb, args) {
                Ok(command) => self.execute(command)?,
                Err(error) => self.respond(&format!("ERROR:{error}"))?,
            }
        }
        Ok(())
    }

    fn execute(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::ListDirs => self.list_dirs(),
            Command::ListFiles { path } => self.list_files(&path),
            Command::DeleteFile { path } => self.delete_file(&path),
            Command::Rename { from, to } => self.rename(&from, &to),
            Command::GetFile { path } => self.get_file(&path),
            Command::PutFile { path } => self.put_file(&path),
            Command::ListProcesses => self.list_processes(),
            Command::KillProcess { pid } => self.kill_process(&pid),
            Command::StartProcess { command_line } => self.start_process(&command_line),
            Command::ToggleInput => self.toggle_input(),
            Command::ToggleMonitor { power_off } => self.toggle_monitor(&power_off),
            Command::ShowMessage { text } => self.show_message(&text),
        }
    }

    /// Writes one newline-terminated response line and flushes it.
    fn respond(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn list_dirs(&mut self) -> Result<(), SessionError> {
        let entries = match self.ctx.files.list(self.ctx.browse_root.as_str()) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    target: SESSION_TARGET,
                    root = %self.ctx.browse_root,
                    %error,
                    "browse root listing failed"
                );
                Vec::new()
            }
        };
        let names: Vec<String> = entries
            .iter()
            .filter(|entry| entry.kind == EntryKind::Directory)
            .map(|entry| format!("{}{}", entry.name, MAIN_SEPARATOR))
            .collect();
        self.respond(&format!("DIRS:{}", names.join(";")))
    }

    fn list_files(&mut self, path: &str) -> Result<(), SessionError> {
        match self.ctx.files.probe(path) {
            Ok(Some(EntryKind::Directory)) => match self.ctx.files.list(path) {
                Ok(entries) => {
                    let formatted: Vec<String> = entries
                        .iter()
                        .map(|entry| match entry.kind {
                            EntryKind::Directory => {
                                format!("{}{};0", entry.name, MAIN_SEPARATOR)
                            }
                            EntryKind::File => format!("{};{}", entry.name, entry.len),
                        })
                        .collect();
                    self.respond(&format!("FILES:{}", formatted.join("|")))
                }
                Err(error) => self.respond(&format!("ERROR:{error}")),
            },
            Ok(_) | Err(_) => self.respond("ERROR:Invalid directory"),
        }
    }

    fn delete_file(&mut self, path: &str) -> Result<(), SessionError> {
        match self.ctx.files.probe(path) {
            Ok(Some(EntryKind::File)) => match self.ctx.files.delete_file(path) {
                Ok(()) => self.respond("DELETE_SUCCESS"),
                Err(FsError::PermissionDenied { .. }) => self.respond("DELETE_DENIED"),
                Err(_) => self.respond("DELETE_FAILED"),
            },
            // Directories and missing paths are never deleted.
            Ok(_) => self.respond("DELETE_INVALID"),
            Err(FsError::PermissionDenied { .. }) => self.respond("DELETE_DENIED"),
            Err(_) => self.respond("DELETE_INVALID"),
        }
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), SessionError> {
        match self.ctx.files.probe(from) {
            Ok(Some(_)) => match self.ctx.files.rename(from, to) {
                Ok(()) => self.respond("RENAME_SUCCESS"),
                Err(FsError::PermissionDenied { .. }) => self.respond("RENAME_DENIED"),
                Err(_) => self.respond("RENAME_FAILED"),
            },
            Ok(None) => self.respond("RENAME_NOT_FOUND"),
            Err(FsError::PermissionDenied { .. }) => self.respond("RENAME_DENIED"),
            Err(_) => self.respond("RENAME_FAILED"),
        }
    }

    fn get_file(&mut self, path: &str) -> Result<(), SessionError> {
        let (mut source, length) = match self.ctx.files.open_read(path) {
            Ok(pair) => pair,
            Err(FsError::PermissionDenied { .. }) => return self.respond("FILE_ACCESS_DENIED"),
            Err(error) => {
                debug!(target: SESSION_TARGET, path, %error, "file unavailable");
                return self.respond("FILE_NOT_FOUND");
            }
        };
        self.respond(&format!("FILE_START:{length}"))?;
        // The length is on the wire now; any shortfall from the source
        // would desynchronize the peer, so source faults are fatal.
        match framing::copy_exact(&mut *source, &mut self.writer, length) {
            Ok(_) => self.respond("FILE_END"),
            Err(CopyError::ShortSource {
                expected,
                remaining,
            }) => Err(SessionError::FrameUnderrun {
                expected,
                remaining,
            }),
            Err(CopyError::Read(source)) => Err(SessionError::FrameSource {
                expected: length,
                source,
            }),
            Err(CopyError::Write { source, .. }) => Err(SessionError::Transport(source)),
        }
    }

    fn put_file(&mut self, path: &str) -> Result<(), SessionError> {
        if let Err(error) = self.ctx.files.ensure_parent(path) {
            return self.respond(match error {
                FsError::PermissionDenied { .. } => "ACCESS_DENIED",
                _ => "PATH_INVALID",
            });
        }
        let mut sink = match self.ctx.files.create_write(path) {
            Ok(sink) => sink,
            Err(FsError::PermissionDenied { .. }) => return self.respond("ACCESS_DENIED"),
            Err(error) => return self.respond(&format!("ERROR:{error}")),
        };
        self.respond("READY_FOR_DATA")?;
        let Some(size_line) = framing::read_line(&mut self.reader)? else {
            return Err(SessionError::TruncatedCommand {
                verb: Verb::PutFile.token(),
            });
        };
        let expected: u64 = match size_line.trim().parse() {
            Ok(size) => size,
            Err(_) => return self.respond("ERROR:Invalid file size"),
        };
        match framing::copy_exact(&mut self.reader, &mut *sink, expected) {
            Ok(written) => {
                if let Err(error) = sink.flush() {
                    return self.respond(&format!("ERROR:Failed to receive file: {error}"));
                }
                self.respond(&format!("FILE_RECEIVED:{written}"))
            }
            Err(CopyError::Write { consumed, source }) => {
                // The peer keeps sending the announced payload; drain it so
                // the stream stays framed, then report the local failure.
                framing::drain(&mut self.reader, expected - consumed)
                    .map_err(SessionError::Transport)?;
                self.respond(&format!("ERROR:Failed to receive file: {source}"))
            }
            Err(CopyError::ShortSource {
                expected,
                remaining,
            }) => Err(SessionError::FrameUnderrun {
                expected,
                remaining,
            }),
            Err(CopyError::Read(source)) => Err(SessionError::Transport(source)),
        }
    }

    fn list_processes(&mut self) -> Result<(), SessionError> {
        match self.ctx.processes.list() {
            Ok(records) => {
                let formatted: Vec<String> = records
                    .iter()
                    .map(|record| {
                        format!("{}|{}|{}", record.pid, record.name, record.memory_bytes)
                    })
                    .collect();
                self.respond(&format!("PROCESSES:{}", formatted.join(";")))
            }
            Err(error) => self.respond(&format!("ERROR:{error}")),
        }
    }

    fn kill_process(&mut self, pid: &str) -> Result<(), SessionError> {
        let pid: u32 = match pid.trim().parse() {
            Ok(pid) => pid,
            Err(_) => return self.respond(&format!("ERROR:invalid pid: {pid}")),
        };
        match self.ctx.processes.terminate(pid) {
            Ok(0) => self.respond("PROCESS_KILLED"),
            Ok(code) => self.respond(&format!("KILL_FAILED:{code}")),
            Err(error) => self.respond(&format!("ERROR:{error}")),
        }
    }

    fn start_process(&mut self, command_line: &str) -> Result<(), SessionError> {
        match self.ctx.processes.spawn(command_line) {
            Ok(pid) => self.respond(&format!("PROCESS_STARTED:{pid}")),
            Err(error) => self.respond(&format!("ERROR:{error}")),
        }
    }

    fn toggle_input(&mut self) -> Result<(), SessionError> {
        let blocked = self.ctx.input_block.toggle();
        match self.ctx.peripherals.set_input_blocked(blocked) {
            Ok(()) => self.respond(if blocked {
                "MOUSE_KEYBOARD_BLOCKED"
            } else {
                "MOUSE_KEYBOARD_UNBLOCKED"
            }),
            Err(error) => {
                // The backend refused; put the flag back.
                self.ctx.input_block.toggle();
                self.respond(&format!("ERROR:{error}"))
            }
        }
    }

    fn toggle_monitor(&mut self, power_off: &str) -> Result<(), SessionError> {
        let power_off: bool = match power_off.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                return self.respond(&format!("ERROR:invalid monitor state: {power_off}"));
            }
        };
        self.ctx.peripherals.set_monitor_power(!power_off);
        self.respond(if power_off { "MONITOR_OFF" } else { "MONITOR_ON" })
    }

    fn show_message(&mut self, text: &str) -> Result<(), SessionError> {
        match self.ctx.messages.show_message(text) {
            Ok(()) => self.respond("MESSAGE_SHOWN"),
            Err(error) => self.respond(&format!("ERROR:{error}")),
        }
    }
}
