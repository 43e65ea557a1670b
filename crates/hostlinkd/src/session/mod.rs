//! Per-connection command protocol engine.
//!
//! A session owns one accepted connection and interleaves newline-delimited
//! text commands with raw, length-prefixed binary payloads on the same byte
//! stream. The verb line selects an operation and a fixed argument arity
//! from the command table; file-transfer verbs additionally switch the
//! stream into an exact-byte-count binary sub-state. There is no message
//! envelope: framing integrity depends on every command reading exactly
//! what its table entry declares.

mod command;
mod engine;
#[cfg(test)]
mod engine_tests;
mod errors;
mod framing;

pub use self::command::{ArityMismatch, Command, Verb};
pub use self::engine::{Session, SessionContext};
pub use self::errors::SessionError;

pub(crate) const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
