//! Faults that terminate a session.
//!
//! Domain failures (bad paths, refused operations) are reported on the
//! wire and never surface here; everything in this enum desynchronizes or
//! severs the stream and is therefore fatal to the whole session.

use std::io;

use thiserror::Error;

/// Session-fatal faults.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection itself failed (including read/write timeouts).
    #[error("connection fault: {0}")]
    Transport(#[from] io::Error),

    /// A text line exceeded the protocol's line budget.
    #[error("command line exceeds {max} bytes")]
    LineTooLong {
        /// Maximum permitted line length.
        max: usize,
    },

    /// The peer closed the stream between a verb and its declared arguments.
    #[error("peer closed the stream mid-command ({verb})")]
    TruncatedCommand {
        /// Verb whose arguments were cut short.
        verb: &'static str,
    },

    /// A binary frame ended before the announced byte count was transferred.
    #[error("file frame ended {remaining} bytes short of the announced {expected}")]
    FrameUnderrun {
        /// Announced frame length.
        expected: u64,
        /// Bytes still owed when the stream ended.
        remaining: u64,
    },

    /// A frame source failed after its length was already announced.
    #[error("file frame source failed after announcing {expected} bytes: {source}")]
    FrameSource {
        /// Announced frame length.
        expected: u64,
        /// Underlying read failure.
        #[source]
        source: io::Error,
    },
}
