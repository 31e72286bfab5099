//! Error Types
//!
//! Failures raised while talking to a store.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The store answered with a RESP error reply
    #[error("Server error: {0}")]
    Server(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("Endpoint {addr} unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply {
        command: &'static str,
        reply: String,
    },
}

impl Error {
    /// Whether the stream this came from may be out of step with the store.
    ///
    /// Error and unexpected replies were read in full, so the stream is
    /// still usable after them.
    pub fn breaks_connection(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Protocol(_) | Error::ConnectionClosed | Error::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
