//! Error types for the request helpers.
//!
//! # Design
//! Two families live in one enum. Usage errors (`NotExecuted`,
//! `AlreadyExecuted`) are programming mistakes and are always returned to the
//! caller. Transport errors describe one failed request; the public helpers
//! absorb them into a missing result instead of returning them.

use thiserror::Error;

/// Errors produced while building or executing requests.
#[derive(Debug, Error)]
pub enum Error {
    /// `info()` or `http_code()` was called before `exec()`.
    #[error("transfer metadata requested before exec() was called")]
    NotExecuted,

    /// `exec()` was called a second time on the same transfer.
    #[error("transfer has already been executed")]
    AlreadyExecuted,

    /// A header line did not have the `Name: value` shape, or a header name
    /// or value is not valid on the wire.
    #[error("invalid header: {0:?}")]
    InvalidHeader(String),

    /// A field body could not be serialized for the declared content type.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// DNS, connect, TLS, timeout or protocol failure for a single request.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The multiplexing runtime could not be started.
    #[error("failed to start the request runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn transport(url: &str, message: impl Into<String>) -> Self {
        Error::Transport {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// True for failures of the network round-trip itself, as opposed to
    /// misuse of the API.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. } | Error::Runtime(_))
    }
}
