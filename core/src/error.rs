//! Error types for the book search core.
//!
//! # Design
//! Every failure the host can observe degrades to an empty-state message, so
//! these variants exist for logging and for the FFI error codes rather than
//! for recovery. `EmptyQuery` is the "do nothing" signal: a blank search
//! term never reaches the URL builder's output.

use thiserror::Error;

/// Errors produced while building requests, fetching, or parsing responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The query text was empty or whitespace only.
    #[error("search query is empty")]
    EmptyQuery,

    /// The configured endpoint cannot be used as a request URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The server answered with a status other than 200.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (DNS, connect, timeout, I/O).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A configuration file could not be read or decoded.
    #[error("invalid configuration: {0}")]
    Config(String),
}
