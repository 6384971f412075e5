//! Error types for the courier client.
//!
//! # Design
//! Configuration problems surface from `Client::new` as `ConfigError` and
//! never later. Everything that goes wrong while a request is in flight is a
//! `RequestError`, which always keeps the transport's cause as its source.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpMethod;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned while building a `Client` from a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL did not parse as an absolute URL.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The TLS certificate or private key could not be loaded.
    #[error("invalid TLS certificate: {0}")]
    Certificate(#[source] BoxError),
}

/// Errors returned by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, connection, TLS handshake, timeout or protocol failure.
    #[error("network error: {0}")]
    Network(#[source] BoxError),

    /// A replaying recorder had no unused interaction matching the request.
    #[error("no recorded interaction matches {method} {url}")]
    NoMatchingInteraction { method: HttpMethod, url: String },
}

/// Errors returned by `Client` request methods.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be constructed.
    #[error("error constructing request: {0}")]
    Build(String),

    /// The transport failed to deliver the request or read the response.
    #[error("error sending {method} {url}: {source}")]
    Send {
        method: HttpMethod,
        url: String,
        #[source]
        source: TransportError,
    },
}

/// Errors returned while loading or persisting a cassette.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("cassette {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed cassette {path}: {source}")]
    Cassette {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Replay-only mode was requested but the cassette does not exist.
    #[error("cassette {0} not found")]
    MissingCassette(PathBuf),
}
