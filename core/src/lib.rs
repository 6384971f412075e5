//! Blocking HTTP client with a pluggable, decoratable transport.
//!
//! # Overview
//! A [`Client`] is built from a [`ClientConfig`]: a base URL, an optional
//! TLS client certificate and optional [`Middleware`]. The client builds a
//! pooled ureq transport, lets the middleware wrap it once, and sends every
//! request through the result.
//!
//! # Design
//! - Request building knows nothing about the transport behind it.
//! - Middleware owns the transport it wraps, so the chain is linear and is
//!   applied exactly once at construction.
//! - [`Client::set_transport`] swaps the transport after construction; tests
//!   use it to splice in a [`Recorder`].
//! - Requests and responses are plain owned data so the recorder can write
//!   them to cassettes.

pub mod client;
pub mod error;
pub mod http;
pub mod recorder;
pub mod tls;
pub mod transport;

pub use client::{Client, ClientConfig, USER_AGENT};
pub use error::{ConfigError, RecorderError, RequestError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use recorder::{Cassette, Interaction, Mode, Recorder, RecorderOptions};
pub use tls::TlsCertificate;
pub use transport::{transport_fn, BoxTransport, Middleware, Transport, TransportOptions, UreqTransport};
