//! Pluggable transports.
//!
//! # Design
//! A `Transport` has one capability: turn an `HttpRequest` into an
//! `HttpResponse`. The client never knows what sits behind it. Middleware
//! is a boxed `FnOnce` that takes ownership of the current transport and
//! returns its replacement, so decorating forms a single linear chain and
//! the closure cannot run twice.
//!
//! `UreqTransport` is the base transport: a pooled `ureq::Agent` that hands
//! every status code back as data (`http_status_as_error(false)`).

use std::time::Duration;

use ureq::tls::TlsConfig;
use ureq::Agent;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::tls::TlsCertificate;

/// Sends an HTTP request and returns the response.
pub trait Transport: Send + Sync {
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

pub type BoxTransport = Box<dyn Transport>;

/// Wraps a transport with additional behavior while preserving its interface.
pub type Middleware = Box<dyn FnOnce(BoxTransport) -> BoxTransport + Send>;

/// Adapts a closure into a `Transport`.
pub struct FnTransport<F>(F);

/// Use a closure as a transport. Handy for stubbing the network in tests.
pub fn transport_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    FnTransport(f)
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (self.0)(request)
    }
}

/// Knobs for the base transport's connection pool and TLS.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    /// Applies to the whole call. `None` leaves the request unbounded.
    pub timeout: Option<Duration>,
    pub tls_certificate: Option<TlsCertificate>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            max_idle_connections: 100,
            max_idle_connections_per_host: 10,
            timeout: None,
            tls_certificate: None,
        }
    }
}

/// Base transport backed by a pooled `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(options: &TransportOptions) -> Self {
        let tls_config = TlsConfig::builder()
            .client_cert(options.tls_certificate.as_ref().map(TlsCertificate::to_client_cert))
            .build();

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(options.max_idle_connections)
            .max_idle_connections_per_host(options.max_idle_connections_per_host)
            .timeout_global(options.timeout)
            .tls_config(tls_config)
            .build()
            .new_agent();

        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportOptions::default())
    }
}

impl Transport for UreqTransport {
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = match request.body {
            Some(body) => self.agent.run(builder.body(body).map_err(network)?),
            None => self.agent.run(builder.body(()).map_err(network)?),
        }
        .map_err(network)?;

        let (parts, mut body) = response.into_parts();
        let headers = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        Ok(HttpResponse {
            status: parts.status.as_u16(),
            headers,
            body: body.read_to_vec().map_err(network)?,
        })
    }
}

fn network<E>(err: E) -> TransportError
where
    E: std::error::Error + Send + Sync + 'static,
{
    TransportError::Network(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn fn_transport_delegates_to_closure() {
        let transport = transport_fn(|req: HttpRequest| {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: req.url.into_bytes(),
            })
        });
        let resp = transport.round_trip(request("http://stub/")).unwrap();
        assert_eq!(resp.body, b"http://stub/");
    }

    #[test]
    fn middleware_takes_ownership_of_inner_transport() {
        struct Tagging(BoxTransport);

        impl Transport for Tagging {
            fn round_trip(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
                request.headers.push(("x-tag".to_string(), "wrapped".to_string()));
                self.0.round_trip(request)
            }
        }

        let inner: BoxTransport = Box::new(transport_fn(|req: HttpRequest| {
            Ok(HttpResponse {
                status: 200,
                headers: req.headers,
                body: Vec::new(),
            })
        }));
        let middleware: Middleware = Box::new(|t| Box::new(Tagging(t)) as BoxTransport);
        let wrapped = middleware(inner);

        let resp = wrapped.round_trip(request("http://stub/")).unwrap();
        assert_eq!(resp.header("x-tag"), Some("wrapped"));
    }

    #[test]
    fn default_options_bound_idle_pool() {
        let options = TransportOptions::default();
        assert_eq!(options.max_idle_connections, 100);
        assert_eq!(options.max_idle_connections_per_host, 10);
        assert!(options.timeout.is_none());
        assert!(options.tls_certificate.is_none());
    }

    #[test]
    fn connection_refused_is_network_error() {
        // Port 1 on loopback is reserved and never listening in test environments.
        let err = UreqTransport::default()
            .round_trip(request("http://127.0.0.1:1/"))
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
