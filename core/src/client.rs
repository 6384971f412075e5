//! HTTP client whose outbound transport can be decorated by middleware.
//!
//! # Design
//! `Client` owns a parsed base URL and a boxed `Transport`. Construction
//! validates the URL, builds the pooled base transport and applies the
//! configured middleware exactly once; nothing touches the network until a
//! request is made. Request building is independent of whatever transport
//! ends up behind the client.

use std::fmt;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::error::{ConfigError, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::tls::TlsCertificate;
use crate::transport::{BoxTransport, Middleware, Transport, TransportOptions, UreqTransport};

/// Value sent in the `User-Agent` header of every request.
pub const USER_AGENT: &str = "testing";

/// Settings consumed by [`Client::new`].
pub struct ClientConfig {
    pub base_url: String,
    pub tls_certificate: Option<TlsCertificate>,
    pub middleware: Option<Middleware>,
    pub max_idle_connections: usize,
    pub max_idle_connections_per_host: usize,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = TransportOptions::default();
        Self {
            base_url: base_url.into(),
            tls_certificate: None,
            middleware: None,
            max_idle_connections: defaults.max_idle_connections,
            max_idle_connections_per_host: defaults.max_idle_connections_per_host,
            timeout: defaults.timeout,
        }
    }

    #[must_use]
    pub fn with_tls_certificate(mut self, certificate: TlsCertificate) -> Self {
        self.tls_certificate = Some(certificate);
        self
    }

    #[must_use]
    pub fn with_middleware<F>(mut self, middleware: F) -> Self
    where
        F: FnOnce(BoxTransport) -> BoxTransport + Send + 'static,
    {
        self.middleware = Some(Box::new(middleware));
        self
    }

    #[must_use]
    pub fn with_max_idle_connections(mut self, total: usize, per_host: usize) -> Self {
        self.max_idle_connections = total;
        self.max_idle_connections_per_host = per_host;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("tls_certificate", &self.tls_certificate)
            .field("middleware", &self.middleware.as_ref().map(|_| "<fn>"))
            .field("max_idle_connections", &self.max_idle_connections)
            .field("max_idle_connections_per_host", &self.max_idle_connections_per_host)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Synchronous HTTP client bound to a single base URL.
///
/// Every call blocks until the transport answers. A `Client` can be shared
/// across threads since transports are `Send + Sync`; swapping the
/// transport needs `&mut self` and so cannot race an in-flight request.
pub struct Client {
    base_url: Url,
    transport: BoxTransport,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| ConfigError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;

        let options = TransportOptions {
            max_idle_connections: config.max_idle_connections,
            max_idle_connections_per_host: config.max_idle_connections_per_host,
            timeout: config.timeout,
            tls_certificate: config.tls_certificate,
        };
        let base: BoxTransport = Box::new(UreqTransport::new(&options));
        let transport = match config.middleware {
            Some(middleware) => middleware(base),
            None => base,
        };

        Ok(Self { base_url, transport })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The transport requests currently go through.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Replace the transport used for subsequent requests.
    pub fn set_transport(&mut self, transport: BoxTransport) {
        self.transport = transport;
    }

    /// GET the base URL.
    pub fn get(&self) -> Result<HttpResponse, RequestError> {
        self.send(HttpMethod::Get, None)
    }

    /// POST `body` to the base URL.
    pub fn post(&self, body: RequestBody) -> Result<HttpResponse, RequestError> {
        self.send(HttpMethod::Post, Some(body))
    }

    pub fn send(&self, method: HttpMethod, body: Option<RequestBody>) -> Result<HttpResponse, RequestError> {
        let request = self.new_request(method, body)?;
        let url = request.url.clone();

        let response = self
            .transport
            .round_trip(request)
            .map_err(|source| RequestError::Send {
                method,
                url: url.clone(),
                source,
            })?;

        info!(
            %method,
            %url,
            status = response.status,
            bytes = response.body.len(),
            "request completed"
        );
        Ok(response)
    }

    fn new_request(&self, method: HttpMethod, body: Option<RequestBody>) -> Result<HttpRequest, RequestError> {
        let mut headers = vec![("User-Agent".to_string(), USER_AGENT.to_string())];

        let body = match body {
            Some(body) => {
                let (content_type, bytes) = body.into_parts();
                if content_type.chars().any(char::is_control) {
                    return Err(RequestError::Build(format!(
                        "invalid content type {content_type:?}"
                    )));
                }
                headers.push(("Content-Type".to_string(), content_type));
                Some(bytes)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url: self.base_url.to_string(),
            headers,
            body,
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
