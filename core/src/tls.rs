//! Client certificate configuration for the base transport.

use std::fmt;

use ureq::tls::{ClientCert, PemItem, PrivateKey};

use crate::error::ConfigError;

/// A certificate chain and its private key, presented to servers that ask
/// for client authentication.
#[derive(Clone)]
pub struct TlsCertificate {
    cert: ClientCert,
    chain_len: usize,
}

impl TlsCertificate {
    /// Load a chain and key from PEM text. Every `CERTIFICATE` block in
    /// `cert_pem` becomes part of the chain, leaf first.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, ConfigError> {
        let chain = ureq::tls::parse_pem(cert_pem)
            .filter_map(|item| match item {
                Ok(PemItem::Certificate(cert)) => Some(Ok(cert)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::Certificate(Box::new(e)))?;
        if chain.is_empty() {
            return Err(ConfigError::Certificate("no certificate found in PEM input".into()));
        }

        let key = PrivateKey::from_pem(key_pem).map_err(|e| ConfigError::Certificate(Box::new(e)))?;
        Ok(Self {
            cert: ClientCert::new_with_certs(&chain, key),
            chain_len: chain.len(),
        })
    }

    pub fn chain_len(&self) -> usize {
        self.chain_len
    }

    pub(crate) fn to_client_cert(&self) -> ClientCert {
        self.cert.clone()
    }
}

impl fmt::Debug for TlsCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCertificate")
            .field("chain_len", &self.chain_len)
            .field("key", &"<redacted>")
            .finish()
    }
}
