//! HTTP transport seam.
//!
//! The fetch logic only needs "GET this URL and give me the JSON body", so
//! that is the whole trait. [`HttpTransport`] implements it with `reqwest`;
//! tests substitute an in-memory server.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use snafu::prelude::*;
use url::Url;

/// Errors from the transport layer.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[snafu(display("request to {url} failed: {source}"))]
    Request {
        /// Target URL.
        url: String,
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[snafu(display("{url} returned HTTP {status}: {body}"))]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, decoded as JSON when possible.
        body: Value,
    },

    /// The body was not valid JSON.
    #[snafu(display("invalid JSON from {url}: {source}"))]
    Decode {
        /// Target URL.
        url: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A URL could not be built from the configured base or a server link.
    #[snafu(display("invalid URL '{url}': {source}"))]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Underlying parse error.
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed.
    #[snafu(display("failed to build HTTP client: {source}"))]
    Build {
        /// Underlying HTTP client error.
        source: reqwest::Error,
    },
}

impl TransportError {
    /// HTTP status, if the failure was a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Generic GET-with-JSON-decoding used by the fetcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and decode the body as JSON.
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError>;
}

/// Options for the bundled `reqwest` transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpOptions {
    /// HTTP basic credentials.
    pub username: Option<String>,
    /// Password for `username`.
    pub password: Option<String>,
    /// Accept self-signed or otherwise invalid server certificates.
    pub accept_invalid_certs: bool,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            accept_invalid_certs: false,
            timeout_secs: 60,
        }
    }
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    username: Option<String>,
    password: Option<String>,
}

impl HttpTransport {
    /// Build a transport from `options`.
    pub fn new(options: &HttpOptions) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()
            .context(BuildSnafu)?;

        Ok(Self {
            client,
            username: options.username.clone(),
            password: options.password.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &Url) -> Result<Value, TransportError> {
        debug!("GET {url}");
        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request.send().await.context(RequestSnafu {
            url: url.as_str(),
        })?;
        let status = response.status();
        let bytes = response.bytes().await.context(RequestSnafu {
            url: url.as_str(),
        })?;

        if !status.is_success() {
            let body = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            return StatusSnafu {
                url: url.as_str(),
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        serde_json::from_slice(&bytes).context(DecodeSnafu {
            url: url.as_str(),
        })
    }
}
