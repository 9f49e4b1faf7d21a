//! Outbound fetch of the target resource

use std::error::Error as StdError;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use thiserror::Error;
use url::Url;

use crate::error::{FormatsProxyError, Result};
use crate::formats::{ByteStream, FormatError, FormatRegistry, ParseOptions, QuadStream};
use crate::media_type::MediaType;

use super::response::{ErrorPayload, ProxyError};

/// Method, headers and optional body of an outbound request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// An origin response whose body has not been consumed yet
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl FetchResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ByteStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The declared content type, normalized. `None` when absent or unreadable.
    pub fn content_type(&self) -> Option<MediaType> {
        self.raw_content_type()
            .and_then(|v| v.to_str().ok())
            .and_then(MediaType::parse)
    }

    /// The declared `Content-Type` header exactly as the origin sent it
    pub fn raw_content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(header::CONTENT_TYPE)
    }

    /// Buffer the body as raw bytes
    pub async fn into_bytes(self) -> std::result::Result<Bytes, FormatError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        Ok(chunks.concat().into())
    }

    /// Expose the body as statements, parsed by the registry's parser for the
    /// declared content type. `base_iri` resolves relative references.
    pub fn into_quads(
        self,
        registry: &dyn FormatRegistry,
        base_iri: &str,
    ) -> std::result::Result<QuadStream, FormatError> {
        let media_type = self
            .content_type()
            .ok_or_else(|| FormatError::UnsupportedMediaType("an undeclared content type".to_string()))?;
        let parser = registry
            .find_parser(&media_type)
            .ok_or_else(|| FormatError::UnsupportedMediaType(media_type.to_string()))?;

        let options = ParseOptions {
            base_iri: Some(base_iri.to_string()),
        };
        Ok(parser.import(self.body, options))
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Failures before an origin response was received
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Only absolute URLs are supported")]
    RelativeUrl,

    #[error("Only HTTP(S) protocols are supported")]
    UnsupportedScheme,

    #[error("network timeout at: {uri}")]
    Timeout { uri: String },

    #[error("request to {uri} failed, reason: {reason}")]
    Network {
        uri: String,
        reason: String,
        code: Option<&'static str>,
    },
}

impl FetchError {
    pub fn payload(&self) -> ErrorPayload {
        let message = self.to_string();
        match self {
            FetchError::RelativeUrl | FetchError::UnsupportedScheme => {
                ErrorPayload::new("TypeError", message)
            }
            FetchError::Timeout { .. } => {
                ErrorPayload::new("FetchError", message).with_kind("request-timeout")
            }
            FetchError::Network { code, .. } => {
                let payload = ErrorPayload::new("FetchError", message).with_kind("system");
                match code {
                    Some(code) => payload.with_code(*code),
                    None => payload,
                }
            }
        }
    }

    /// Classify a reqwest failure, looking through its source chain for the
    /// I/O error that caused it.
    fn from_reqwest(uri: &str, url: &Url, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return FetchError::Timeout {
                uri: uri.to_string(),
            };
        }

        let code = error_code(&error);
        let reason = match code {
            Some(code) if error.is_connect() => match (url.host_str(), url.port_or_known_default()) {
                (Some(host), Some(port)) => format!("connect {code} {host}:{port}"),
                _ => format!("connect {code}"),
            },
            _ => root_cause(&error),
        };

        FetchError::Network {
            uri: uri.to_string(),
            reason,
            code,
        }
    }
}

impl From<FetchError> for ProxyError {
    fn from(error: FetchError) -> Self {
        ProxyError::UpstreamFailure(error.payload())
    }
}

/// Performs outbound requests on behalf of the proxy
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        uri: &str,
        request: FetchRequest,
    ) -> std::result::Result<FetchResponse, FetchError>;
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher. `None` leaves outbound requests unbounded in time.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FormatsProxyError::Server(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        uri: &str,
        request: FetchRequest,
    ) -> std::result::Result<FetchResponse, FetchError> {
        let url = parse_target(uri)?;
        tracing::debug!(method = %request.method, %url, "Fetching");

        let mut builder = self
            .client
            .request(request.method, url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(uri, &url, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        tracing::debug!(status = status.as_u16(), "Origin responded");

        let body = response
            .bytes_stream()
            .map_err(|e| FormatError::Read(e.to_string()))
            .boxed();
        Ok(FetchResponse::new(status, headers, body))
    }
}

/// Accept only absolute http(s) URLs
pub fn parse_target(uri: &str) -> std::result::Result<Url, FetchError> {
    let url = Url::parse(uri).map_err(|_| FetchError::RelativeUrl)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(FetchError::UnsupportedScheme),
    }
}

fn error_code(error: &reqwest::Error) -> Option<&'static str> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            if let Some(code) = io_error_code(io_error) {
                return Some(code);
            }
        }
        let text = cause.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return Some("ENOTFOUND");
        }
        source = cause.source();
    }
    None
}

fn io_error_code(error: &io::Error) -> Option<&'static str> {
    let code = match error.kind() {
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::NotConnected => "ENOTCONN",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::HostUnreachable => "EHOSTUNREACH",
        io::ErrorKind::NetworkUnreachable => "ENETUNREACH",
        _ => return None,
    };
    Some(code)
}

/// Message of the innermost error in the chain
fn root_cause(error: &(dyn StdError + 'static)) -> String {
    let mut current = error;
    while let Some(next) = current.source() {
        current = next;
    }
    current.to_string()
}
