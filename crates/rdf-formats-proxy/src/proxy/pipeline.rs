//! The per-request pipeline: negotiate, fetch, route, transcode, send
//!
//! Each stage returns a value consumed by the next one. Negotiation errors
//! are answered immediately; every later failure is caught once in
//! [`FormatsProxy::handle`] and rendered as a 502.

use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::formats::FormatRegistry;

use super::fetch::Fetcher;
use super::negotiation::Negotiation;
use super::response::{ProxyError, TranscodeOutcome, send};
use super::router::{RouteDecision, route};
use super::transcode::transcode;

/// Default media type assumed when the client sends no `Accept` header
pub const DEFAULT_ACCEPT: &str = "text/n3";

/// The parts of an inbound request the pipeline looks at
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Value of the `uri` query parameter
    pub uri: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Shared, read-only proxy state: the format registry and the fetcher
#[derive(Clone)]
pub struct FormatsProxy {
    registry: Arc<dyn FormatRegistry>,
    fetcher: Arc<dyn Fetcher>,
    default_accept: String,
}

impl FormatsProxy {
    pub fn new(registry: Arc<dyn FormatRegistry>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            registry,
            fetcher,
            default_accept: DEFAULT_ACCEPT.to_string(),
        }
    }

    pub fn with_default_accept(mut self, default_accept: impl Into<String>) -> Self {
        self.default_accept = default_accept.into();
        self
    }

    /// Answer one proxied request
    pub async fn handle(&self, request: ProxyRequest) -> Response {
        let has_body = !request.body.is_empty();
        let negotiation = match Negotiation::negotiate(
            request.uri.as_deref(),
            &request.headers,
            has_body,
            self.registry.as_ref(),
            &self.default_accept,
        ) {
            Ok(negotiation) => negotiation,
            Err(e) => {
                tracing::warn!(error_message = %e, "Rejected proxy request");
                return e.into_response();
            }
        };

        let body = has_body.then_some(request.body);
        match self.run(&negotiation, request.method, body).await {
            Ok((status, outcome)) => send(status, outcome),
            Err(e) => {
                if let ProxyError::UpstreamFailure(payload) = &e {
                    tracing::error!(
                        target_uri = %negotiation.target,
                        error_name = %payload.name,
                        error_message = %payload.message,
                        "Proxy request failed"
                    );
                }
                e.into_response()
            }
        }
    }

    async fn run(
        &self,
        negotiation: &Negotiation,
        method: Method,
        body: Option<Bytes>,
    ) -> Result<(StatusCode, TranscodeOutcome), ProxyError> {
        let request = negotiation.fetch_request(method, body);
        let response = self.fetcher.fetch(&negotiation.target, request).await?;

        let status = response.status;
        let content_type = response.content_type();
        let decision = route(
            status,
            content_type.as_ref(),
            negotiation,
            self.registry.as_ref(),
        );

        let outcome = match decision {
            RouteDecision::PassThrough => {
                let content_type = response.raw_content_type().cloned();
                let body = response.into_bytes().await?;
                TranscodeOutcome::PassThrough { content_type, body }
            }
            RouteDecision::Transcode(selection) => {
                let quads = response.into_quads(self.registry.as_ref(), &negotiation.target)?;
                let body = transcode(quads, selection.serializer.as_ref()).await?;
                TranscodeOutcome::Serialized {
                    media_type: selection.media_type,
                    body,
                }
            }
        };
        Ok((status, outcome))
    }
}

impl std::fmt::Debug for FormatsProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatsProxy")
            .field("parsers", self.registry.parser_types())
            .field("serializers", self.registry.serializer_types())
            .field("default_accept", &self.default_accept)
            .finish_non_exhaustive()
    }
}
