//! Content negotiation for one proxied request
//!
//! A [`Negotiation`] is computed from the inbound headers and the registry's
//! capabilities before anything is fetched, and is never modified afterwards.

use axum::http::{HeaderMap, HeaderValue, Method, header};
use bytes::Bytes;

use crate::formats::FormatRegistry;
use crate::media_type::{MediaType, MediaTypeList};

use super::fetch::FetchRequest;
use super::response::ProxyError;

/// Body of the 400 response when the target URI is missing
pub const MISSING_URI_MESSAGE: &str =
    "'uri' query parameter missing. Use ?uri=http://requested.example.com/file.rdf";

#[derive(Debug, Clone, PartialEq)]
pub struct Negotiation {
    /// The URI to fetch, as supplied by the client
    pub target: String,
    /// Media types the client accepts, most preferred first
    pub client_accepts: MediaTypeList,
    /// Media type of the inbound body, if one was sent
    pub client_produces: Option<MediaType>,
    /// Inbound `Content-Type`, forwarded verbatim with the body
    pub request_content_type: Option<HeaderValue>,
    /// Outbound `Accept`: everything we can parse, then what the client accepts
    pub fetch_accept: String,
    /// Client-accepted types with a registered serializer, in client order
    pub usable_serializers: MediaTypeList,
}

impl Negotiation {
    /// Negotiate a request.
    ///
    /// A missing or empty `uri` fails with [`ProxyError::BadRequest`] before
    /// any header is looked at. Without a usable `Accept` header the client is
    /// assumed to accept only `default_accept`.
    pub fn negotiate(
        uri: Option<&str>,
        headers: &HeaderMap,
        has_body: bool,
        registry: &dyn FormatRegistry,
        default_accept: &str,
    ) -> Result<Self, ProxyError> {
        let target = match uri {
            Some(uri) if !uri.is_empty() => uri.to_string(),
            _ => return Err(ProxyError::BadRequest(MISSING_URI_MESSAGE.to_string())),
        };

        let mut client_accepts = headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(MediaTypeList::from_accept)
            .unwrap_or_default();
        if client_accepts.is_empty() {
            client_accepts = MediaTypeList::from_accept(default_accept);
        }

        let request_content_type = if has_body {
            headers.get(header::CONTENT_TYPE).cloned()
        } else {
            None
        };
        let client_produces = request_content_type
            .as_ref()
            .and_then(|v| v.to_str().ok())
            .and_then(MediaType::parse);

        let fetch_accept = registry
            .parser_types()
            .union(&client_accepts)
            .to_header_value();
        let usable_serializers = client_accepts.intersect(registry.serializer_types());

        tracing::debug!(
            target_uri = %target,
            accept = %client_accepts.to_header_value(),
            usable = %usable_serializers.to_header_value(),
            "Negotiated request"
        );

        Ok(Self {
            target,
            client_accepts,
            client_produces,
            request_content_type,
            fetch_accept,
            usable_serializers,
        })
    }

    /// Build the outbound request. Only `Accept`, and `Content-Type` when a
    /// body is forwarded, are sent upstream.
    pub fn fetch_request(&self, method: Method, body: Option<Bytes>) -> FetchRequest {
        let mut headers = HeaderMap::new();
        if let Ok(accept) = HeaderValue::from_str(&self.fetch_accept) {
            headers.insert(header::ACCEPT, accept);
        }
        if body.is_some() {
            if let Some(content_type) = &self.request_content_type {
                headers.insert(header::CONTENT_TYPE, content_type.clone());
            }
        }
        FetchRequest {
            method,
            headers,
            body,
        }
    }
}
