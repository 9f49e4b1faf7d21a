//! Writing the final response and rendering pipeline errors

use axum::{
    Json,
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formats::FormatError;
use crate::media_type::MediaType;

/// JSON body of a 502 response
///
/// `kind`, `errno` and `code` are only present when the underlying failure
/// provides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub name: String,
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errno: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorPayload {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            kind: None,
            errno: None,
            code: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set both `errno` and `code` to the same symbolic error name
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.errno = Some(code.clone());
        self.code = Some(code);
        self
    }
}

impl From<FormatError> for ErrorPayload {
    fn from(error: FormatError) -> Self {
        let message = match &error {
            FormatError::Read(m) | FormatError::Parse(m) | FormatError::Serialize(m) => m.clone(),
            FormatError::UnsupportedMediaType(_) => error.to_string(),
        };
        match error {
            FormatError::Read(_) => ErrorPayload::new("FetchError", message).with_kind("system"),
            FormatError::Parse(_) | FormatError::UnsupportedMediaType(_) => {
                ErrorPayload::new("ParseError", message).with_kind("parse")
            }
            FormatError::Serialize(_) => {
                ErrorPayload::new("SerializeError", message).with_kind("serialize")
            }
        }
    }
}

/// Errors that end a proxied request early
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// The request itself is unusable; reported as 400 with a plain-text body
    #[error("{0}")]
    BadRequest(String),

    /// Fetching or transcoding failed; reported as 502 with a JSON body
    #[error("{}: {}", .0.name, .0.message)]
    UpstreamFailure(ErrorPayload),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<FormatError> for ProxyError {
    fn from(error: FormatError) -> Self {
        ProxyError::UpstreamFailure(error.into())
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ProxyError::BadRequest(message) => (
                status,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                message,
            )
                .into_response(),
            ProxyError::UpstreamFailure(payload) => (status, Json(payload)).into_response(),
        }
    }
}

/// What the pipeline produced for a successful request
#[derive(Debug, Clone, PartialEq)]
pub enum TranscodeOutcome {
    /// The origin body, untouched, with the origin's raw `Content-Type`
    PassThrough {
        content_type: Option<HeaderValue>,
        body: Bytes,
    },
    /// A body re-serialized into `media_type`
    Serialized { media_type: MediaType, body: String },
}

/// Write the status, the content type (when one was determined) and the body
pub fn send(status: StatusCode, outcome: TranscodeOutcome) -> Response {
    let (content_type, body) = match outcome {
        TranscodeOutcome::PassThrough { content_type, body } => (content_type, Body::from(body)),
        TranscodeOutcome::Serialized { media_type, body } => {
            (HeaderValue::from_str(media_type.as_str()).ok(), Body::from(body))
        }
    };

    tracing::debug!(
        status = status.as_u16(),
        content_type = ?content_type,
        "Sending response"
    );

    let mut response = Response::new(body);
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}
