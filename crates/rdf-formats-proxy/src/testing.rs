//! Test utilities: a canned [`Fetcher`] that records what it was asked for

use std::sync::Mutex;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use bytes::Bytes;

use crate::formats::bytes_stream;
use crate::proxy::{FetchError, FetchRequest, FetchResponse, Fetcher};

/// Answers every fetch with the same response, or the same error
#[derive(Debug)]
pub struct StaticFetcher {
    outcome: Result<(StatusCode, HeaderMap, Bytes), FetchError>,
    requests: Mutex<Vec<(String, FetchRequest)>>,
}

impl StaticFetcher {
    /// A 200 response with the given content type and body
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        Self::with_status(StatusCode::OK, Some(content_type), body)
    }

    pub fn with_status(
        status: StatusCode,
        content_type: Option<&str>,
        body: impl Into<Bytes>,
    ) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type.and_then(|c| HeaderValue::from_str(c).ok()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self {
            outcome: Ok((status, headers, body.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch fails with `error`
    pub fn failing(error: FetchError) -> Self {
        Self {
            outcome: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The `(uri, request)` pairs fetched so far
    pub fn requests(&self) -> Vec<(String, FetchRequest)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, uri: &str, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((uri.to_string(), request));
        }
        let (status, headers, body) = self.outcome.clone()?;
        Ok(FetchResponse::new(status, headers, bytes_stream(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    fn get() -> FetchRequest {
        FetchRequest {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn static_fetcher_records_requests() {
        let fetcher = StaticFetcher::ok("text/turtle", "<a> <b> <c> .");
        let response = fetcher.fetch("http://x/doc", get()).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type().unwrap(), "text/turtle");
        assert_eq!(
            response.into_bytes().await.unwrap(),
            Bytes::from_static(b"<a> <b> <c> .")
        );
        assert_eq!(fetcher.requests().len(), 1);
        assert_eq!(fetcher.requests()[0].0, "http://x/doc");
    }

    #[tokio::test]
    async fn failing_fetcher_returns_error() {
        let fetcher = StaticFetcher::failing(FetchError::RelativeUrl);
        let err = fetcher.fetch("doc", get()).await.unwrap_err();
        assert_eq!(err, FetchError::RelativeUrl);
        assert_eq!(fetcher.requests().len(), 1);
    }
}
