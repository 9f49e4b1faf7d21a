//! Integration tests for the HTTP proxy
//!
//! Origins are stood up with wiremock; the proxy router is driven directly
//! with `oneshot`.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use rdf_formats_proxy::formats::{Formats, RdfFormat, parse_document};
use rdf_formats_proxy::proxy::{AppState, FormatsProxy, HttpFetcher, MISSING_URI_MESSAGE, create_router};
use rdf_formats_proxy::rdf::{Quad, Term};

// =============================================================================
// Test Fixtures
// =============================================================================

const FOAF_JSONLD: &str = r#"{
  "@context": {
    "foaf": "http://xmlns.com/foaf/0.1/",
    "rdfs": "http://www.w3.org/2000/01/rdf-schema#",
    "label": "rdfs:label",
    "knows": {"@id": "foaf:knows", "@type": "@id"}
  },
  "@graph": [
    {"@id": "http://example.org/alice", "@type": "foaf:Person", "label": "Alice", "knows": "http://example.org/bob"},
    {"@id": "http://example.org/bob", "@type": "foaf:Person", "label": "Bob"}
  ]
}"#;

const NOT_FOUND_HTML: &str = "<html><body>Not Found</body></html>";

fn create_test_router() -> Router {
    let fetcher = HttpFetcher::new(Some(Duration::from_secs(10))).unwrap();
    let proxy = FormatsProxy::new(Arc::new(Formats::common()), Arc::new(fetcher));
    create_router(Arc::new(AppState::new(proxy)))
}

fn proxy_request(uri: &str, accept: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/proxy?uri={uri}"))
        .header(header::ACCEPT, accept)
        .body(Body::empty())
        .unwrap()
}

async fn mount_document(server: &MockServer, path: &str, status: u16, content_type: &str, body: &str) {
    Mock::given(matchers::method("GET"))
        .and(matchers::path(path))
        .respond_with(ResponseTemplate::new(status).set_body_raw(body.as_bytes().to_vec(), content_type))
        .mount(server)
        .await;
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string())
}

fn parse_turtle(text: &str) -> Vec<Quad> {
    parse_document(RdfFormat::Turtle, text.as_bytes(), None).unwrap()
}

/// A local address nothing is listening on
fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/resource.ttl")
}

// =============================================================================
// Missing URI
// =============================================================================

mod missing_uri_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_uri_is_bad_request() {
        let response = create_test_router()
            .oneshot(
                Request::builder()
                    .uri("/proxy")
                    .header(header::ACCEPT, "text/n3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(content_type(&response).unwrap().starts_with("text/plain"));
        assert_eq!(
            body_string(response).await,
            "'uri' query parameter missing. Use ?uri=http://requested.example.com/file.rdf"
        );
    }

    #[tokio::test]
    async fn test_missing_uri_ignores_other_headers() {
        for (accept, method) in [("application/ld+json", "GET"), ("*/*", "POST"), ("", "GET")] {
            let response = create_test_router()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/proxy?other=1")
                        .header(header::ACCEPT, accept)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_string(response).await, MISSING_URI_MESSAGE);
        }
    }

    #[tokio::test]
    async fn test_empty_uri_is_bad_request() {
        let response = create_test_router()
            .oneshot(proxy_request("", "text/n3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

// =============================================================================
// Transcoding
// =============================================================================

mod transcode_tests {
    use super::*;

    #[tokio::test]
    async fn test_jsonld_to_n3() {
        let server = MockServer::start().await;
        mount_document(&server, "/doc.jsonld", 200, "application/ld+json", FOAF_JSONLD).await;

        let uri = format!("{}/doc.jsonld", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("text/n3"));

        let body = body_string(response).await;
        assert_ne!(body, FOAF_JSONLD);

        let quads = parse_turtle(&body);
        assert_eq!(quads.len(), 5);
        assert!(quads.contains(&Quad::triple(
            Term::iri("http://example.org/alice"),
            Term::iri("http://xmlns.com/foaf/0.1/knows"),
            Term::iri("http://example.org/bob"),
        )));
    }

    #[tokio::test]
    async fn test_first_listed_serializer_wins() {
        let server = MockServer::start().await;
        mount_document(&server, "/doc.jsonld", 200, "application/ld+json", FOAF_JSONLD).await;

        let uri = format!("{}/doc.jsonld", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(
                &uri,
                "image/png, application/n-triples;q=0.1, text/turtle;q=1.0",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("application/n-triples"));
        assert_eq!(body_string(response).await.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_origin_success_status_is_kept() {
        let server = MockServer::start().await;
        mount_document(&server, "/new.ttl", 203, "text/turtle", "<http://x/a> <http://x/b> <http://x/c> .").await;

        let uri = format!("{}/new.ttl", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "application/n-triples"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NON_AUTHORITATIVE_INFORMATION);
        assert_eq!(
            body_string(response).await,
            "<http://x/a> <http://x/b> <http://x/c> .\n"
        );
    }

    #[tokio::test]
    async fn test_relative_iris_resolve_against_fetched_uri() {
        let server = MockServer::start().await;
        mount_document(&server, "/people/card.ttl", 200, "text/turtle", "<#me> <knows> <../bob#me> .").await;

        let uri = format!("{}/people/card.ttl", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "application/n-triples"))
            .await
            .unwrap();

        let base = server.uri();
        assert_eq!(
            body_string(response).await,
            format!("<{base}/people/card.ttl#me> <{base}/people/knows> <{base}/bob#me> .\n")
        );
    }

    #[tokio::test]
    async fn test_malformed_document_is_bad_gateway() {
        let server = MockServer::start().await;
        mount_document(&server, "/broken.ttl", 200, "text/turtle", "<http://x/a> <http://x/b> .").await;

        let uri = format!("{}/broken.ttl", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "application/ld+json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(content_type(&response).as_deref(), Some("application/json"));
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "ParseError");
        assert_eq!(json["type"], "parse");
        assert!(!json["message"].as_str().unwrap().is_empty());
    }
}

// =============================================================================
// Pass-through
// =============================================================================

mod passthrough_tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_accept_passes_through() {
        let server = MockServer::start().await;
        mount_document(
            &server,
            "/doc.jsonld",
            200,
            "application/ld+json; charset=utf-8",
            FOAF_JSONLD,
        )
        .await;

        let uri = format!("{}/doc.jsonld", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "unsupported/type"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            content_type(&response).as_deref(),
            Some("application/ld+json; charset=utf-8")
        );
        assert_eq!(body_string(response).await, FOAF_JSONLD);
    }

    #[tokio::test]
    async fn test_accepted_type_is_byte_identical() {
        let server = MockServer::start().await;
        let turtle = "@prefix ex: <http://example.org/> .\n\nex:a   ex:b ex:c .   # kept as is\n";
        mount_document(&server, "/doc.ttl", 200, "text/turtle", turtle).await;

        let uri = format!("{}/doc.ttl", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "application/ld+json, text/turtle"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("text/turtle"));
        assert_eq!(body_string(response).await, turtle);
    }

    #[tokio::test]
    async fn test_non_rdf_page_passes_through() {
        let server = MockServer::start().await;
        let html = "<html><body>signature</body></html>";
        mount_document(&server, "/foafsig", 200, "text/html; charset=utf-8", html).await;

        let uri = format!("{}/foafsig", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(body_string(response).await, html);
    }

    #[tokio::test]
    async fn test_not_found_passes_through() {
        let server = MockServer::start().await;
        mount_document(&server, "/404page.ttl", 404, "text/html; charset=utf-8", NOT_FOUND_HTML).await;

        let uri = format!("{}/404page.ttl", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(content_type(&response).as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(body_string(response).await, NOT_FOUND_HTML);
    }

    #[tokio::test]
    async fn test_error_status_never_transcodes() {
        let server = MockServer::start().await;
        mount_document(&server, "/flaky.jsonld", 500, "application/ld+json", FOAF_JSONLD).await;

        let uri = format!("{}/flaky.jsonld", server.uri());
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response).as_deref(), Some("application/ld+json"));
        assert_eq!(body_string(response).await, FOAF_JSONLD);
    }
}

// =============================================================================
// Outbound request
// =============================================================================

mod outbound_tests {
    use super::*;

    #[tokio::test]
    async fn test_upstream_accept_advertises_parsers_then_client() {
        let server = MockServer::start().await;
        mount_document(&server, "/doc.ttl", 200, "text/turtle", "").await;

        let uri = format!("{}/doc.ttl", server.uri());
        create_test_router()
            .oneshot(proxy_request(&uri, "text/html;q=0.9, text/turtle"))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0].headers.get("accept").unwrap().to_str().unwrap(),
            "application/ld+json, application/n-triples, application/n-quads, text/n3, text/turtle, text/html"
        );
    }

    #[tokio::test]
    async fn test_default_accept_without_header() {
        let server = MockServer::start().await;
        mount_document(&server, "/doc.jsonld", 200, "application/ld+json", FOAF_JSONLD).await;

        let uri = format!("{}/doc.jsonld", server.uri());
        let response = create_test_router()
            .oneshot(
                Request::builder()
                    .uri(format!("/proxy?uri={uri}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response).as_deref(), Some("text/n3"));
    }

    #[tokio::test]
    async fn test_post_body_and_content_type_forwarded() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/sink"))
            .and(matchers::header("content-type", "text/turtle"))
            .and(matchers::body_string("<http://x/a> <http://x/b> <http://x/c> ."))
            .respond_with(ResponseTemplate::new(201).set_body_raw(b"created".to_vec(), "text/plain"))
            .mount(&server)
            .await;

        let uri = format!("{}/sink", server.uri());
        let response = create_test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/proxy?uri={uri}"))
                    .header(header::ACCEPT, "text/n3")
                    .header(header::CONTENT_TYPE, "text/turtle")
                    .body(Body::from("<http://x/a> <http://x/b> <http://x/c> ."))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_string(response).await, "created");
    }

    #[tokio::test]
    async fn test_other_inbound_headers_not_forwarded() {
        let server = MockServer::start().await;
        mount_document(&server, "/doc.ttl", 200, "text/turtle", "").await;

        let uri = format!("{}/doc.ttl", server.uri());
        create_test_router()
            .oneshot(
                Request::builder()
                    .uri(format!("/proxy?uri={uri}"))
                    .header(header::ACCEPT, "text/turtle")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .header("x-custom", "1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
        assert!(received[0].headers.get("x-custom").is_none());
    }
}

// =============================================================================
// Fetch failures
// =============================================================================

mod fetch_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_bad_gateway() {
        let uri = unreachable_uri();
        let response = create_test_router()
            .oneshot(proxy_request(&uri, "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(content_type(&response).as_deref(), Some("application/json"));

        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "FetchError");
        assert_eq!(json["type"], "system");
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with(&format!("request to {uri} failed, reason: "))
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_ignores_accept() {
        for accept in ["text/n3", "unsupported/type", "application/ld+json, text/turtle"] {
            let response = create_test_router()
                .oneshot(proxy_request(&unreachable_uri(), accept))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
            assert_eq!(content_type(&response).as_deref(), Some("application/json"));
        }
    }

    #[tokio::test]
    async fn test_relative_uri_is_type_error() {
        let response = create_test_router()
            .oneshot(proxy_request("/relative/doc.ttl", "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "TypeError");
        assert_eq!(json["message"], "Only absolute URLs are supported");
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_type_error() {
        let response = create_test_router()
            .oneshot(proxy_request("ftp://example.org/doc.ttl", "text/n3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["message"], "Only HTTP(S) protocols are supported");
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("GET"))
            .and(matchers::path("/slow.ttl"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"".to_vec(), "text/turtle")
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Some(Duration::from_millis(200))).unwrap();
        let proxy = FormatsProxy::new(Arc::new(Formats::common()), Arc::new(fetcher));
        let router = create_router(Arc::new(AppState::new(proxy)));

        let uri = format!("{}/slow.ttl", server.uri());
        let response = router.oneshot(proxy_request(&uri, "text/n3")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["name"], "FetchError");
        assert_eq!(json["type"], "request-timeout");
    }
}
