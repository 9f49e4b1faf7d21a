//! The formats proxy: negotiation, fetching, routing, transcoding and the
//! HTTP surface that ties them together

mod fetch;
mod negotiation;
mod pipeline;
mod response;
mod router;
mod server;
mod transcode;

pub use fetch::{FetchError, FetchRequest, FetchResponse, Fetcher, HttpFetcher, parse_target};
pub use negotiation::{MISSING_URI_MESSAGE, Negotiation};
pub use pipeline::{DEFAULT_ACCEPT, FormatsProxy, ProxyRequest};
pub use response::{ErrorPayload, ProxyError, TranscodeOutcome, send};
pub use router::{RouteDecision, Selection, route, select_serializer};
pub use server::{AppState, ProxyServer, create_router};
pub use transcode::transcode;
