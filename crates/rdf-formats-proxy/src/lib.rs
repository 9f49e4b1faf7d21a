//! rdf-formats-proxy - fetch RDF documents and hand them back in the
//! serialization the client asked for
//!
//! The proxy forwards `/proxy?uri=...` requests to the origin, advertising
//! every format it can parse. When the origin answers in a format the client
//! did not accept, the body is parsed into statements and re-serialized.

pub mod config;
pub mod error;
pub mod formats;
pub mod media_type;
pub mod proxy;
pub mod rdf;
pub mod testing;

pub use error::FormatsProxyError;
