//! Parser/serializer interfaces and the media type registry
//!
//! Parsers turn a byte stream into a lazy stream of [`Quad`]s; serializers
//! turn a buffered slice of quads back into text. A [`FormatRegistry`] maps
//! media types to both and is built once at startup, then shared read-only.

mod legacy;
mod rdfio;

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

use crate::media_type::{MediaType, MediaTypeList};
use crate::rdf::Quad;

pub use legacy::{LegacyError, LegacyParser, LegacyParserAdapter, LegacyTerm, LegacyTriple};
pub use oxrdfio::RdfFormat;
pub use rdfio::{RdfIoParser, RdfIoSerializer, parse_document};

/// Media types registered by [`Formats::common`], in preference order
pub const COMMON_MEDIA_TYPES: [&str; 5] = [
    "application/ld+json",
    "application/n-triples",
    "application/n-quads",
    "text/n3",
    "text/turtle",
];

/// Raw document bytes, possibly arriving in several chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, FormatError>>;

/// Lazy sequence of parsed statements
pub type QuadStream = BoxStream<'static, Result<Quad, FormatError>>;

/// Errors raised while reading, parsing or serializing a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("Failed to read input: {0}")]
    Read(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("No parser or serializer registered for {0}")]
    UnsupportedMediaType(String),
}

/// Options handed to a parser for one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOptions {
    /// IRI relative references are resolved against; normally the fetched URI
    pub base_iri: Option<String>,
}

pub trait Parser: Send + Sync {
    fn import(&self, input: ByteStream, options: ParseOptions) -> QuadStream;
}

pub trait Serializer: Send + Sync {
    /// Serialize every statement, in order, into one document
    fn serialize(&self, quads: &[Quad]) -> Result<String, FormatError>;
}

/// Media type capabilities available to the proxy
pub trait FormatRegistry: Send + Sync {
    /// Parseable media types, in preference order
    fn parser_types(&self) -> &MediaTypeList;

    /// Serializable media types, in preference order
    fn serializer_types(&self) -> &MediaTypeList;

    fn find_parser(&self, media_type: &MediaType) -> Option<Arc<dyn Parser>>;

    fn find_serializer(&self, media_type: &MediaType) -> Option<Arc<dyn Serializer>>;
}

/// Registry backed by ordered media type tables
#[derive(Clone, Default)]
pub struct Formats {
    parser_types: MediaTypeList,
    serializer_types: MediaTypeList,
    parsers: Vec<(MediaType, Arc<dyn Parser>)>,
    serializers: Vec<(MediaType, Arc<dyn Serializer>)>,
}

impl Formats {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in formats: JSON-LD, N-Triples, N-Quads, N3 and Turtle
    pub fn common() -> Self {
        COMMON_MEDIA_TYPES
            .into_iter()
            .fold(Self::new(), |formats, media_type| {
                match RdfFormat::from_media_type(media_type) {
                    Some(format) => formats
                        .with_parser(media_type, RdfIoParser::new(format))
                        .with_serializer(media_type, RdfIoSerializer::new(format)),
                    None => {
                        tracing::warn!(media_type, "No RDF syntax available for media type");
                        formats
                    }
                }
            })
    }

    /// Register `parser` for `media_type`. A later registration for the same
    /// type replaces the implementation but keeps the original position.
    pub fn with_parser(mut self, media_type: &str, parser: impl Parser + 'static) -> Self {
        let Some(media_type) = MediaType::parse(media_type) else {
            tracing::warn!("Ignoring parser registered for empty media type");
            return self;
        };
        let parser: Arc<dyn Parser> = Arc::new(parser);
        match self.parsers.iter_mut().find(|(m, _)| *m == media_type) {
            Some(entry) => entry.1 = parser,
            None => {
                self.parser_types.push(media_type.clone());
                self.parsers.push((media_type, parser));
            }
        }
        self
    }

    /// Register `serializer` for `media_type`, with the same replacement
    /// rule as [`Formats::with_parser`].
    pub fn with_serializer(
        mut self,
        media_type: &str,
        serializer: impl Serializer + 'static,
    ) -> Self {
        let Some(media_type) = MediaType::parse(media_type) else {
            tracing::warn!("Ignoring serializer registered for empty media type");
            return self;
        };
        let serializer: Arc<dyn Serializer> = Arc::new(serializer);
        match self.serializers.iter_mut().find(|(m, _)| *m == media_type) {
            Some(entry) => entry.1 = serializer,
            None => {
                self.serializer_types.push(media_type.clone());
                self.serializers.push((media_type, serializer));
            }
        }
        self
    }
}

impl FormatRegistry for Formats {
    fn parser_types(&self) -> &MediaTypeList {
        &self.parser_types
    }

    fn serializer_types(&self) -> &MediaTypeList {
        &self.serializer_types
    }

    fn find_parser(&self, media_type: &MediaType) -> Option<Arc<dyn Parser>> {
        self.parsers
            .iter()
            .find(|(m, _)| m == media_type)
            .map(|(_, p)| Arc::clone(p))
    }

    fn find_serializer(&self, media_type: &MediaType) -> Option<Arc<dyn Serializer>> {
        self.serializers
            .iter()
            .find(|(m, _)| m == media_type)
            .map(|(_, s)| Arc::clone(s))
    }
}

impl std::fmt::Debug for Formats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formats")
            .field("parsers", &self.parser_types)
            .field("serializers", &self.serializer_types)
            .finish()
    }
}

/// A single-chunk byte stream
pub fn bytes_stream(bytes: impl Into<Bytes>) -> ByteStream {
    stream::once(futures::future::ready(Ok(bytes.into()))).boxed()
}

/// Buffer a byte stream into one contiguous buffer
pub async fn read_to_bytes(mut input: ByteStream) -> Result<Vec<u8>, FormatError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = input.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer)
}

/// Buffer a byte stream into one UTF-8 string
pub async fn read_to_string(input: ByteStream) -> Result<String, FormatError> {
    let buffer = read_to_bytes(input).await?;
    String::from_utf8(buffer).map_err(|e| FormatError::Read(format!("input is not UTF-8: {e}")))
}

/// Buffer the whole input, run a document parser over it on the blocking
/// pool, and yield the resulting statements as a stream. A read or parse
/// failure is yielded as the single error item of the stream.
pub(crate) fn buffered_parse<F>(input: ByteStream, options: ParseOptions, parse: F) -> QuadStream
where
    F: FnOnce(&[u8], &ParseOptions) -> Result<Vec<Quad>, FormatError> + Send + 'static,
{
    stream::once(async move {
        let bytes = read_to_bytes(input).await?;
        tokio::task::spawn_blocking(move || parse(&bytes, &options))
            .await
            .map_err(|e| FormatError::Parse(format!("parser task failed: {e}")))?
    })
    .map(|parsed| match parsed {
        Ok(quads) => stream::iter(quads.into_iter().map(Ok)).left_stream(),
        Err(e) => stream::iter(std::iter::once(Err(e))).right_stream(),
    })
    .flatten()
    .boxed()
}
