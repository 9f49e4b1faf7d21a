//! Drives parsed statements into a serializer

use futures::TryStreamExt;

use crate::formats::{FormatError, QuadStream, Serializer};
use crate::rdf::Quad;

/// Collect every statement from `quads`, in order, then serialize them as one
/// document. The first parse error aborts the transcode.
pub async fn transcode(quads: QuadStream, serializer: &dyn Serializer) -> Result<String, FormatError> {
    let quads: Vec<Quad> = quads.try_collect().await?;
    tracing::debug!(statements = quads.len(), "Serializing");
    serializer.serialize(&quads)
}
