//! Pass-through or transcode decision for an origin response

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;

use crate::formats::{FormatRegistry, Serializer};
use crate::media_type::{MediaType, MediaTypeList};

use super::negotiation::Negotiation;

/// A serializer chosen for the response, with the media type it produces
#[derive(Clone)]
pub struct Selection {
    pub media_type: MediaType,
    pub serializer: Arc<dyn Serializer>,
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum RouteDecision {
    PassThrough,
    Transcode(Selection),
}

/// Decide how to answer the client. The first matching rule wins:
///
/// 1. non-2xx origin status: pass through
/// 2. content type already accepted by the client: pass through
/// 3. content type absent or without a parser: pass through
/// 4. transcode with the first usable serializer, or pass through if none
pub fn route(
    status: StatusCode,
    content_type: Option<&MediaType>,
    negotiation: &Negotiation,
    registry: &dyn FormatRegistry,
) -> RouteDecision {
    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "Origin status not successful, passing through");
        return RouteDecision::PassThrough;
    }

    let Some(content_type) = content_type else {
        tracing::debug!("No content type from origin, cannot convert from unknown format");
        return RouteDecision::PassThrough;
    };

    if negotiation.client_accepts.contains(content_type) {
        tracing::debug!(%content_type, "No translation required");
        return RouteDecision::PassThrough;
    }

    if !registry.parser_types().contains(content_type) {
        tracing::debug!(%content_type, "Content type is not parseable, passing through");
        return RouteDecision::PassThrough;
    }

    match select_serializer(Some(content_type), &negotiation.usable_serializers, registry) {
        Some(selection) => {
            tracing::debug!(from = %content_type, to = %selection.media_type, "Transcoding");
            RouteDecision::Transcode(selection)
        }
        None => {
            tracing::debug!(%content_type, "No serializer found, passing through");
            RouteDecision::PassThrough
        }
    }
}

/// Take candidates from the front of `usable` until one resolves to a
/// registered serializer. Each candidate is tried once.
pub fn select_serializer(
    content_type: Option<&MediaType>,
    usable: &MediaTypeList,
    registry: &dyn FormatRegistry,
) -> Option<Selection> {
    content_type?;

    let mut candidates: VecDeque<MediaType> = usable.iter().cloned().collect();
    while let Some(media_type) = candidates.pop_front() {
        if let Some(serializer) = registry.find_serializer(&media_type) {
            return Some(Selection {
                media_type,
                serializer,
            });
        }
    }
    None
}
