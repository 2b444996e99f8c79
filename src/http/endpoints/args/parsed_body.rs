//! Extractor for a body decoded by a content-type parser

use std::future::{ready, Ready};

use crate::{error::Error, ParsedBody};
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

/// Returns [`ParsedBody::None`] if no parser has run for the request
impl FromRequestParts for ParsedBody {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        Ok(parts.extensions
            .get::<ParsedBody>()
            .cloned()
            .unwrap_or_default())
    }
}

impl FromPayload for ParsedBody {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Ok(ParsedBody::None)),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}
