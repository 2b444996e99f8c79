//! Extractors for the whole request, its body and head

use std::future::{ready, Ready};

use crate::{error::Error, HttpBody, HttpRequest, RequestHead};
use crate::http::request::clone_parts;
use crate::headers::HeaderMap;
use crate::http::{
    Method,
    Uri,
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

#[inline]
fn taken(what: &str) -> Error {
    Error::server_error(format!("{what} can't be extracted: request body has already been taken"))
}

impl FromPayload for HttpRequest {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Request(req) => ready(Ok(req)),
            _ => ready(Err(taken("HttpRequest"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Request
    }
}

impl FromPayload for HttpBody {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Body(body) => ready(Ok(body)),
            _ => ready(Err(taken("HttpBody"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Body
    }
}

macro_rules! impl_from_parts {
    ($($type:ty => |$parts:ident| $value:expr),* $(,)?) => {
        $(impl FromRequestParts for $type {
            #[inline]
            fn from_parts($parts: &Parts) -> Result<Self, Error> {
                Ok($value)
            }
        }

        impl FromPayload for $type {
            type Future = Ready<Result<Self, Error>>;

            #[inline]
            fn from_payload(payload: Payload<'_>) -> Self::Future {
                match payload {
                    Payload::Parts(parts) => ready(<$type as FromRequestParts>::from_parts(parts)),
                    _ => ready(Err(Error::server_error("request parts are unavailable"))),
                }
            }

            #[inline]
            fn source() -> Source {
                Source::Parts
            }
        })*
    };
}

impl_from_parts! {
    HeaderMap => |parts| parts.headers.clone(),
    Method => |parts| parts.method.clone(),
    Uri => |parts| parts.uri.clone(),
    RequestHead => |parts| RequestHead::from(clone_parts(parts)),
}
