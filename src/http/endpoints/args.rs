//! Extractors for HTTP request parts and body

use std::future::Future;

use crate::{
    http::{endpoints::route::{PathArg, PathArgs}, Parts},
    HttpBody,
    HttpRequest,
    error::Error
};

pub mod path;
pub mod query;
pub mod json;
pub mod form;
pub mod request;
pub mod parsed_body;
pub mod client_ip;
pub mod request_id;
pub mod settings;
#[cfg(feature = "multipart")]
pub mod multipart;

/// What an extractor is built from
pub(crate) enum Payload<'a> {
    None,
    Request(HttpRequest),
    Body(HttpBody),
    Full(&'a Parts, HttpBody),
    Parts(&'a Parts),
    Path(&'a PathArg),
}

/// Which part of the request an extractor needs
pub(crate) enum Source {
    None,
    Request,
    Full,
    Parts,
    Path,
    Body,
}

/// Extracts a handler argument, or a tuple of them, from the whole request
pub trait FromRequest: Sized {
    /// Consumes the request and extracts `Self`
    fn from_request(req: HttpRequest) -> impl Future<Output = Result<Self, Error>> + Send;
}

/// Extracts a value from a request reference without consuming it
pub trait FromRequestRef: Sized {
    /// Extracts `Self` from the request
    fn from_request(req: &HttpRequest) -> Result<Self, Error>;
}

/// Extracts a value from the request head
pub trait FromRequestParts: Sized {
    /// Extracts `Self` from request parts
    fn from_parts(parts: &Parts) -> Result<Self, Error>;
}

/// A single handler argument
pub(crate) trait FromPayload: Send + Sized {
    type Future: Future<Output = Result<Self, Error>> + Send;

    fn from_payload(payload: Payload<'_>) -> Self::Future;

    #[inline]
    fn source() -> Source {
        Source::None
    }
}

impl<T: FromRequestParts> FromRequestRef for T {
    #[inline]
    fn from_request(req: &HttpRequest) -> Result<Self, Error> {
        T::from_parts(req.head().parts())
    }
}

impl FromRequest for () {
    #[inline]
    async fn from_request(_: HttpRequest) -> Result<Self, Error> {
        Ok(())
    }
}

macro_rules! define_generic_from_request {
    ($($T: ident),*) => {
        impl<$($T: FromPayload),+> FromRequest for ($($T,)+) {
            #[inline]
            async fn from_request(req: HttpRequest) -> Result<Self, Error> {
                let (parts, body) = req.into_parts();
                let params = parts.extensions
                    .get::<PathArgs>()
                    .cloned()
                    .unwrap_or_default();

                let mut body = Some(body);
                let mut iter = params.iter();
                let tuple = (
                    $(
                    $T::from_payload(match $T::source() {
                        Source::None => Payload::None,
                        Source::Parts => Payload::Parts(&parts),
                        Source::Path => match iter.next() {
                            Some(param) => Payload::Path(param),
                            None => Payload::None
                        },
                        Source::Body => match body.take() {
                            Some(body) => Payload::Body(body),
                            None => Payload::None
                        },
                        Source::Full => match body.take() {
                            Some(body) => Payload::Full(&parts, body),
                            None => Payload::None
                        },
                        Source::Request => match body.take() {
                            Some(body) => Payload::Request(HttpRequest::from_parts(parts.clone(), body)),
                            None => Payload::None
                        },
                    }).await?,
                    )*
                );
                Ok(tuple)
            }
        }
    }
}

define_generic_from_request! { T1 }
define_generic_from_request! { T1, T2 }
define_generic_from_request! { T1, T2, T3 }
define_generic_from_request! { T1, T2, T3, T4 }
define_generic_from_request! { T1, T2, T3, T4, T5 }
define_generic_from_request! { T1, T2, T3, T4, T5, T6 }
define_generic_from_request! { T1, T2, T3, T4, T5, T6, T7 }
define_generic_from_request! { T1, T2, T3, T4, T5, T6, T7, T8 }
define_generic_from_request! { T1, T2, T3, T4, T5, T6, T7, T8, T9 }
define_generic_from_request! { T1, T2, T3, T4, T5, T6, T7, T8, T9, T10 }

/// Route parameters of primitive types are parsed from the matching path segment
macro_rules! impl_from_path_arg {
    { $($type:ty),* $(,)? } => {
        $(impl FromPayload for $type {
            type Future = std::future::Ready<Result<Self, Error>>;

            #[inline]
            fn from_payload(payload: Payload<'_>) -> Self::Future {
                let Payload::Path(arg) = payload else {
                    return std::future::ready(Err(Error::client_error("Path parsing error: missing argument")));
                };
                std::future::ready(arg.value
                    .parse::<$type>()
                    .map_err(|err| Error::client_error(format!("Path parsing error: {}: {err}", arg.name))))
            }

            #[inline]
            fn source() -> Source {
                Source::Path
            }
        })*
    };
}

impl_from_path_arg! {
    bool,
    char,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
    String,
    uuid::Uuid,
}

// `Box<str>` does not implement `FromStr`; the raw segment is taken verbatim,
// matching what `str::parse::<String>` does for `String`.
impl FromPayload for Box<str> {
    type Future = std::future::Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        let Payload::Path(arg) = payload else {
            return std::future::ready(Err(Error::client_error("Path parsing error: missing argument")));
        };
        std::future::ready(Ok(arg.value.clone()))
    }

    #[inline]
    fn source() -> Source {
        Source::Path
    }
}
