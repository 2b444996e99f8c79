//! Extractor for the request id

use std::{
    fmt,
    future::{ready, Ready},
    ops::Deref
};
use uuid::Uuid;

use crate::error::Error;
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

/// Unique id assigned to every request
///
/// The same id is sent back in the `Req-UUID` response header.
///
/// # Example
/// ```no_run
/// use mortar::{App, RequestId, ok};
///
/// let mut app = App::new();
///
/// app.map_get("/", |id: RequestId| async move {
///     ok!("request {id}")
/// });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generates a new random id
    #[inline]
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Unwraps the inner [`Uuid`]
    #[inline]
    pub fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Deref for RequestId {
    type Target = Uuid;

    #[inline]
    fn deref(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromRequestParts for RequestId {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        parts.extensions
            .get::<RequestId>()
            .copied()
            .ok_or_else(|| Error::server_error("Request id is missing"))
    }
}

impl FromPayload for RequestId {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Err(Error::server_error("Request id is missing"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}

#[cfg(test)]
mod tests {
    use crate::http::Request;
    use super::*;

    #[test]
    fn it_extracts_request_id() {
        let id = RequestId::generate();
        let (parts, _) = Request::get("/").extension(id).body(()).unwrap().into_parts();

        assert_eq!(RequestId::from_parts(&parts).unwrap(), id);
    }

    #[test]
    fn it_generates_v4_ids() {
        assert_eq!(RequestId::generate().get_version_num(), 4);
    }
}
