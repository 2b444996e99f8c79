//! Extractors for route/path segments

use serde::de::DeserializeOwned;
use std::{
    fmt::{self, Display, Formatter},
    future::{ready, Ready},
    ops::{Deref, DerefMut},
};

use crate::error::Error;
use crate::http::{
    Parts,
    endpoints::{
        route::{make_query_str, PathArgs},
        args::{FromPayload, FromRequestParts, Payload, Source}
    }
};

/// Wraps typed data extracted from route parameters
///
/// Parameter values are percent-decoded while deserializing.
///
/// # Example
/// ```no_run
/// use mortar::{App, Path, ok};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Params {
///     id: u32,
///     name: String,
/// }
///
/// let mut app = App::new();
///
/// app.map_get("/users/:id/:name", |params: Path<Params>| async move {
///     ok!("{}: {}", params.id, params.name)
/// });
/// ```
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Unwraps the inner `T`
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Path<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Display> Display for Path<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: DeserializeOwned> Path<T> {
    #[inline]
    fn from_args(args: &PathArgs) -> Result<Self, Error> {
        let query = make_query_str(args)?;
        serde_urlencoded::from_str::<T>(&query)
            .map(Path)
            .map_err(|err| Error::client_error(format!("Path parsing error: {err}")))
    }
}

impl<T: DeserializeOwned> FromRequestParts for Path<T> {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        parts.extensions
            .get::<PathArgs>()
            .ok_or_else(|| Error::client_error("Path parsing error: missing arguments"))
            .and_then(Self::from_args)
    }
}

impl<T: DeserializeOwned + Send> FromPayload for Path<T> {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Err(Error::server_error("Path extractor requires request parts"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}
