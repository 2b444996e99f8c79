//! Extractors for the query string

use serde::de::DeserializeOwned;
use std::{
    future::{ready, Ready},
    ops::{Deref, DerefMut},
};

use crate::error::Error;
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

/// Wraps typed data extracted from the query string
///
/// A request without a query string deserializes as an empty one,
/// so optional fields still work.
///
/// # Example
/// ```no_run
/// use mortar::{App, Query, ok};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Page {
///     limit: Option<u32>,
/// }
///
/// let mut app = App::new();
///
/// app.map_get("/items", |page: Query<Page>| async move {
///     ok!("limit: {:?}", page.limit)
/// });
/// ```
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Unwraps the inner `T`
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Query<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned> FromRequestParts for Query<T> {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        let query = parts.uri.query().unwrap_or_default();
        serde_urlencoded::from_str::<T>(query)
            .map(Query)
            .map_err(|err| Error::client_error(format!("Query parsing error: {err}")))
    }
}

impl<T: DeserializeOwned + Send> FromPayload for Query<T> {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Err(Error::server_error("Query extractor requires request parts"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use std::collections::HashMap;
    use crate::http::Request;
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Filter {
        name: String,
        age: Option<u32>,
    }

    #[test]
    fn it_parses_query() {
        let (parts, _) = Request::get("/search?name=John&age=33").body(()).unwrap().into_parts();

        let filter = Query::<Filter>::from_parts(&parts).unwrap();

        assert_eq!(filter.name, "John");
        assert_eq!(filter.age, Some(33));
    }

    #[test]
    fn it_parses_missing_query_as_empty() {
        let (parts, _) = Request::get("/search").body(()).unwrap().into_parts();

        let query = Query::<HashMap<String, String>>::from_parts(&parts).unwrap();

        assert!(query.is_empty());
    }

    #[test]
    fn it_fails_on_missing_required_field() {
        let (parts, _) = Request::get("/search?age=1").body(()).unwrap().into_parts();

        let err = Query::<Filter>::from_parts(&parts).unwrap_err();

        assert_eq!(err.status, 400);
    }
}
