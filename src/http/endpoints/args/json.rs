//! Extractors for typed JSON data

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Deref, DerefMut},
};

use crate::{error::Error, HttpBody, ParsedBody};
use crate::http::endpoints::args::{FromPayload, Payload, Source};

/// Wraps typed JSON data
///
/// When the body has already been decoded by the `application/json` parser,
/// the parsed value is reused instead of reading the body again.
///
/// # Example
/// ```no_run
/// use mortar::{App, Json, ok};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let mut app = App::new();
///
/// app.map_post("/users", |user: Json<User>| async move {
///     ok!("Hello {}", user.name)
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwraps the inner `T`
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: Display> Display for Json<T> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T: DeserializeOwned + Send + 'static> FromPayload for Json<T> {
    type Future = BoxFuture<'static, Result<Self, Error>>;

    fn from_payload(payload: Payload<'_>) -> Self::Future {
        let Payload::Full(parts, body) = payload else {
            return Box::pin(async { Err(Error::client_error("JSON parsing error: request body has already been taken")) });
        };

        match parts.extensions.get::<ParsedBody>() {
            Some(ParsedBody::Json(value)) => {
                let result = from_value(value.clone());
                Box::pin(async move { result })
            },
            _ => Box::pin(from_body(body)),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Full
    }
}

#[inline]
fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<Json<T>, Error> {
    serde_json::from_value(value)
        .map(Json)
        .map_err(json_error)
}

async fn from_body<T: DeserializeOwned>(body: HttpBody) -> Result<Json<T>, Error> {
    let bytes = body.into_bytes().await?;
    serde_json::from_slice(&bytes)
        .map(Json)
        .map_err(json_error)
}

#[inline]
fn json_error(err: serde_json::Error) -> Error {
    Error::client_error(format!("JSON parsing error: {err}"))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use crate::{HttpBody, ParsedBody};
    use crate::http::Request;
    use crate::http::endpoints::args::{FromPayload, Payload};
    use super::Json;

    #[derive(Debug, Serialize, Deserialize)]
    struct User {
        age: i32,
        name: String,
    }

    #[tokio::test]
    async fn it_reads_from_body() {
        let (parts, _) = Request::post("/").body(()).unwrap().into_parts();
        let body = HttpBody::json(User { age: 33, name: "John".into() }).unwrap();

        let user = Json::<User>::from_payload(Payload::Full(&parts, body)).await.unwrap();

        assert_eq!(user.age, 33);
        assert_eq!(user.name, "John");
    }

    #[tokio::test]
    async fn it_reuses_parsed_body() {
        let (parts, _) = Request::post("/")
            .extension(ParsedBody::Json(json!({ "age": 20, "name": "Jane" })))
            .body(())
            .unwrap()
            .into_parts();

        let user = Json::<User>::from_payload(Payload::Full(&parts, HttpBody::empty())).await.unwrap();

        assert_eq!(user.name, "Jane");
    }

    #[tokio::test]
    async fn it_fails_on_invalid_json() {
        let (parts, _) = Request::post("/").body(()).unwrap().into_parts();

        let err = Json::<User>::from_payload(Payload::Full(&parts, HttpBody::full("{ oops"))).await.unwrap_err();

        assert_eq!(err.status, 400);
    }
}
