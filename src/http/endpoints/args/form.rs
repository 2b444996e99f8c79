//! Extractors for url-encoded and multipart form data

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::ops::{Deref, DerefMut};

use crate::{error::Error, ParsedBody};
use crate::headers::CONTENT_TYPE;
use crate::http::endpoints::args::{FromPayload, Payload, Source};

/// Wraps typed form data
///
/// Url-encoded bodies are deserialized from the raw bytes.
/// Any other body that has been decoded into a JSON object, e.g. by the multipart parser,
/// is deserialized from that object.
///
/// # Example
/// ```no_run
/// use mortar::{App, Form, ok};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Login {
///     user: String,
/// }
///
/// let mut app = App::new();
///
/// app.map_post("/login", |login: Form<Login>| async move {
///     ok!("Hello {}", login.user)
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Unwraps the inner `T`
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Form<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Form<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> FromPayload for Form<T> {
    type Future = BoxFuture<'static, Result<Self, Error>>;

    fn from_payload(payload: Payload<'_>) -> Self::Future {
        let Payload::Full(parts, body) = payload else {
            return Box::pin(async { Err(Error::client_error("Form parsing error: request body has already been taken")) });
        };

        let url_encoded = parts.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()));

        if !url_encoded {
            if let Some(ParsedBody::Json(value)) = parts.extensions.get::<ParsedBody>() {
                let result = serde_json::from_value(value.clone())
                    .map(Form)
                    .map_err(form_error);
                return Box::pin(async move { result });
            }
        }

        Box::pin(async move {
            let bytes = body.into_bytes().await?;
            serde_urlencoded::from_bytes(&bytes)
                .map(Form)
                .map_err(form_error)
        })
    }

    #[inline]
    fn source() -> Source {
        Source::Full
    }
}

#[inline]
fn form_error(err: impl std::fmt::Display) -> Error {
    Error::client_error(format!("Form parsing error: {err}"))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use crate::{HttpBody, ParsedBody};
    use crate::http::Request;
    use crate::http::endpoints::args::{FromPayload, Payload};
    use super::Form;

    #[derive(Deserialize)]
    struct Login {
        user: String,
        age: u32,
    }

    #[tokio::test]
    async fn it_reads_url_encoded_body() {
        let (parts, _) = Request::post("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(())
            .unwrap()
            .into_parts();

        let login = Form::<Login>::from_payload(Payload::Full(&parts, HttpBody::full("user=john&age=30"))).await.unwrap();

        assert_eq!(login.user, "john");
        assert_eq!(login.age, 30);
    }

    #[tokio::test]
    async fn it_reads_parsed_object() {
        #[derive(Deserialize)]
        struct Upload {
            title: String,
        }

        let (parts, _) = Request::post("/")
            .header("content-type", "multipart/form-data; boundary=x")
            .extension(ParsedBody::Json(json!({ "title": "report" })))
            .body(())
            .unwrap()
            .into_parts();

        let upload = Form::<Upload>::from_payload(Payload::Full(&parts, HttpBody::empty())).await.unwrap();

        assert_eq!(upload.title, "report");
    }
}
