//! HTTP response builder and the `builder!`/`response!` macros

use std::fmt::{Debug, Formatter};
use crate::{
    error::Error,
    headers::{HeaderName, HeaderValue, HeaderMap},
    http::{HttpBody, HttpResponse, Response, StatusCode}
};

/// Default server name
pub const SERVER_NAME: &str = "mortar";
/// Default response builder error
pub const RESPONSE_ERROR: &str = "HTTP Response: Unable to create a response";

/// Builder for [`HttpResponse`].
///
/// Errors are deferred: the first failing step is kept and reported by [`HttpResponseBuilder::body`].
pub struct HttpResponseBuilder {
    inner: Result<InnerBuilder, Error>
}

struct InnerBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl Debug for HttpResponseBuilder {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponseBuilder(...)").finish()
    }
}

impl HttpResponseBuilder {
    #[inline]
    pub(super) fn new() -> Self {
        Self {
            inner: Ok(InnerBuilder {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
            })
        }
    }

    /// Sets the HTTP status code.
    #[inline]
    pub fn status<T>(self, status: T) -> Self
    where
        StatusCode: TryFrom<T>,
        Error: From<<StatusCode as TryFrom<T>>::Error>,
    {
        self.and_then(|mut inner| {
            inner.status = status
                .try_into()
                .map_err(Error::from)?;
            Ok(inner)
        })
    }

    /// Appends an HTTP header value.
    ///
    /// If a header with the same name already exists, the value is appended.
    #[inline]
    pub fn header_raw<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        HeaderValue: TryFrom<V>,
        Error: From<<HeaderName as TryFrom<K>>::Error>,
        Error: From<<HeaderValue as TryFrom<V>>::Error>,
    {
        self.and_then(|mut inner| {
            let name = HeaderName::try_from(key).map_err(Error::from)?;
            let value = HeaderValue::try_from(value).map_err(Error::from)?;
            inner.headers.append(name, value);
            Ok(inner)
        })
    }

    /// Appends an HTTP header value from a static source.
    #[inline]
    pub fn header_static(self, key: &'static str, value: &'static str) -> Self {
        self.and_then(|mut inner| {
            inner.headers.append(HeaderName::from_static(key), HeaderValue::from_static(value));
            Ok(inner)
        })
    }

    /// Extends the headers with the given map
    #[inline]
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.and_then(|mut inner| {
            inner.headers.extend(headers);
            Ok(inner)
        })
    }

    /// Finalizes the response with the given body.
    ///
    /// # Errors
    /// Returns an error if any of the previous steps failed.
    #[inline]
    pub fn body(self, body: HttpBody) -> Result<HttpResponse, Error> {
        self.inner.and_then(|inner| {
            let mut response = Response::builder()
                .status(inner.status)
                .body(body)
                .map_err(|_| Error::server_error(RESPONSE_ERROR))?;

            *response.headers_mut() = inner.headers;

            Ok(HttpResponse::from_inner(response))
        })
    }

    #[inline]
    fn and_then<F>(self, func: F) -> Self
    where
        F: FnOnce(InnerBuilder) -> Result<InnerBuilder, Error>,
    {
        Self { inner: self.inner.and_then(func) }
    }
}

/// Creates a response builder
///
/// Debug builds stamp the `Server` header.
#[inline]
pub fn make_builder() -> HttpResponseBuilder {
    let builder = HttpResponse::builder();
    if cfg!(debug_assertions) {
        builder.header_static("server", SERVER_NAME)
    } else {
        builder
    }
}

/// Creates a response builder with a numeric status code
///
/// Codes outside of `100..=999` make the final `body` call fail.
#[doc(hidden)]
#[inline]
pub fn make_status_builder(status: u16) -> HttpResponseBuilder {
    make_builder().status(status)
}

/// Creates a default HTTP response builder
#[macro_export]
macro_rules! builder {
    () => {
        $crate::http::response::builder::make_builder()
    };
    ($status:expr) => {
        $crate::builder!()
            .status($status)
    };
}

/// Creates an HTTP response with `status`, `body` and `headers`
///
/// # Example
/// ```no_run
/// use mortar::{response, HttpBody, http::StatusCode};
///
/// let response = response!(
///     StatusCode::OK,
///     HttpBody::full("Hello!");
///     [("x-api-key", "some api key")]
/// );
/// ```
#[macro_export]
macro_rules! response {
    ($status:expr, $body:expr) => {
        $crate::response!($status, $body; [])
    };
    ($status:expr, $body:expr; [ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::builder!($status)
        $(
            .header_raw($key, $value)
        )*
            .body($body)
    };
}
