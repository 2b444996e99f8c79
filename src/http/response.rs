//! HTTP response utilities

use crate::error::Error;
use crate::http::{
    body::HttpBody,
    Extensions,
    StatusCode,
    Version
};

use hyper::{
    header::HeaderMap,
    body::{Body, SizeHint},
    http::response::Parts,
    Response,
};

pub use builder::HttpResponseBuilder;
pub use file::send_file;
pub use filter_result::FilterResult;

pub mod builder;
pub mod macros;
pub mod status;
pub mod stream;
pub mod file;
pub mod into_response;
pub mod filter_result;

/// Represents an HTTP response
pub struct HttpResponse {
    inner: Response<HttpBody>
}

impl std::fmt::Debug for HttpResponse {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.inner.status())
            .field("headers", self.inner.headers())
            .finish_non_exhaustive()
    }
}

/// Represents a result of an HTTP request that could be
/// either [`HttpResponse`] or [`Error`]
pub type HttpResult = Result<HttpResponse, Error>;

impl From<HttpResponse> for Response<HttpBody> {
    #[inline]
    fn from(resp: HttpResponse) -> Self {
        resp.into_inner()
    }
}

impl HttpResponse {
    /// Creates a new [`HttpResponseBuilder`]
    #[inline]
    pub fn builder() -> HttpResponseBuilder {
        HttpResponseBuilder::new()
    }

    /// Returns the [`StatusCode`].
    #[inline]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Returns a mutable reference to the associated [`StatusCode`].
    #[inline]
    pub fn status_mut(&mut self) -> &mut StatusCode {
        self.inner.status_mut()
    }

    /// Returns a reference to the associated header field map.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the associated header field map.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Returns a reference to the associated version.
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// Returns a reference to the associated extensions.
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    /// Returns a mutable reference to the associated extensions.
    #[inline]
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.inner.extensions_mut()
    }

    /// Returns a reference to the associated HTTP body.
    #[inline]
    pub fn body(&self) -> &HttpBody {
        self.inner.body()
    }

    /// Returns a mutable reference to the associated HTTP body.
    #[inline]
    pub fn body_mut(&mut self) -> &mut HttpBody {
        self.inner.body_mut()
    }

    /// Returns the bounds on the remaining length of the body.
    ///
    /// Buffered bodies report an exact size.
    #[inline]
    pub fn size_hint(&self) -> SizeHint {
        self.inner.body().size_hint()
    }

    /// Consumes the response and returns just the body
    #[inline]
    pub fn into_body(self) -> HttpBody {
        self.inner.into_body()
    }

    /// Consumes the response returning the head and the body
    #[inline]
    pub fn into_parts(self) -> (Parts, HttpBody) {
        self.inner.into_parts()
    }

    /// Creates a new [`HttpResponse`] with the given head and body
    #[inline]
    pub fn from_parts(parts: Parts, body: HttpBody) -> Self {
        Self { inner: Response::from_parts(parts, body) }
    }

    /// Replaces the body, returning the old one
    #[inline]
    pub fn replace_body(&mut self, body: HttpBody) -> HttpBody {
        std::mem::replace(self.inner.body_mut(), body)
    }

    #[inline]
    pub(crate) fn into_inner(self) -> Response<HttpBody> {
        self.inner
    }

    #[inline]
    pub(crate) fn from_inner(inner: Response<HttpBody>) -> Self {
        Self { inner }
    }
}
