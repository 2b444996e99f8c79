//! HTTP request utilities

use http_body_util::BodyDataStream;
use std::sync::Arc;

use crate::{
    error::Error,
    headers::HeaderMap,
    BoxBody,
    HttpBody,
};

use crate::http::{
    endpoints::{args::FromRequestRef, route::PathArgs},
    request::request_body_limit::RequestBodyLimit,
    Request,
    Parts,
    Extensions,
    Method,
    Uri,
    Version
};

pub(crate) mod request_body_limit;

/// Wraps the incoming [`Request`] to enrich its functionality
pub struct HttpRequest {
    /// Inner [`Request`]
    inner: Request<HttpBody>
}

impl std::fmt::Debug for HttpRequest {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HttpRequest(..)")
    }
}

impl HttpRequest {
    /// Creates a new [`HttpRequest`]
    #[inline]
    pub fn new(request: Request<HttpBody>) -> Self {
        Self { inner: request }
    }

    /// Returns a reference to the associated URI.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpRequest};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_get("/", |req: HttpRequest| async move {
    ///     assert_eq!(req.uri(), "/");
    /// });
    /// ```
    #[inline]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Returns a mutable reference to the associated URI.
    #[inline]
    pub fn uri_mut(&mut self) -> &mut Uri {
        self.inner.uri_mut()
    }

    /// Returns a reference to the associated HTTP header map.
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Returns a mutable reference to the associated HTTP header map.
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    /// Returns a reference to the associated HTTP method.
    #[inline]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// Returns the associated version.
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

    /// Returns the body limit applied to this request, if any
    pub fn body_limit(&self) -> Option<usize> {
        self.inner.extensions()
            .get::<RequestBodyLimit>()
            .and_then(|l| match l {
                RequestBodyLimit::Enabled(size) => Some(*size),
                RequestBodyLimit::Disabled => None,
            })
    }

    #[inline]
    pub(crate) fn into_limited(self, body_limit: RequestBodyLimit) -> Self {
        match body_limit {
            RequestBodyLimit::Disabled => self,
            RequestBodyLimit::Enabled(limit) => {
                let (mut parts, body) = self.into_parts();
                parts.extensions.insert(body_limit);
                let body = HttpBody::limited(body, limit);
                Self::from_parts(parts, body)
            }
        }
    }

    /// Consumes the request and returns just the body
    #[inline]
    pub fn into_body(self) -> HttpBody {
        self.inner.into_body()
    }

    /// Consumes the request and returns the body as boxed trait object
    #[inline]
    pub fn into_boxed_body(self) -> BoxBody {
        self.inner
            .into_body()
            .into_boxed()
    }

    /// Consumes the request and returns the body as a stream of data chunks
    #[inline]
    pub fn into_body_stream(self) -> BodyDataStream<HttpBody> {
        self.inner
            .into_body()
            .into_data_stream()
    }

    /// Consumes the request and returns request head and body
    #[inline]
    pub fn into_parts(self) -> (Parts, HttpBody) {
        self.inner.into_parts()
    }

    /// Creates a new [`HttpRequest`] with the given head and body
    #[inline]
    pub fn from_parts(parts: Parts, body: HttpBody) -> Self {
        let request = Request::from_parts(parts, body);
        Self { inner: request }
    }

    /// Extracts a payload from request parts
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{HttpRequest, Query};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Params {
    ///     id: u32,
    /// }
    ///
    /// # fn docs(req: HttpRequest) -> Result<(), mortar::error::Error> {
    /// let params: Query<Params> = req.extract()?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub fn extract<T: FromRequestRef>(&self) -> Result<T, Error> {
        T::from_request(self)
    }

    /// Returns an iterator over the route parameters matched for this request
    pub fn path_args(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.extensions()
            .get::<PathArgs>()
            .map(|args| args
                .iter()
                .map(|arg| (arg.name.as_ref(), arg.value.as_ref())))
            .into_iter()
            .flatten()
    }

    /// Creates a body-less copy of the request head
    pub(crate) fn slim(&self) -> Self {
        let (mut parts, _) = Request::new(()).into_parts();
        parts.method = self.method().clone();
        parts.uri = self.uri().clone();
        parts.version = self.version();
        parts.headers = self.headers().clone();
        parts.extensions = self.extensions().clone();
        Self::from_parts(parts, HttpBody::empty())
    }

    /// Returns a snapshot of the request head
    #[inline]
    pub fn head(&self) -> RequestHead {
        RequestHead::from_request(self)
    }
}

/// Copies the request head, extensions included
pub(crate) fn clone_parts(parts: &Parts) -> Parts {
    let (mut head, _) = Request::new(()).into_parts();
    head.method = parts.method.clone();
    head.uri = parts.uri.clone();
    head.version = parts.version;
    head.headers = parts.headers.clone();
    head.extensions = parts.extensions.clone();
    head
}

/// A cheap to clone snapshot of the request head: method, URI, version, headers and extensions
///
/// It's what `on_send`, `on_error` and `on_request_abort` hooks receive,
/// since by the time they run the request itself has been consumed.
#[derive(Debug, Clone)]
pub struct RequestHead {
    inner: Arc<Parts>
}

impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Arc::new(parts) }
    }
}

impl RequestHead {
    #[inline]
    pub(crate) fn from_request(req: &HttpRequest) -> Self {
        let (parts, _) = req.slim().into_parts();
        parts.into()
    }

    /// Returns the underlying request parts
    #[inline]
    pub(crate) fn parts(&self) -> &Parts {
        &self.inner
    }

    /// Returns the HTTP method
    #[inline]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Returns the request URI
    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Returns the HTTP version
    #[inline]
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// Returns the request headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Returns the request extensions as they were when the snapshot was taken
    #[inline]
    pub fn extensions(&self) -> &Extensions {
        &self.inner.extensions
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use crate::http::endpoints::route::PathArg;
    use super::*;

    #[tokio::test]
    async fn it_unwraps_body() {
        let req = Request::get("http://localhost/")
            .body(HttpBody::full("foo"))
            .unwrap();

        let http_req = HttpRequest::new(req);

        let body = http_req
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();

        assert_eq!(String::from_utf8_lossy(&body), "foo");
    }

    #[tokio::test]
    async fn it_limits_body() {
        let req = Request::post("/")
            .body(HttpBody::full("a long enough body"))
            .unwrap();

        let http_req = HttpRequest::new(req).into_limited(RequestBodyLimit::Enabled(4));

        assert_eq!(http_req.body_limit(), Some(4));

        let err = http_req.into_body().into_bytes().await.unwrap_err();

        assert_eq!(err.status, 413);
    }

    #[test]
    fn it_debugs() {
        let req = HttpRequest::new(Request::get("/")
            .body(HttpBody::empty())
            .unwrap());

        assert_eq!(format!("{req:?}"), "HttpRequest(..)");
    }

    #[test]
    fn it_splits_into_parts() {
        let req = HttpRequest::new(Request::get("/test")
            .body(HttpBody::empty())
            .unwrap());

        let (parts, _) = req.into_parts();

        assert_eq!(parts.uri, "/test")
    }

    #[test]
    fn it_returns_path_args() {
        let args: PathArgs = smallvec::smallvec![
            PathArg { name: "id".into(), value: "123".into() },
            PathArg { name: "name".into(), value: "John".into() }
        ];

        let req = HttpRequest::new(Request::get("/")
            .extension(args)
            .body(HttpBody::empty())
            .unwrap());

        let args = req.path_args().collect::<Vec<_>>();

        assert_eq!(args, vec![("id", "123"), ("name", "John")]);
    }

    #[test]
    fn it_takes_head_snapshot() {
        let mut req = HttpRequest::new(Request::post("/users?page=1")
            .header("x-api-key", "secret")
            .extension(42u32)
            .body(HttpBody::empty())
            .unwrap());

        let head = req.head();
        req.headers_mut().clear();

        assert_eq!(head.method(), Method::POST);
        assert_eq!(head.uri().path(), "/users");
        assert_eq!(head.headers().get("x-api-key").unwrap(), "secret");
        assert_eq!(head.extensions().get::<u32>(), Some(&42));
    }
}
