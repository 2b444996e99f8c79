//! Request scope passed through the middleware pipeline

use crate::{
    error::Error,
    headers::HeaderMap,
    http::{endpoints::args::FromRequestRef, Method, Uri, Version},
    HttpRequest,
    HttpResult,
    status
};
use super::Next;

/// Current HTTP request together with the route pipeline selected for it
pub struct HttpContext {
    /// Current HTTP request
    pub request: HttpRequest,
    /// Route middleware and handler matched for the request
    pipeline: Option<Next>
}

impl std::fmt::Debug for HttpContext {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HttpContext(..)")
    }
}

impl HttpContext {
    /// Creates a context that dispatches to a route pipeline
    #[inline]
    pub(crate) fn new(request: HttpRequest, pipeline: Next) -> Self {
        Self { request, pipeline: Some(pipeline) }
    }

    /// Creates a context without a route pipeline
    #[inline]
    pub(crate) fn slim(request: HttpRequest) -> Self {
        Self { request, pipeline: None }
    }

    /// Splits the context into the request and the route pipeline
    #[inline]
    pub(crate) fn into_parts(self) -> (HttpRequest, Option<Next>) {
        (self.request, self.pipeline)
    }

    /// Puts the context back together, e.g. after a request has been transformed
    #[inline]
    pub(crate) fn from_parts(request: HttpRequest, pipeline: Option<Next>) -> Self {
        Self { request, pipeline }
    }

    /// Returns the HTTP method
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, http::Method, middleware::{HttpContext, Next}};
    ///
    /// let mut app = App::new();
    ///
    /// app.wrap(|ctx: HttpContext, next: Next| async move {
    ///     if ctx.method() == Method::TRACE {
    ///         return mortar::status!(405);
    ///     }
    ///     next(ctx).await
    /// });
    /// ```
    #[inline]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the request URI
    #[inline]
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the HTTP version
    #[inline]
    pub fn version(&self) -> Version {
        self.request.version()
    }

    /// Returns the request headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Extracts a value from the request without consuming it
    #[inline]
    pub fn extract<T: FromRequestRef>(&self) -> Result<T, Error> {
        self.request.extract()
    }

    /// Runs the route pipeline for the request
    #[inline]
    pub async fn execute(mut self) -> HttpResult {
        match self.pipeline.take() {
            Some(pipeline) => pipeline(self).await,
            None => status!(404)
        }
    }
}
