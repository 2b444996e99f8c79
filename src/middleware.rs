//! Middleware tools
//!
//! Middleware is registered globally on [`App`], on a [`RouteGroup`] or on a single [`Route`].
//! Global middleware runs first, in registration order. Group and route middleware
//! run inside it, right around the handler.

use futures_util::future::BoxFuture;
use std::{future::Future, sync::Arc};
use make_fn::*;

use crate::{
    app::router::{Route, RouteGroup},
    error::Error,
    http::{FilterResult, FromRequest, GenericHandler, IntoResponse},
    App,
    HttpRequest,
    HttpResponse,
    HttpResult,
};

pub use http_context::HttpContext;
pub use make_fn::IntoTapResult;

pub mod http_context;
mod make_fn;
#[cfg(feature = "decompression")]
pub(crate) mod decompress;
#[cfg(feature = "cors")]
pub mod cors;
#[cfg(feature = "etag")]
pub mod etag;
#[cfg(feature = "cookie")]
pub mod cookie_parser;
#[cfg(feature = "multipart")]
pub mod multer;

const DEFAULT_MW_CAPACITY: usize = 8;

/// Points to the next middleware or the request handler
pub type Next = Arc<
    dyn Fn(HttpContext) -> BoxFuture<'static, HttpResult>
    + Send
    + Sync
>;

/// Points to a middleware function
pub(crate) type MiddlewareFn = Arc<
    dyn Fn(HttpContext, Next) -> BoxFuture<'static, HttpResult>
    + Send
    + Sync
>;

/// Middleware pipeline
#[derive(Clone)]
pub(crate) struct Middlewares {
    pipeline: Vec<MiddlewareFn>
}

impl Middlewares {
    /// Initializes a new middleware pipeline
    pub(crate) fn new() -> Self {
        Self { pipeline: Vec::with_capacity(DEFAULT_MW_CAPACITY) }
    }

    /// Adds middleware function to the pipeline
    #[inline]
    pub(crate) fn add(&mut self, middleware: MiddlewareFn) {
        self.pipeline.push(middleware);
    }

    /// Chains the middleware in registration order, ending with `terminal`
    pub(crate) fn compose(&self, terminal: Next) -> Next {
        self.pipeline
            .iter()
            .rev()
            .fold(terminal, |next, mw| {
                let mw = mw.clone();
                Arc::new(move |ctx: HttpContext| mw(ctx, next.clone()))
            })
    }
}

/// Global middleware
impl App {
    /// Adds a middleware to the application request pipeline
    ///
    /// The middleware may reply on its own without calling `next`,
    /// in which case the rest of the pipeline and the handler are skipped.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, status, middleware::{HttpContext, Next}};
    ///
    /// let mut app = App::new();
    ///
    /// app.wrap(|ctx: HttpContext, next: Next| async move {
    ///     if ctx.headers().contains_key("x-api-key") {
    ///         next(ctx).await
    ///     } else {
    ///         status!(401)
    ///     }
    /// });
    /// ```
    pub fn wrap<F, Fut>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(HttpContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult> + Send + 'static,
    {
        self.pipeline
            .middlewares_mut()
            .add(make_fn(middleware));
        self
    }

    /// Adds a before-phase middleware that transforms the request
    ///
    /// The closure may return either the request or `Result<HttpRequest, E>`.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpRequest, headers::HeaderValue};
    ///
    /// let mut app = App::new();
    ///
    /// app.tap_req(|mut req: HttpRequest| async move {
    ///     req.headers_mut().insert("x-tapped", HeaderValue::from_static("1"));
    ///     req
    /// });
    /// ```
    pub fn tap_req<F, Fut>(&mut self, tap: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoTapResult,
    {
        self.pipeline
            .middlewares_mut()
            .add(make_tap_req_fn(tap));
        self
    }

    /// Adds an after-phase middleware that maps successful responses
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpResponse, headers::HeaderValue};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_ok(|mut resp: HttpResponse| async move {
    ///     resp.headers_mut().insert("x-version", HeaderValue::from_static("1"));
    ///     resp
    /// });
    /// ```
    pub fn map_ok<F, Fut, R>(&mut self, map: F) -> &mut Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.pipeline
            .middlewares_mut()
            .add(make_map_ok_fn(map));
        self
    }

    /// Adds a middleware that maps the pipeline result, whether it's a response or an error
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpResult, status};
    ///
    /// let mut app = App::new();
    ///
    /// app.with(|result: HttpResult| async move {
    ///     match result {
    ///         Ok(resp) => Ok(resp),
    ///         Err(_) => status!(503),
    ///     }
    /// });
    /// ```
    pub fn with<F, Fut, R>(&mut self, map: F) -> &mut Self
    where
        F: Fn(HttpResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.pipeline
            .middlewares_mut()
            .add(make_with_fn(map));
        self
    }

    /// Adds a predicate over request arguments to every route; a request that
    /// doesn't satisfy it is answered with `400`
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, headers::HeaderMap};
    ///
    /// let mut app = App::new();
    ///
    /// app.filter(|headers: HeaderMap| async move {
    ///     !headers.contains_key("x-banned")
    /// });
    /// ```
    pub fn filter<F, R, Args>(&mut self, filter: F) -> &mut Self
    where
        F: GenericHandler<Args, Output = R>,
        R: Into<FilterResult>,
        Args: FromRequest + Send + Sync + 'static
    {
        self.pipeline
            .middlewares_mut()
            .add(make_filter_fn(filter));
        self
    }
}

impl Route<'_> {
    /// Adds a middleware to this route
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, middleware::{HttpContext, Next}};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_get("/hello", || async { "Hello, World!" })
    ///     .wrap(|ctx: HttpContext, next: Next| async move { next(ctx).await });
    /// ```
    pub fn wrap<F, Fut>(self, middleware: F) -> Self
    where
        F: Fn(HttpContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult> + Send + 'static,
    {
        self.map_middleware(make_fn(middleware))
    }

    /// Adds a before-phase middleware to this route
    pub fn tap_req<F, Fut>(self, tap: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoTapResult,
    {
        self.map_middleware(make_tap_req_fn(tap))
    }

    /// Adds an after-phase middleware to this route
    pub fn map_ok<F, Fut, R>(self, map: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.map_middleware(make_map_ok_fn(map))
    }

    /// Maps errors produced by this route's handler
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, error::Error, status};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_get("/fail", || async { Err::<(), _>(Error::server_error("boom")) })
    ///     .map_err(|err: Error| async move { status!(503, text: err) });
    /// ```
    pub fn map_err<F, Fut, R>(self, map: F) -> Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.map_middleware(make_map_err_fn(map))
    }

    /// Maps the result of this route, whether it's a response or an error
    pub fn with<F, Fut, R>(self, map: F) -> Self
    where
        F: Fn(HttpResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.map_middleware(make_with_fn(map))
    }

    /// Adds a predicate over request arguments to this route
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    ///
    /// let mut app = App::new();
    ///
    /// app.map_get("/sum/:x/:y", |x: i32, y: i32| async move { format!("{}", x + y) })
    ///     .filter(|x: i32, y: i32| async move { x > 0 && y > 0 });
    /// ```
    pub fn filter<F, R, Args>(self, filter: F) -> Self
    where
        F: GenericHandler<Args, Output = R>,
        R: Into<FilterResult>,
        Args: FromRequest + Send + Sync + 'static
    {
        self.map_middleware(make_filter_fn(filter))
    }
}

impl RouteGroup<'_> {
    /// Adds a middleware to the routes of this group mapped after this call
    pub fn wrap<F, Fut>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(HttpContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult> + Send + 'static,
    {
        self.middleware.push(make_fn(middleware));
        self
    }

    /// Adds a before-phase middleware to this group
    pub fn tap_req<F, Fut>(&mut self, tap: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoTapResult,
    {
        self.middleware.push(make_tap_req_fn(tap));
        self
    }

    /// Adds an after-phase middleware to this group
    pub fn map_ok<F, Fut, R>(&mut self, map: F) -> &mut Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.middleware.push(make_map_ok_fn(map));
        self
    }

    /// Maps errors produced by the handlers of this group
    pub fn map_err<F, Fut, R>(&mut self, map: F) -> &mut Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.middleware.push(make_map_err_fn(map));
        self
    }

    /// Maps the result of the handlers of this group
    pub fn with<F, Fut, R>(&mut self, map: F) -> &mut Self
    where
        F: Fn(HttpResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse,
    {
        self.middleware.push(make_with_fn(map));
        self
    }

    /// Adds a predicate over request arguments to this group
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    ///
    /// let mut app = App::new();
    ///
    /// app.group("/positive", |api| {
    ///     api.filter(|x: i32, y: i32| async move { x > 0 && y > 0 });
    ///     api.map_get("/sum/:x/:y", |x: i32, y: i32| async move { format!("{}", x + y) });
    /// });
    /// ```
    pub fn filter<F, R, Args>(&mut self, filter: F) -> &mut Self
    where
        F: GenericHandler<Args, Output = R>,
        R: Into<FilterResult>,
        Args: FromRequest + Send + Sync + 'static
    {
        self.middleware.push(make_filter_fn(filter));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use crate::{HttpBody, HttpRequest, ok};
    use crate::http::Request;
    use super::*;

    fn record(log: Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> MiddlewareFn {
        Arc::new(move |ctx: HttpContext, next: Next| {
            log.lock().unwrap().push(name);
            next(ctx)
        })
    }

    #[tokio::test]
    async fn it_runs_middleware_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut middlewares = Middlewares::new();
        middlewares.add(record(log.clone(), "first"));
        middlewares.add(record(log.clone(), "second"));

        let terminal_log = log.clone();
        let terminal: Next = Arc::new(move |_: HttpContext| {
            terminal_log.lock().unwrap().push("handler");
            Box::pin(async { ok!() })
        });

        let start = middlewares.compose(terminal);
        let req = HttpRequest::new(Request::get("/").body(HttpBody::empty()).unwrap());
        start(HttpContext::slim(req)).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["first", "second", "handler"]);
    }

    #[tokio::test]
    async fn it_calls_terminal_without_middleware() {
        let start = Middlewares::new().compose(Arc::new(|_: HttpContext| Box::pin(async { ok!("done") })));
        let req = HttpRequest::new(Request::get("/").body(HttpBody::empty()).unwrap());

        let resp = start(HttpContext::slim(req)).await.unwrap();

        assert_eq!(resp.status(), 200);
    }
}
