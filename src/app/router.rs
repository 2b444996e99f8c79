//! Route mapping helpers

use hyper::Method;
use smallvec::{smallvec, SmallVec};
use std::ops::{Deref, DerefMut};

use crate::App;
use crate::http::IntoResponse;
use crate::http::endpoints::{
    args::FromRequest,
    handlers::{Func, GenericHandler, RouteHandler},
};
use crate::middleware::MiddlewareFn;

/// Every method `map_all` registers a handler for
const ALL_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::HEAD,
    Method::CONNECT,
    Method::TRACE,
];

/// A route that has just been mapped
///
/// Route middleware added through it runs inside the global middleware chain.
/// It dereferences to [`App`], so mapping calls can be chained.
pub struct Route<'a> {
    pub(crate) app: &'a mut App,
    pub(crate) methods: SmallVec<[Method; 1]>,
    pub(crate) pattern: String,
}

/// A group of routes sharing a path prefix and middleware
///
/// Group middleware applies to the routes mapped after it has been added.
pub struct RouteGroup<'a> {
    pub(crate) app: &'a mut App,
    pub(crate) prefix: String,
    pub(crate) middleware: Vec<MiddlewareFn>,
}

impl std::fmt::Debug for Route<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl std::fmt::Debug for RouteGroup<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteGroup")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl Deref for Route<'_> {
    type Target = App;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.app
    }
}

impl DerefMut for Route<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.app
    }
}

impl Route<'_> {
    /// Adds a middleware to every method of this route
    #[inline]
    pub(crate) fn map_middleware(self, middleware: MiddlewareFn) -> Self {
        let endpoints = self.app.pipeline.endpoints_mut();
        for method in self.methods.iter() {
            endpoints.map_layer(method.clone(), &self.pattern, middleware.clone());
        }
        self
    }
}

macro_rules! define_map_methods {
    ($($name:ident => $method:expr),* $(,)?) => {
        impl App {
            $(
            #[doc = concat!("Adds a request handler that matches HTTP ", stringify!($method), " requests for the specified pattern.")]
            ///
            /// Patterns may contain parameters (`:name` or `{name}`) and a trailing
            /// catch-all wildcard (`*` or `{*name}`).
            pub fn $name<F, R, Args>(&mut self, pattern: &str, handler: F) -> Route<'_>
            where
                F: GenericHandler<Args, Output = R>,
                R: IntoResponse + 'static,
                Args: FromRequest + Send + Sync + 'static
            {
                self.map_route(smallvec![$method], pattern, Func::new(handler))
            }
            )*
        }

        impl RouteGroup<'_> {
            $(
            #[doc = concat!("See [`App::", stringify!($name), "`] for more details.")]
            pub fn $name<F, R, Args>(&mut self, pattern: &str, handler: F) -> &mut Self
            where
                F: GenericHandler<Args, Output = R>,
                R: IntoResponse + 'static,
                Args: FromRequest + Send + Sync + 'static
            {
                let pattern = [self.prefix.as_str(), pattern].concat();
                let route = self.app.$name(&pattern, handler);
                self.middleware
                    .iter()
                    .fold(route, |route, middleware| route.map_middleware(middleware.clone()));
                self
            }
            )*
        }
    };
}

define_map_methods! {
    map_get => Method::GET,
    map_post => Method::POST,
    map_put => Method::PUT,
    map_patch => Method::PATCH,
    map_delete => Method::DELETE,
    map_head => Method::HEAD,
    map_options => Method::OPTIONS,
}

impl App {
    /// Adds a request handler for every standard HTTP method
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, http::Method, ok};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_all("/echo/*", |method: Method| async move {
    ///     ok!("{method}")
    /// });
    /// ```
    pub fn map_all<F, R, Args>(&mut self, pattern: &str, handler: F) -> Route<'_>
    where
        F: GenericHandler<Args, Output = R>,
        R: IntoResponse + 'static,
        Args: FromRequest + Send + Sync + 'static
    {
        self.map_route(SmallVec::from_iter(ALL_METHODS), pattern, Func::new(handler))
    }

    /// Maps a group of routes under a common prefix
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, ok};
    ///
    /// let mut app = App::new();
    ///
    /// app.group("/users", |users| {
    ///     users.tap_req(|req: mortar::HttpRequest| async move { req });
    ///     users.map_get("/:id", |id: u32| async move { ok!("user {id}") });
    ///     users.map_delete("/:id", |id: u32| async move { ok!("deleted {id}") });
    /// });
    /// ```
    pub fn group<F>(&mut self, prefix: &str, setup: F) -> &mut Self
    where
        F: FnOnce(&mut RouteGroup<'_>)
    {
        let mut group = RouteGroup {
            app: self,
            prefix: prefix.trim_end_matches('/').to_owned(),
            middleware: Vec::new(),
        };
        setup(&mut group);
        self
    }

    #[inline]
    pub(crate) fn map_route(
        &mut self,
        methods: SmallVec<[Method; 1]>,
        pattern: &str,
        handler: RouteHandler
    ) -> Route<'_> {
        let endpoints = self.pipeline.endpoints_mut();
        for method in methods.iter() {
            endpoints.map_route(method.clone(), pattern, handler.clone());
        }
        Route { app: self, methods, pattern: pattern.to_owned() }
    }
}

impl RouteGroup<'_> {
    /// See [`App::map_all`] for more details.
    pub fn map_all<F, R, Args>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: GenericHandler<Args, Output = R>,
        R: IntoResponse + 'static,
        Args: FromRequest + Send + Sync + 'static
    {
        let pattern = [self.prefix.as_str(), pattern].concat();
        let mut route = self.app.map_all(&pattern, handler);
        for middleware in self.middleware.iter() {
            route = route.map_middleware(middleware.clone());
        }
        self
    }
}
