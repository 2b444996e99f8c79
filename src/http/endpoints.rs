//! Endpoints mapping utilities

use hyper::Method;
use super::endpoints::{
    route::{RouteNode, PathArgs},
    handlers::RouteHandler
};
use crate::middleware::{MiddlewareFn, Next};

pub(crate) mod handlers;
pub(crate) mod route;
pub mod args;

/// Route table of the application
pub(crate) struct Endpoints {
    routes: RouteNode
}

/// Outcome of a route lookup
pub(crate) enum FindResult {
    /// No route matches the path
    RouteNotFound,
    /// The path matches, but not the method. Holds the `Allow` header value
    MethodNotFound(String),
    /// Matched endpoint
    Ok(Endpoint)
}

/// A composed route pipeline with the parameters captured from the path
pub(crate) struct Endpoint {
    pub(crate) pipeline: Next,
    pub(crate) params: PathArgs
}

impl Endpoints {
    #[inline]
    pub(crate) fn new() -> Self {
        Self { routes: RouteNode::new() }
    }

    /// Finds the endpoint for the method and path
    ///
    /// Only nodes serving the method are matched, and a `HEAD` request falls back
    /// to the `GET` handler. The `Allow` list comes from the node the path
    /// resolves to regardless of the method.
    pub(crate) fn find(&self, method: &Method, path: &str) -> FindResult {
        if let Some(route_params) = self.routes.find_for(method, path) {
            if let Some(endpoint) = route_params.route.endpoint_for(method) {
                return FindResult::Ok(Endpoint {
                    pipeline: endpoint.pipeline(),
                    params: route_params.params
                });
            }
        }

        match self.routes.find(path) {
            Some(route_params) => FindResult::MethodNotFound(route_params.route.allowed()),
            None => FindResult::RouteNotFound,
        }
    }

    #[inline]
    pub(crate) fn map_route(&mut self, method: Method, pattern: &str, handler: RouteHandler) {
        self.routes.insert(pattern, method, handler);
    }

    #[inline]
    pub(crate) fn map_layer(&mut self, method: Method, pattern: &str, middleware: MiddlewareFn) {
        self.routes.insert_layer(pattern, method, middleware);
    }

    #[inline]
    pub(crate) fn contains(&self, method: &Method, pattern: &str) -> bool {
        self.routes
            .find_for(method, pattern)
            .is_some_and(|params| params.route.handler(method).is_some())
    }

    #[inline]
    pub(crate) fn compose(&mut self) {
        self.routes.compose();
    }
}
