//! # Route tree
//!
//! A trie of path segments. Every node keeps its static children in a sorted
//! `SmallVec` searched with `binary_search_by`, plus at most one parameter child
//! (`:id` or `{id}`) and at most one catch-all child (`*` or `{*rest}`).
//!
//! Lookup prefers static segments, then parameters, then the catch-all,
//! and backtracks when a more specific branch fails deeper in the tree.

use hyper::Method;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::{
    middleware::{HttpContext, Middlewares, MiddlewareFn, Next},
    utils::str::memchr_split_nonempty,
    status
};
use super::handlers::RouteHandler;

pub(crate) use path_args::{PathArgs, PathArg, make_query_str};

pub(crate) mod path_args;

const PATH_SEPARATOR: u8 = b'/';
const DEFAULT_DEPTH: usize = 4;
const WILDCARD: &str = "*";

/// Handler and route-level middleware registered for a single method
pub(crate) struct RouteEndpoint {
    method: Method,
    handler: Option<RouteHandler>,
    middlewares: Middlewares,
    composed: Option<Next>,
}

struct RouteEntry {
    path: Box<str>,
    node: Box<RouteNode>
}

#[derive(Default)]
pub(crate) struct RouteNode {
    handlers: SmallVec<[RouteEndpoint; DEFAULT_DEPTH]>,
    static_routes: SmallVec<[RouteEntry; DEFAULT_DEPTH]>,
    param_route: Option<RouteEntry>,
    wildcard_route: Option<RouteEntry>,
}

/// A node with at least one handler and the parameters captured on the way to it
pub(crate) struct RouteParams<'route> {
    pub(crate) route: &'route RouteNode,
    pub(crate) params: PathArgs
}

enum Segment<'a> {
    Static(&'a str),
    Param(&'a str),
    Wildcard(&'a str),
}

impl RouteEntry {
    #[inline]
    fn new(path: &str) -> Self {
        Self {
            node: Box::default(),
            path: path.into()
        }
    }

    #[inline(always)]
    fn cmp(&self, path: &str) -> std::cmp::Ordering {
        self.path
            .as_ref()
            .cmp(path)
    }
}

impl RouteEndpoint {
    #[inline]
    fn new(method: Method) -> Self {
        Self {
            method,
            handler: None,
            middlewares: Middlewares::new(),
            composed: None,
        }
    }

    #[inline(always)]
    fn cmp(&self, method: &Method) -> std::cmp::Ordering {
        method_order(&self.method).cmp(&method_order(method))
    }

    /// Returns the composed pipeline: route middleware around the handler
    #[inline]
    pub(crate) fn pipeline(&self) -> Next {
        match &self.composed {
            Some(next) => next.clone(),
            None => self.compose_pipeline(),
        }
    }

    fn compose_pipeline(&self) -> Next {
        let terminal: Next = match self.handler.clone() {
            Some(handler) => Arc::new(move |ctx: HttpContext| {
                let handler = handler.clone();
                Box::pin(async move { handler.call(ctx.request).await })
            }),
            None => Arc::new(|_: HttpContext| Box::pin(async { status!(405) })),
        };
        self.middlewares.compose(terminal)
    }
}

impl RouteNode {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for the `method` and `path`
    ///
    /// Registering the same method and path twice replaces the handler.
    pub(crate) fn insert(&mut self, path: &str, method: Method, handler: RouteHandler) {
        self.endpoint_mut(path, method).handler = Some(handler);
    }

    /// Adds a route-level middleware for the `method` and `path`
    pub(crate) fn insert_layer(&mut self, path: &str, method: Method, middleware: MiddlewareFn) {
        self.endpoint_mut(path, method).middlewares.add(middleware);
    }

    /// Looks the path up, preferring static segments over parameters over the catch-all
    ///
    /// Accepts the first node that has a handler for any method.
    #[inline]
    pub(crate) fn find(&self, path: &str) -> Option<RouteParams<'_>> {
        self.find_by(path, RouteNode::has_handlers)
    }

    /// Looks the path up accepting only nodes that serve the `method`
    ///
    /// A node that exists for other methods only doesn't stop the search,
    /// so `DELETE /users/me` still reaches `DELETE /users/:id` next to `GET /users/me`.
    /// `HEAD` is served by a `GET` handler.
    #[inline]
    pub(crate) fn find_for(&self, method: &Method, path: &str) -> Option<RouteParams<'_>> {
        self.find_by(path, |node| node.endpoint_for(method).is_some())
    }

    fn find_by<F>(&self, path: &str, accept: F) -> Option<RouteParams<'_>>
    where
        F: Fn(&RouteNode) -> bool + Copy
    {
        let segments = split_with_offsets(path);
        let mut params = PathArgs::new();
        let route = self.find_node(path, &segments, &mut params, accept)?;
        Some(RouteParams { route, params })
    }

    /// Returns the endpoint registered for the method, if any
    #[inline]
    pub(crate) fn handler(&self, method: &Method) -> Option<&RouteEndpoint> {
        let i = self.handlers.binary_search_by(|h| h.cmp(method)).ok()?;
        self.handlers[i].handler.as_ref()?;
        Some(&self.handlers[i])
    }

    /// Same as [`RouteNode::handler`], but a `HEAD` request falls back to the `GET` handler
    #[inline]
    pub(crate) fn endpoint_for(&self, method: &Method) -> Option<&RouteEndpoint> {
        self.handler(method).or_else(|| match *method {
            Method::HEAD => self.handler(&Method::GET),
            _ => None,
        })
    }

    /// Builds the `Allow` header value
    ///
    /// `HEAD` is listed whenever `GET` is, since it's served by the `GET` handler.
    pub(crate) fn allowed(&self) -> String {
        let mut methods = self.handlers
            .iter()
            .filter(|h| h.handler.is_some())
            .map(|h| h.method.as_str())
            .collect::<SmallVec<[&str; 8]>>();

        if methods.contains(&Method::GET.as_str()) && !methods.contains(&Method::HEAD.as_str()) {
            methods.push(Method::HEAD.as_str());
        }
        methods.join(", ")
    }

    /// Composes middleware around every handler once routes are frozen
    pub(crate) fn compose(&mut self) {
        for endpoint in self.handlers.iter_mut() {
            endpoint.composed = Some(endpoint.compose_pipeline());
        }
        for route in self.static_routes.iter_mut() {
            route.node.compose();
        }
        if let Some(route) = self.param_route.as_mut() {
            route.node.compose();
        }
        if let Some(route) = self.wildcard_route.as_mut() {
            route.node.compose();
        }
    }

    #[inline]
    fn has_handlers(&self) -> bool {
        self.handlers.iter().any(|h| h.handler.is_some())
    }

    fn find_node<'r, F>(
        &'r self,
        path: &str,
        segments: &[(usize, &str)],
        params: &mut PathArgs,
        accept: F
    ) -> Option<&'r RouteNode>
    where
        F: Fn(&RouteNode) -> bool + Copy
    {
        let Some(((offset, segment), rest)) = segments.split_first() else {
            if accept(self) {
                return Some(self);
            }
            return self.match_wildcard("", params, accept);
        };

        if let Ok(i) = self.static_routes.binary_search_by(|r| r.cmp(segment)) {
            if let Some(found) = self.static_routes[i].node.find_node(path, rest, params, accept) {
                return Some(found);
            }
        }

        if let Some(param) = &self.param_route {
            let len = params.len();
            params.push(PathArg {
                name: param.path.clone(),
                value: (*segment).into()
            });
            if let Some(found) = param.node.find_node(path, rest, params, accept) {
                return Some(found);
            }
            params.truncate(len);
        }

        self.match_wildcard(path[*offset..].trim_end_matches('/'), params, accept)
    }

    #[inline]
    fn match_wildcard<'r, F>(&'r self, value: &str, params: &mut PathArgs, accept: F) -> Option<&'r RouteNode>
    where
        F: Fn(&RouteNode) -> bool
    {
        let wildcard = self.wildcard_route.as_ref()?;
        if !accept(wildcard.node.as_ref()) {
            return None;
        }
        params.push(PathArg {
            name: wildcard.path.clone(),
            value: value.into()
        });
        Some(wildcard.node.as_ref())
    }

    fn endpoint_mut(&mut self, path: &str, method: Method) -> &mut RouteEndpoint {
        let mut current = self;
        for segment in split_path(path) {
            current = match parse_segment(segment) {
                Segment::Static(segment) => current.insert_static_node(segment),
                Segment::Param(name) => Self::insert_entry(&mut current.param_route, name),
                // anything after a catch-all can never match
                Segment::Wildcard(name) => {
                    current = Self::insert_entry(&mut current.wildcard_route, name);
                    break;
                }
            };
        }

        let i = match current.handlers.binary_search_by(|r| r.cmp(&method)) {
            Ok(i) => i,
            Err(i) => {
                current.handlers.insert(i, RouteEndpoint::new(method));
                i
            }
        };
        &mut current.handlers[i]
    }

    #[inline(always)]
    fn insert_static_node(&mut self, segment: &str) -> &mut Self {
        let i = match self.static_routes.binary_search_by(|r| r.cmp(segment)) {
            Ok(i) => i,
            Err(i) => {
                self.static_routes.insert(i, RouteEntry::new(segment));
                i
            }
        };
        &mut self.static_routes[i].node
    }

    #[inline(always)]
    fn insert_entry<'a>(entry: &'a mut Option<RouteEntry>, name: &str) -> &'a mut Self {
        entry
            .get_or_insert_with(|| RouteEntry::new(name))
            .node
            .as_mut()
    }
}

fn parse_segment(segment: &str) -> Segment<'_> {
    if segment == WILDCARD {
        return Segment::Wildcard(WILDCARD);
    }
    if let Some(name) = segment.strip_prefix(':') {
        return Segment::Param(name);
    }
    match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(name) => match name.strip_prefix('*') {
            Some("") => Segment::Wildcard(WILDCARD),
            Some(name) => Segment::Wildcard(name),
            None => Segment::Param(name),
        },
        None => Segment::Static(segment),
    }
}

#[inline(always)]
fn split_path(path: &str) -> impl Iterator<Item = &str> {
    memchr_split_nonempty(PATH_SEPARATOR, path.as_bytes())
        .filter_map(|s| std::str::from_utf8(s).ok())
}

/// Splits the path into non-empty segments keeping their byte offsets,
/// so that a catch-all can take the rest of the path as is
fn split_with_offsets(path: &str) -> SmallVec<[(usize, &str); 8]> {
    let mut segments = SmallVec::new();
    let mut offset = 0;
    for segment in path.split('/') {
        if !segment.is_empty() {
            segments.push((offset, segment));
        }
        offset += segment.len() + 1;
    }
    segments
}

#[inline(always)]
fn method_order(method: &Method) -> u8 {
    match *method {
        Method::GET => 0,
        Method::POST => 1,
        Method::PUT => 2,
        Method::DELETE => 3,
        Method::PATCH => 4,
        Method::OPTIONS => 5,
        Method::HEAD => 6,
        Method::CONNECT => 7,
        Method::TRACE => 8,
        _ => 255,
    }
}
