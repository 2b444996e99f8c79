//! Global middleware, route table and error handling assembled into a request pipeline

use std::sync::Arc;

use crate::{
    error::{
        ErrorFunc,
        fallback::default_fallback_handler,
        handler::{PipelineErrorHandler, default_error_handler}
    },
    http::endpoints::{Endpoints, handlers::{Func, RouteHandler}},
    middleware::{HttpContext, Middlewares, Next},
    HttpRequest,
    HttpResult
};

/// Collects everything the pipeline is made of while the app is being configured
pub(crate) struct PipelineBuilder {
    middlewares: Middlewares,
    endpoints: Endpoints,
    error_handler: PipelineErrorHandler,
    fallback_handler: RouteHandler
}

impl std::fmt::Debug for PipelineBuilder {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PipelineBuilder(..)")
    }
}

/// The frozen request pipeline shared by all connections
pub(crate) struct Pipeline {
    start: Next,
    endpoints: Endpoints,
    error_handler: PipelineErrorHandler,
    fallback_handler: RouteHandler
}

impl PipelineBuilder {
    pub(crate) fn new() -> Self {
        Self {
            middlewares: Middlewares::new(),
            endpoints: Endpoints::new(),
            error_handler: ErrorFunc(default_error_handler).into(),
            fallback_handler: Func::new(default_fallback_handler)
        }
    }

    /// Composes the global middleware around the route dispatch and every route pipeline
    pub(crate) fn build(mut self) -> Pipeline {
        let dispatch: Next = Arc::new(|ctx: HttpContext| Box::pin(ctx.execute()));
        let start = self.middlewares.compose(dispatch);
        self.endpoints.compose();
        Pipeline {
            start,
            endpoints: self.endpoints,
            error_handler: self.error_handler,
            fallback_handler: self.fallback_handler,
        }
    }

    #[inline]
    pub(crate) fn middlewares_mut(&mut self) -> &mut Middlewares {
        &mut self.middlewares
    }

    #[inline]
    pub(crate) fn endpoints_mut(&mut self) -> &mut Endpoints {
        &mut self.endpoints
    }

    #[inline]
    #[allow(dead_code)]
    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[inline]
    pub(crate) fn set_error_handler(&mut self, handler: PipelineErrorHandler) {
        self.error_handler = handler;
    }

    #[inline]
    pub(crate) fn set_fallback_handler(&mut self, handler: RouteHandler) {
        self.fallback_handler = handler;
    }
}

impl Pipeline {
    #[inline]
    pub(crate) fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    #[inline]
    pub(crate) fn error_handler(&self) -> &PipelineErrorHandler {
        &self.error_handler
    }

    /// Handles a request that matched no route
    #[inline]
    pub(crate) async fn fallback(&self, req: HttpRequest) -> HttpResult {
        self.fallback_handler.call(req).await
    }

    /// Runs the global middleware chain, which ends with the route pipeline of the context
    #[inline]
    pub(crate) async fn execute(&self, ctx: HttpContext) -> HttpResult {
        (self.start)(ctx).await
    }
}
