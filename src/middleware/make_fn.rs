//! Adapters that turn user closures into [`MiddlewareFn`]

use std::{future::Future, sync::Arc};
use crate::{
    error::Error,
    http::{FromRequest, GenericHandler, IntoResponse, FilterResult},
    HttpRequest,
    HttpResponse,
    HttpResult,
};
use super::{HttpContext, MiddlewareFn, Next};

/// Result of a request transformation in the before phase
pub trait IntoTapResult {
    /// Converts into the transformed request or an error
    fn into_tap_result(self) -> Result<HttpRequest, Error>;
}

impl IntoTapResult for HttpRequest {
    #[inline]
    fn into_tap_result(self) -> Result<HttpRequest, Error> {
        Ok(self)
    }
}

impl<E: Into<Error>> IntoTapResult for Result<HttpRequest, E> {
    #[inline]
    fn into_tap_result(self) -> Result<HttpRequest, Error> {
        self.map_err(Into::into)
    }
}

/// Wraps a closure into [`MiddlewareFn`]
#[inline]
pub(super) fn make_fn<F, Fut>(middleware: F) -> MiddlewareFn
where
    F: Fn(HttpContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResult> + Send + 'static,
{
    Arc::new(move |ctx: HttpContext, next: Next| Box::pin(middleware(ctx, next)))
}

/// Before phase: transforms the request and passes it on
#[inline]
pub(super) fn make_tap_req_fn<F, Fut>(tap: F) -> MiddlewareFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoTapResult,
{
    let tap = Arc::new(tap);
    make_fn(move |ctx: HttpContext, next: Next| {
        let tap = tap.clone();
        async move {
            let (req, pipeline) = ctx.into_parts();
            let req = tap(req).await.into_tap_result()?;
            next(HttpContext::from_parts(req, pipeline)).await
        }
    })
}

/// After phase: maps a successful response
#[inline]
pub(super) fn make_map_ok_fn<F, Fut, R>(map: F) -> MiddlewareFn
where
    F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let map = Arc::new(map);
    make_fn(move |ctx: HttpContext, next: Next| {
        let map = map.clone();
        async move {
            let resp = next(ctx).await?;
            map(resp).await.into_response()
        }
    })
}

/// Maps an error produced further down the pipeline
#[inline]
pub(super) fn make_map_err_fn<F, Fut, R>(map: F) -> MiddlewareFn
where
    F: Fn(Error) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let map = Arc::new(map);
    make_fn(move |ctx: HttpContext, next: Next| {
        let map = map.clone();
        async move {
            match next(ctx).await {
                Ok(resp) => Ok(resp),
                Err(err) => map(err).await.into_response(),
            }
        }
    })
}

/// Maps the pipeline result regardless of whether it's a response or an error
#[inline]
pub(super) fn make_with_fn<F, Fut, R>(map: F) -> MiddlewareFn
where
    F: Fn(HttpResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse,
{
    let map = Arc::new(map);
    make_fn(move |ctx: HttpContext, next: Next| {
        let map = map.clone();
        async move {
            let result = next(ctx).await;
            map(result).await.into_response()
        }
    })
}

/// Runs the predicate over arguments extracted from the request head
/// and stops the pipeline with `400` if it doesn't hold
#[inline]
pub(super) fn make_filter_fn<F, R, Args>(filter: F) -> MiddlewareFn
where
    F: GenericHandler<Args, Output = R>,
    R: Into<FilterResult>,
    Args: FromRequest + Send + 'static,
{
    make_fn(move |ctx: HttpContext, next: Next| {
        let filter = filter.clone();
        async move {
            let args = Args::from_request(ctx.request.slim()).await?;
            let result: FilterResult = filter.call(args).await.into();
            result.into_inner()?;
            next(ctx).await
        }
    })
}
