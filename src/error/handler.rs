//! Error Handler

use futures_util::future::BoxFuture;
use crate::{http::IntoResponse, HttpResult, RequestHead, status};
use super::Error;

use std::{
    future::Future,
    sync::Arc
};

/// Trait for types that represents an error handler
pub trait ErrorHandler {
    /// Turns an error into a response
    fn call(&self, err: Error) -> BoxFuture<'_, HttpResult>;
}

/// Owns a closure that handles an error
#[derive(Debug)]
pub struct ErrorFunc<F>(pub(crate) F);

impl<F, R, Fut> ErrorHandler for ErrorFunc<F>
where
    F: Fn(Error) -> Fut + Send + Sync,
    R: IntoResponse,
    Fut: Future<Output = R> + Send,
{
    #[inline]
    fn call(&self, err: Error) -> BoxFuture<'_, HttpResult> {
        Box::pin(async move {
            match self.0(err).await.into_response() {
                Ok(resp) => Ok(resp),
                Err(err) => default_error_handler(err).await,
            }
        })
    }
}

impl<F, R, Fut> From<ErrorFunc<F>> for PipelineErrorHandler
where
    F: Fn(Error) -> Fut + Send + Sync + 'static,
    R: IntoResponse,
    Fut: Future<Output = R> + Send
{
    #[inline]
    fn from(func: ErrorFunc<F>) -> Self {
        Arc::new(func)
    }
}

/// Holds a reference to global error handler
pub(crate) type PipelineErrorHandler = Arc<
    dyn ErrorHandler
    + Send
    + Sync
>;

/// Default error handler that replies with the error status and its message
#[inline]
pub(crate) async fn default_error_handler(err: Error) -> HttpResult {
    status!(err.status.as_u16(), text: err)
}

/// Stamps the request path onto the error and hands it over to the error handler
#[inline]
pub(crate) async fn call_error_handler(
    error_handler: &PipelineErrorHandler,
    head: &RequestHead,
    mut err: Error
) -> HttpResult {
    if err.instance.is_none() {
        err.instance = Some(head.uri().path().into());
    }
    error_handler.call(err).await
}
