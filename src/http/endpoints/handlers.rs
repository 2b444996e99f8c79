//! Request handler abstractions

use std::{sync::Arc, future::Future, marker::PhantomData};
use futures_util::future::BoxFuture;
use crate::{HttpResult, HttpRequest};
use crate::http::{
    endpoints::args::FromRequest,
    IntoResponse
};

/// A type-erased request handler shared between connections
pub(crate) type RouteHandler = Arc<
    dyn Handler
    + Send
    + Sync
>;

/// Turns a request into a response
pub(crate) trait Handler {
    fn call(&self, req: HttpRequest) -> BoxFuture<'_, HttpResult>;
}

/// Adapts a [`GenericHandler`] to [`Handler`] by extracting its arguments from the request
pub(crate) struct Func<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromRequest
{
    func: F,
    _marker: PhantomData<fn(Args)>,
}

impl<F, R, Args> Func<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromRequest
{
    #[inline]
    pub(crate) fn new(func: F) -> Arc<Self> {
        Arc::new(Self { func, _marker: PhantomData })
    }
}

impl<F, R, Args> Handler for Func<F, R, Args>
where
    F: GenericHandler<Args, Output = R>,
    R: IntoResponse,
    Args: FromRequest + Send
{
    #[inline]
    fn call(&self, req: HttpRequest) -> BoxFuture<'_, HttpResult> {
        Box::pin(async move {
            let args = Args::from_request(req).await?;
            self.func
                .call(args)
                .await
                .into_response()
        })
    }
}

/// An async function that takes a tuple of extractors
///
/// Implemented for closures of up to 10 arguments.
pub trait GenericHandler<Args>: Clone + Send + Sync + 'static {
    /// Handler's result type
    type Output;
    /// Future returned by the handler
    type Future: Future<Output = Self::Output> + Send;

    /// Calls the handler with the extracted arguments
    fn call(&self, args: Args) -> Self::Future;
}

macro_rules! define_generic_handler ({ $($param:ident)* } => {
    impl<Func, Fut: Send, $($param,)*> GenericHandler<($($param,)*)> for Func
    where
        Func: Fn($($param),*) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future,
    {
        type Output = Fut::Output;
        type Future = Fut;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Future {
            (self)($($param,)*)
        }
    }
});

define_generic_handler! {}
define_generic_handler! { T1 }
define_generic_handler! { T1 T2 }
define_generic_handler! { T1 T2 T3 }
define_generic_handler! { T1 T2 T3 T4 }
define_generic_handler! { T1 T2 T3 T4 T5 }
define_generic_handler! { T1 T2 T3 T4 T5 T6 }
define_generic_handler! { T1 T2 T3 T4 T5 T6 T7 }
define_generic_handler! { T1 T2 T3 T4 T5 T6 T7 T8 }
define_generic_handler! { T1 T2 T3 T4 T5 T6 T7 T8 T9 }
define_generic_handler! { T1 T2 T3 T4 T5 T6 T7 T8 T9 T10 }
