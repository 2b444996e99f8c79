//! Request lifecycle hooks
//!
//! Hooks run outside the middleware pipeline at fixed points of the request lifecycle:
//!
//! `on_request` → routing → `pre_parsing` → body decoding → `pre_handler` → middleware
//! and handler → `on_error` (if failed) → `on_send`.

use futures_util::future::BoxFuture;
use std::{future::Future, net::SocketAddr, sync::Arc};

use crate::{
    error::Error,
    App,
    HttpRequest,
    HttpResponse,
    HttpResult,
    RequestHead
};

/// Outcome of a request-phase hook
#[derive(Debug)]
pub enum Flow {
    /// Continues processing with the (possibly modified) request
    Next(HttpRequest),
    /// Stops processing and sends this response
    Reply(HttpResponse),
}

impl From<HttpRequest> for Flow {
    #[inline]
    fn from(req: HttpRequest) -> Self {
        Self::Next(req)
    }
}

impl From<HttpResponse> for Flow {
    #[inline]
    fn from(resp: HttpResponse) -> Self {
        Self::Reply(resp)
    }
}

pub(crate) type RequestHook = Arc<
    dyn Fn(HttpRequest) -> BoxFuture<'static, Result<Flow, Error>>
    + Send
    + Sync
>;

pub(crate) type SendHook = Arc<
    dyn Fn(RequestHead, HttpResponse) -> BoxFuture<'static, HttpResult>
    + Send
    + Sync
>;

type ErrorHook = Arc<
    dyn Fn(RequestHead, Error) -> BoxFuture<'static, Error>
    + Send
    + Sync
>;

type AbortHook = Arc<
    dyn Fn(RequestHead) -> BoxFuture<'static, Result<(), Error>>
    + Send
    + Sync
>;

type ListenHook = Arc<dyn Fn(SocketAddr) -> BoxFuture<'static, ()> + Send + Sync>;

type CloseHook = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Request phases that take a request and may reply early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    OnRequest,
    PreParsing,
    PreHandler,
}

/// All hooks registered on the application
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    on_request: Vec<RequestHook>,
    pre_parsing: Vec<RequestHook>,
    pre_handler: Vec<RequestHook>,
    on_send: Vec<SendHook>,
    on_error: Vec<ErrorHook>,
    on_abort: Vec<AbortHook>,
    on_listen: Vec<ListenHook>,
    on_close: Vec<CloseHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_request", &self.on_request.len())
            .field("pre_parsing", &self.pre_parsing.len())
            .field("pre_handler", &self.pre_handler.len())
            .field("on_send", &self.on_send.len())
            .field("on_error", &self.on_error.len())
            .field("on_request_abort", &self.on_abort.len())
            .field("on_listen", &self.on_listen.len())
            .field("on_close", &self.on_close.len())
            .finish()
    }
}

impl Hooks {
    #[inline]
    pub(crate) fn add_request(&mut self, phase: Phase, hook: RequestHook) {
        match phase {
            Phase::OnRequest => self.on_request.push(hook),
            Phase::PreParsing => self.pre_parsing.push(hook),
            Phase::PreHandler => self.pre_handler.push(hook),
        }
    }

    #[inline]
    pub(crate) fn add_send(&mut self, hook: SendHook) {
        self.on_send.push(hook);
    }

    /// Runs the hooks of a request phase in registration order.
    ///
    /// Stops at the first hook that replies.
    pub(crate) async fn run(&self, phase: Phase, mut req: HttpRequest) -> Result<Flow, Error> {
        let hooks = match phase {
            Phase::OnRequest => &self.on_request,
            Phase::PreParsing => &self.pre_parsing,
            Phase::PreHandler => &self.pre_handler,
        };
        for hook in hooks {
            match hook(req).await? {
                Flow::Next(next) => req = next,
                reply @ Flow::Reply(_) => return Ok(reply),
            }
        }
        Ok(Flow::Next(req))
    }

    /// Passes the response through every `on_send` hook
    pub(crate) async fn run_send(&self, head: &RequestHead, mut resp: HttpResponse) -> HttpResult {
        for hook in self.on_send.iter() {
            resp = hook(head.clone(), resp).await?;
        }
        Ok(resp)
    }

    /// Passes the error through every `on_error` hook
    pub(crate) async fn run_error(&self, head: &RequestHead, mut err: Error) -> Error {
        for hook in self.on_error.iter() {
            err = hook(head.clone(), err).await;
        }
        err
    }

    #[inline]
    pub(crate) fn has_abort(&self) -> bool {
        !self.on_abort.is_empty()
    }

    /// Runs the `on_request_abort` hooks, a failed hook doesn't stop the rest
    pub(crate) async fn run_abort(&self, head: RequestHead) {
        for hook in self.on_abort.iter() {
            if let Err(_err) = hook(head.clone()).await {
                #[cfg(feature = "tracing")]
                tracing::warn!("on_request_abort hook failed: {_err}");
            }
        }
    }

    pub(crate) async fn run_listen(&self, addr: SocketAddr) {
        for hook in self.on_listen.iter() {
            hook(addr).await;
        }
    }

    pub(crate) async fn run_close(&self) {
        for hook in self.on_close.iter() {
            hook().await;
        }
    }
}

#[inline]
fn make_request_hook<F, Fut>(hook: F) -> RequestHook
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
{
    Arc::new(move |req: HttpRequest| Box::pin(hook(req)))
}

/// Lifecycle hooks
impl App {
    /// Adds a hook that runs first for every request, before routing
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, Flow, status};
    ///
    /// let mut app = App::new();
    ///
    /// app.on_request(|req: mortar::HttpRequest| async move {
    ///     if req.uri().path() == "/maintenance" {
    ///         return status!(503).map(Flow::Reply);
    ///     }
    ///     Ok(Flow::Next(req))
    /// });
    /// ```
    pub fn on_request<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
    {
        self.hooks.add_request(Phase::OnRequest, make_request_hook(hook));
        self
    }

    /// Adds a hook that runs after routing and before the request body is decoded
    ///
    /// Path parameters are already available at this point.
    pub fn pre_parsing<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
    {
        self.hooks.add_request(Phase::PreParsing, make_request_hook(hook));
        self
    }

    /// Adds a hook that runs after the body is decoded and before the middleware pipeline
    pub fn pre_handler<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow, Error>> + Send + 'static,
    {
        self.hooks.add_request(Phase::PreHandler, make_request_hook(hook));
        self
    }

    /// Adds a hook that runs on every outgoing response, including error responses
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpResponse, RequestHead};
    ///
    /// let mut app = App::new();
    ///
    /// app.on_send(|head: RequestHead, mut resp: HttpResponse| async move {
    ///     resp.headers_mut().insert("x-path", head.uri().path().parse()?);
    ///     Ok(resp)
    /// });
    /// ```
    pub fn on_send<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(RequestHead, HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult> + Send + 'static,
    {
        self.hooks.add_send(Arc::new(move |head: RequestHead, resp: HttpResponse| {
            Box::pin(hook(head, resp))
        }));
        self
    }

    /// Adds a hook that observes or replaces an error before the error handler gets it
    pub fn on_error<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(RequestHead, Error) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Error> + Send + 'static,
    {
        self.hooks.on_error.push(Arc::new(move |head: RequestHead, err: Error| {
            Box::pin(hook(head, err))
        }));
        self
    }

    /// Adds a hook that runs when the client goes away before the response is produced
    pub fn on_request_abort<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.hooks.on_abort.push(Arc::new(move |head: RequestHead| Box::pin(hook(head))));
        self
    }

    /// Adds a hook that runs once the listener is bound
    pub fn on_listen<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(SocketAddr) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.on_listen.push(Arc::new(move |addr: SocketAddr| Box::pin(hook(addr))));
        self
    }

    /// Adds a hook that runs after the server has shut down
    pub fn on_close<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks.on_close.push(Arc::new(move || Box::pin(hook())));
        self
    }
}
