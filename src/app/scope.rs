//! Per-connection request handling
//!
//! Each request goes through the same stages:
//! `on_request` hooks → routing → `pre_parsing` hooks → body decoding →
//! `pre_handler` hooks → middleware and handler → `on_error` hooks and the error handler
//! → `on_send` hooks.

use futures_util::future::BoxFuture;
use std::{
    net::SocketAddr,
    sync::{Arc, Weak},
};

use hyper::{
    body::{Incoming, SizeHint},
    service::Service,
    Request,
    Response
};

use crate::{
    error::{
        Error,
        handler::{call_error_handler, default_error_handler}
    },
    headers::{HeaderMap, HeaderValue, ALLOW, CONTENT_LENGTH, REQ_UUID, X_POWERED_BY},
    http::{
        Method,
        StatusCode,
        endpoints::{Endpoint, FindResult, args::client_ip::PeerAddr},
        response::builder::SERVER_NAME
    },
    middleware::HttpContext,
    app::{
        settings,
        env::AppEnv,
        hooks::{Flow, Phase}
    },
    HttpBody,
    HttpRequest,
    HttpResponse,
    HttpResult,
    RequestHead,
    RequestId,
    status
};

/// Serves the requests of a single connection
#[derive(Clone)]
pub(crate) struct Scope {
    shared: Weak<AppEnv>,
    peer_addr: SocketAddr
}

impl Service<Request<Incoming>> for Scope {
    type Response = Response<HttpBody>;
    type Error = Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn call(&self, request: Request<Incoming>) -> Self::Future {
        let request = request.map(HttpBody::incoming);
        Box::pin(Self::handle_request(request, self.shared.clone(), self.peer_addr))
    }
}

/// Runs the `on_request_abort` hooks if dropped before [`AbortGuard::disarm`]
///
/// hyper drops the request future when the client goes away, which is how an abort is noticed.
struct AbortGuard {
    env: Option<Arc<AppEnv>>,
    head: RequestHead
}

impl AbortGuard {
    #[inline]
    fn new(env: &Arc<AppEnv>, head: &RequestHead) -> Option<Self> {
        env.hooks.has_abort().then(|| Self {
            env: Some(env.clone()),
            head: head.clone()
        })
    }

    #[inline]
    fn disarm(mut self) {
        self.env = None;
    }
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        let Some(env) = self.env.take() else {
            return;
        };
        let head = self.head.clone();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                env.hooks.run_abort(head).await;
            });
        }
    }
}

impl Scope {
    pub(crate) fn new(shared: Weak<AppEnv>, peer_addr: SocketAddr) -> Self {
        Self { shared, peer_addr }
    }

    pub(super) async fn handle_request(
        request: Request<HttpBody>,
        shared: Weak<AppEnv>,
        peer_addr: SocketAddr
    ) -> Result<Response<HttpBody>, Error> {
        let Some(env) = shared.upgrade() else {
            #[cfg(feature = "tracing")]
            tracing::warn!("app instance could not be upgraded; aborting...");
            return status!(500).map(HttpResponse::into_inner);
        };

        #[cfg(feature = "tracing")]
        if let Some(config) = env.tracing_config.clone() {
            use tracing::Instrument;

            let span = tracing::trace_span!(
                "request",
                method = %request.method(),
                uri = %request.uri());
            let span_id = span.id();
            let mut response = Self::respond(request, env, peer_addr)
                .instrument(span)
                .await;
            if let Some(id) = span_id.filter(|_| config.include_header()) {
                response.headers_mut().insert(config.header_name(), id.into_u64().into());
            }
            return Ok(response.into_inner());
        }

        Ok(Self::respond(request, env, peer_addr).await.into_inner())
    }

    async fn respond(request: Request<HttpBody>, env: Arc<AppEnv>, peer_addr: SocketAddr) -> HttpResponse {
        let request_id = RequestId::generate();
        let (mut parts, body) = request.into_parts();
        {
            let extensions = &mut parts.extensions;
            extensions.insert(request_id);
            extensions.insert(PeerAddr(peer_addr));
            extensions.insert(env.settings.clone());
            extensions.insert(env.body_limit);
        }
        let method = parts.method.clone();
        let request = HttpRequest::from_parts(parts, body).into_limited(env.body_limit);

        let mut head = request.head();
        let guard = AbortGuard::new(&env, &head);

        let result = match env.request_timeout {
            None => Self::process(&env, request, &mut head).await,
            Some(timeout) => tokio::time::timeout(timeout, Self::process(&env, request, &mut head))
                .await
                .unwrap_or_else(|_| Err(timeout_error())),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => Self::handle_error(&env, &head, err).await,
        };
        let mut response = match env.hooks.run_send(&head, response).await {
            Ok(response) => response,
            Err(err) => Self::handle_error(&env, &head, err).await,
        };

        if let Some(guard) = guard {
            guard.disarm();
        }

        let headers = response.headers_mut();
        if let Ok(id) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(REQ_UUID, id);
        }
        if env.settings.enabled(settings::X_POWERED_BY) {
            headers.insert(X_POWERED_BY, HeaderValue::from_static(SERVER_NAME));
        }

        if method == Method::HEAD {
            keep_content_length(response.size_hint(), response.headers_mut());
            response.replace_body(HttpBody::empty());
        }
        response
    }

    async fn process(env: &AppEnv, request: HttpRequest, head: &mut RequestHead) -> HttpResult {
        let mut request = match env.hooks.run(Phase::OnRequest, request).await? {
            Flow::Next(request) => request,
            Flow::Reply(response) => return Ok(response),
        };
        *head = request.head();

        let pipeline = &env.pipeline;
        let endpoint = match pipeline.endpoints().find(request.method(), request.uri().path()) {
            FindResult::RouteNotFound => return pipeline.fallback(request).await,
            FindResult::MethodNotFound(allow) if request.method() == Method::OPTIONS => {
                return status!(204; [(ALLOW, allow)]);
            },
            FindResult::MethodNotFound(allow) => return status!(405; [(ALLOW, allow)]),
            FindResult::Ok(endpoint) => endpoint,
        };

        let Endpoint { pipeline: route_pipeline, params } = endpoint;
        request.extensions_mut().insert(params);

        let request = match env.hooks.run(Phase::PreParsing, request).await? {
            Flow::Next(request) => request,
            Flow::Reply(response) => return Ok(response),
        };
        let request = match env.parsers.decode(request).await? {
            Flow::Next(request) => request,
            Flow::Reply(response) => return Ok(response),
        };
        let request = match env.hooks.run(Phase::PreHandler, request).await? {
            Flow::Next(request) => request,
            Flow::Reply(response) => return Ok(response),
        };
        *head = request.head();

        pipeline.execute(HttpContext::new(request, route_pipeline)).await
    }

    /// Runs the `on_error` hooks and turns the error into a response
    async fn handle_error(env: &AppEnv, head: &RequestHead, err: Error) -> HttpResponse {
        let err = env.hooks.run_error(head, err).await;
        match call_error_handler(env.pipeline.error_handler(), head, err).await {
            Ok(response) => response,
            Err(err) => match default_error_handler(err).await {
                Ok(response) => response,
                Err(_) => internal_server_error(),
            }
        }
    }
}

#[inline]
fn timeout_error() -> Error {
    Error::from_parts(StatusCode::REQUEST_TIMEOUT, None, "Request Timeout")
}

#[inline]
fn internal_server_error() -> HttpResponse {
    let mut response = Response::new(HttpBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    HttpResponse::from_inner(response)
}

/// Sets `Content-Length` from the body size before the body of a `HEAD` response is dropped
fn keep_content_length(size_hint: SizeHint, headers: &mut HeaderMap) {
    if headers.contains_key(CONTENT_LENGTH) {
        return;
    }

    if let Some(size) = size_hint.exact() {
        let mut buffer = itoa::Buffer::new();
        if let Ok(value) = HeaderValue::from_str(buffer.format(size)) {
            headers.insert(CONTENT_LENGTH, value);
        }
    }
}
