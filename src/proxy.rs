//! Buffering reverse proxy
//!
//! Forwards requests to an upstream HTTP server and relays its reply.
//! Mount it on a path with [`App::map_proxy`] or in front of every route with [`App::use_proxy`].

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::{BodyExt, Full};
use hyper::http::{request, uri::{Authority, PathAndQuery, Scheme}};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor
};
use regex::Regex;
use serde_json::Value;
use std::{fmt, future::Future, sync::Arc, time::Duration};

use crate::{
    error::Error,
    headers::{
        HeaderMap,
        HeaderName,
        HeaderValue,
        CONNECTION,
        CONTENT_LENGTH,
        CONTENT_TYPE,
        HOST,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE
    },
    http::{StatusCode, Uri},
    middleware::{HttpContext, Next},
    App,
    HttpBody,
    HttpRequest,
    HttpResponse,
    HttpResult,
    ParsedBody,
    RequestHead,
    status
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

const HOP_BY_HOP: [HeaderName; 8] = [
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

type ProxyClient = Client<HttpConnector, Full<Bytes>>;

type Filter = Arc<
    dyn Fn(RequestHead) -> BoxFuture<'static, bool>
    + Send
    + Sync
>;

type PathResolver = Arc<
    dyn Fn(RequestHead) -> BoxFuture<'static, String>
    + Send
    + Sync
>;

type RequestDecorator = Arc<
    dyn Fn(request::Parts) -> BoxFuture<'static, Result<request::Parts, Error>>
    + Send
    + Sync
>;

type ResponseDecorator = Arc<
    dyn Fn(UpstreamResponse, RequestHead) -> BoxFuture<'static, Result<ProxyBody, Error>>
    + Send
    + Sync
>;

type ErrorHandler = Arc<
    dyn Fn(Error, RequestHead) -> BoxFuture<'static, HttpResult>
    + Send
    + Sync
>;

/// A body produced by a response decorator
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyBody {
    /// Sent as is
    Bytes(Bytes),
    /// Serialized, `Content-Type: application/json` is set if the upstream didn't send one
    Json(Value),
}

impl From<Bytes> for ProxyBody {
    #[inline]
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for ProxyBody {
    #[inline]
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// A fully buffered upstream reply handed to a response decorator
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// Upstream status code
    pub status: StatusCode,
    /// Upstream headers without hop-by-hop ones
    pub headers: HeaderMap,
    /// Upstream body
    pub body: Bytes,
}

/// Reverse proxy options
///
/// Only the target's scheme and authority are used, the path comes from the incoming
/// request unless rewritten or resolved.
///
/// # Example
/// ```no_run
/// use mortar::proxy::ProxyOptions;
/// use std::time::Duration;
///
/// # fn options() -> Result<ProxyOptions, mortar::error::Error> {
/// let options = ProxyOptions::new("http://127.0.0.1:3000")?
///     .with_path_rewrite("^/api", "")?
///     .with_timeout(Duration::from_secs(5));
/// # Ok(options)
/// # }
/// ```
#[derive(Clone)]
pub struct ProxyOptions {
    scheme: Scheme,
    authority: Authority,
    change_origin: bool,
    path_rewrite: Vec<(Regex, String)>,
    timeout: Duration,
    headers: HeaderMap,
    filter: Option<Filter>,
    path_resolver: Option<PathResolver>,
    request_decorator: Option<RequestDecorator>,
    response_decorator: Option<ResponseDecorator>,
    error_handler: Option<ErrorHandler>,
}

impl fmt::Debug for ProxyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyOptions")
            .field("target", &format_args!("{}://{}", self.scheme, self.authority))
            .field("change_origin", &self.change_origin)
            .field("path_rewrite", &self.path_rewrite)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl ProxyOptions {
    /// Creates options for an `http://` target
    ///
    /// Fails if the target isn't a valid absolute URI or uses `https`.
    pub fn new(target: &str) -> Result<Self, Error> {
        let target = target.parse::<Uri>().map_err(Error::server_error)?;
        let parts = target.into_parts();
        let scheme = parts.scheme
            .ok_or_else(|| Error::server_error("Proxy target must be an absolute URI"))?;
        if scheme != Scheme::HTTP {
            return Err(Error::server_error(format!("Unsupported proxy target scheme: {scheme}")));
        }
        let authority = parts.authority
            .ok_or_else(|| Error::server_error("Proxy target must have a host"))?;

        Ok(Self {
            scheme,
            authority,
            change_origin: true,
            path_rewrite: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            headers: HeaderMap::new(),
            filter: None,
            path_resolver: None,
            request_decorator: None,
            response_decorator: None,
            error_handler: None,
        })
    }

    /// Sets whether the `Host` header is replaced with the target authority
    ///
    /// Default: `true`
    pub fn with_change_origin(mut self, change_origin: bool) -> Self {
        self.change_origin = change_origin;
        self
    }

    /// Adds a path rewrite rule; rules apply in the order they were added,
    /// each replacing the first match
    pub fn with_path_rewrite(mut self, pattern: &str, replacement: impl Into<String>) -> Result<Self, Error> {
        let regex = Regex::new(pattern).map_err(Error::server_error)?;
        self.path_rewrite.push((regex, replacement.into()));
        Ok(self)
    }

    /// Sets the time the whole upstream exchange may take
    ///
    /// Default: 30 seconds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a header to every upstream request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Proxies only the requests the predicate accepts, others continue down the pipeline
    pub fn with_filter<F, Fut>(mut self, filter: F) -> Self
    where
        F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.filter = Some(Arc::new(move |head: RequestHead| Box::pin(filter(head))));
        self
    }

    /// Computes the upstream path and query, path rewrite rules are skipped when set
    pub fn with_path_resolver<F, Fut>(mut self, resolver: F) -> Self
    where
        F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.path_resolver = Some(Arc::new(move |head: RequestHead| Box::pin(resolver(head))));
        self
    }

    /// Adjusts the upstream request before it's sent
    pub fn with_request_decorator<F, Fut>(mut self, decorator: F) -> Self
    where
        F: Fn(request::Parts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<request::Parts, Error>> + Send + 'static,
    {
        self.request_decorator = Some(Arc::new(move |parts: request::Parts| Box::pin(decorator(parts))));
        self
    }

    /// Replaces the upstream body before it's relayed
    pub fn with_response_decorator<F, Fut>(mut self, decorator: F) -> Self
    where
        F: Fn(UpstreamResponse, RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ProxyBody, Error>> + Send + 'static,
    {
        self.response_decorator = Some(Arc::new(move |resp: UpstreamResponse, head: RequestHead| Box::pin(decorator(resp, head))));
        self
    }

    /// Turns proxy failures into responses, replacing the default `500 Proxy error: ...` reply
    pub fn with_error_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Error, RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResult> + Send + 'static,
    {
        self.error_handler = Some(Arc::new(move |err: Error, head: RequestHead| Box::pin(handler(err, head))));
        self
    }

    fn rewrite(&self, path: &str) -> String {
        self.path_rewrite
            .iter()
            .fold(path.to_owned(), |path, (regex, replacement)| {
                regex.replace(&path, replacement.as_str()).into_owned()
            })
    }
}

/// Forwards requests according to [`ProxyOptions`]
#[derive(Clone)]
struct Proxy {
    options: Arc<ProxyOptions>,
    client: ProxyClient,
}

impl Proxy {
    fn new(options: ProxyOptions) -> Self {
        Self {
            options: Arc::new(options),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    async fn call(&self, ctx: HttpContext, next: Next) -> HttpResult {
        let head = ctx.request.head();
        if let Some(filter) = &self.options.filter {
            if !filter(head.clone()).await {
                return next(ctx).await;
            }
        }

        let (req, _) = ctx.into_parts();
        match self.forward(req, head.clone()).await {
            Ok(resp) => Ok(resp),
            Err(err) => match &self.options.error_handler {
                Some(handler) => handler(err, head).await,
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("proxy error: {err}");
                    status!(500, "Proxy error: {err}")
                }
            }
        }
    }

    async fn forward(&self, req: HttpRequest, head: RequestHead) -> HttpResult {
        let upstream = self.upstream_request(req, &head).await?;
        let (parts, body) = tokio::time::timeout(self.options.timeout, self.exchange(upstream))
            .await
            .map_err(|_| Error::server_error("Proxy timeout"))??;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(CONTENT_LENGTH);

        let body = match &self.options.response_decorator {
            None => body,
            Some(decorator) => {
                let upstream = UpstreamResponse { status: parts.status, headers: headers.clone(), body };
                match decorator(upstream, head).await? {
                    ProxyBody::Bytes(bytes) => bytes,
                    ProxyBody::Json(value) => {
                        if !headers.contains_key(CONTENT_TYPE) {
                            headers.insert(CONTENT_TYPE, APPLICATION_JSON);
                        }
                        serde_json::to_vec(&value)?.into()
                    }
                }
            }
        };

        HttpResponse::builder()
            .status(parts.status)
            .headers(headers)
            .body(HttpBody::full(body))
    }

    async fn upstream_request(&self, req: HttpRequest, head: &RequestHead) -> Result<hyper::Request<Full<Bytes>>, Error> {
        let path = match &self.options.path_resolver {
            Some(resolver) => resolver(head.clone()).await,
            None => {
                let path = head.uri()
                    .path_and_query()
                    .map(PathAndQuery::as_str)
                    .unwrap_or("/");
                self.options.rewrite(path)
            }
        };
        let path = if path.starts_with('/') { path } else { format!("/{path}") };
        let uri = Uri::builder()
            .scheme(self.options.scheme.clone())
            .authority(self.options.authority.clone())
            .path_and_query(path)
            .build()?;

        let (mut parts, body) = req.into_parts();
        let mut headers = std::mem::take(&mut parts.headers);
        strip_hop_by_hop(&mut headers);

        let body = match parts.extensions.get::<ParsedBody>() {
            Some(ParsedBody::Json(value)) => {
                headers.insert(CONTENT_TYPE, APPLICATION_JSON);
                Bytes::from(serde_json::to_vec(value)?)
            },
            _ => body.into_bytes().await?,
        };
        headers.insert(CONTENT_LENGTH, body.len().into());
        for (name, value) in self.options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        if self.options.change_origin {
            headers.insert(HOST, HeaderValue::from_str(self.options.authority.as_str())?);
        }

        let mut upstream = hyper::Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(Full::new(body))?;
        *upstream.headers_mut() = headers;

        match &self.options.request_decorator {
            None => Ok(upstream),
            Some(decorator) => {
                let (parts, body) = upstream.into_parts();
                let parts = decorator(parts).await?;
                Ok(hyper::Request::from_parts(parts, body))
            }
        }
    }

    async fn exchange(&self, req: hyper::Request<Full<Bytes>>) -> Result<(hyper::http::response::Parts, Bytes), Error> {
        let resp = self.client
            .request(req)
            .await
            .map_err(Error::server_error)?;
        let (parts, body) = resp.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok((parts, body))
    }
}

/// Removes connection-specific headers, including the ones listed in `Connection`
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect::<Vec<_>>();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Builds the pattern a proxy is mounted on; the wildcard also matches the bare prefix
fn mount_pattern(pattern: &str) -> String {
    let pattern = pattern.trim_end_matches('/');
    if pattern.ends_with('*') || (pattern.ends_with('}') && pattern.contains("{*")) {
        pattern.to_owned()
    } else {
        format!("{pattern}/*")
    }
}

impl App {
    /// Proxies every method under `pattern` to the upstream server
    ///
    /// The incoming path is forwarded as is, use a path rewrite rule to strip the mount prefix.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, proxy::ProxyOptions};
    ///
    /// # fn setup() -> Result<(), mortar::error::Error> {
    /// let mut app = App::new();
    ///
    /// app.map_proxy("/api", ProxyOptions::new("http://127.0.0.1:3000")?
    ///     .with_path_rewrite("^/api", "")?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn map_proxy(&mut self, pattern: &str, options: ProxyOptions) -> &mut Self {
        let proxy = Proxy::new(options);
        self.map_all(&mount_pattern(pattern), || async { status!(404) })
            .wrap(move |ctx: HttpContext, next: Next| {
                let proxy = proxy.clone();
                async move { proxy.call(ctx, next).await }
            });
        self
    }

    /// Proxies every routed request that passes the filter instead of its local handler
    ///
    /// Runs as global middleware, so paths that match no route still go to the fallback.
    /// Use [`App::map_proxy`] to forward a whole path prefix.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, proxy::ProxyOptions};
    ///
    /// # fn setup() -> Result<(), mortar::error::Error> {
    /// let mut app = App::new();
    ///
    /// app.use_proxy(ProxyOptions::new("http://127.0.0.1:3000")?
    ///     .with_filter(|head| async move { head.uri().path().starts_with("/legacy") }));
    /// # Ok(())
    /// # }
    /// ```
    pub fn use_proxy(&mut self, options: ProxyOptions) -> &mut Self {
        let proxy = Proxy::new(options);
        self.wrap(move |ctx: HttpContext, next: Next| {
            let proxy = proxy.clone();
            async move { proxy.call(ctx, next).await }
        })
    }
}
