//! CORS (Cross-Origin Resource Sharing) configuration

use futures_util::future::BoxFuture;
use regex::Regex;
use std::{fmt, future::Future, sync::Arc, time::Duration};

use crate::{
    error::Error,
    headers::{
        append_vary,
        HeaderMap,
        HeaderValue,
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        ACCESS_CONTROL_ALLOW_HEADERS,
        ACCESS_CONTROL_ALLOW_METHODS,
        ACCESS_CONTROL_ALLOW_ORIGIN,
        ACCESS_CONTROL_EXPOSE_HEADERS,
        ACCESS_CONTROL_MAX_AGE,
        ACCESS_CONTROL_REQUEST_HEADERS,
        CONTENT_LENGTH,
        ORIGIN,
    },
    http::{Method, StatusCode},
    HttpBody,
    HttpResponse,
    HttpResult,
    RequestHead
};

const DEFAULT_METHODS: [&str; 6] = ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"];
const WILDCARD: HeaderValue = HeaderValue::from_static("*");
const TRUE_VALUE: HeaderValue = HeaderValue::from_static("true");

type OriginPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

type ConfigResolver = Arc<
    dyn Fn(RequestHead) -> BoxFuture<'static, CorsConfig>
    + Send
    + Sync
>;

/// Which origins may access the resource
#[derive(Clone)]
pub enum Origin {
    /// Any origin, `Access-Control-Allow-Origin: *`
    Any,
    /// Always sends this origin
    Exact(String),
    /// Reflects the request origin if it's one of these
    List(Vec<String>),
    /// Reflects the request origin if it matches the regex
    Regex(Regex),
    /// Reflects the request origin if the predicate holds
    Predicate(OriginPredicate),
    /// Reflects any request origin
    Reflect,
    /// Turns CORS off
    Disabled,
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Exact(origin) => f.debug_tuple("Exact").field(origin).finish(),
            Self::List(origins) => f.debug_tuple("List").field(origins).finish(),
            Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
            Self::Reflect => f.write_str("Reflect"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

impl Origin {
    /// Creates an origin matcher from a regular expression
    pub fn regex(pattern: &str) -> Result<Self, Error> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(Error::server_error)
    }

    /// Creates an origin matcher from a predicate
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static
    {
        Self::Predicate(Arc::new(predicate))
    }

    fn allows(&self, origin: &str) -> bool {
        match self {
            Self::Any | Self::Reflect => true,
            Self::Exact(allowed) => allowed == origin,
            Self::List(allowed) => allowed.iter().any(|o| o == origin),
            Self::Regex(regex) => regex.is_match(origin),
            Self::Predicate(predicate) => predicate(origin),
            Self::Disabled => false,
        }
    }
}

/// CORS middleware options
///
/// Defaults:
/// - origin: `*`
/// - methods: `GET,HEAD,PUT,PATCH,POST,DELETE`
/// - preflight continue: `false`
/// - options success status: `204`
/// - credentials: `false`
/// - no max age and no exposed headers
/// - allowed headers reflected from `Access-Control-Request-Headers`
///
/// # Example
/// ```no_run
/// use mortar::http::cors::{CorsConfig, Origin};
///
/// let config = CorsConfig::new()
///     .with_origin(Origin::List(vec!["https://example.com".into()]))
///     .with_credentials(true)
///     .with_max_age(std::time::Duration::from_secs(600));
/// ```
#[derive(Clone)]
pub struct CorsConfig {
    origin: Origin,
    methods: Vec<String>,
    preflight_continue: bool,
    options_success_status: StatusCode,
    credentials: bool,
    max_age: Option<Duration>,
    allowed_headers: Option<Vec<String>>,
    exposed_headers: Vec<String>,
    resolver: Option<ConfigResolver>,
}

impl fmt::Debug for CorsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorsConfig")
            .field("origin", &self.origin)
            .field("methods", &self.methods)
            .field("preflight_continue", &self.preflight_continue)
            .field("options_success_status", &self.options_success_status)
            .field("credentials", &self.credentials)
            .field("max_age", &self.max_age)
            .field("allowed_headers", &self.allowed_headers)
            .field("exposed_headers", &self.exposed_headers)
            .field("dynamic", &self.resolver.is_some())
            .finish()
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origin: Origin::Any,
            methods: DEFAULT_METHODS.map(String::from).to_vec(),
            preflight_continue: false,
            options_success_status: StatusCode::NO_CONTENT,
            credentials: false,
            max_age: None,
            allowed_headers: None,
            exposed_headers: Vec::new(),
            resolver: None,
        }
    }
}

impl CorsConfig {
    /// Creates the default configuration
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the options per request
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{RequestHead, http::cors::{CorsConfig, Origin}};
    ///
    /// let config = CorsConfig::dynamic(|head: RequestHead| async move {
    ///     if head.uri().path().starts_with("/public") {
    ///         CorsConfig::new()
    ///     } else {
    ///         CorsConfig::new().with_origin(Origin::Exact("https://admin.example.com".into()))
    ///     }
    /// });
    /// ```
    pub fn dynamic<F, Fut>(resolver: F) -> Self
    where
        F: Fn(RequestHead) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CorsConfig> + Send + 'static,
    {
        Self {
            resolver: Some(Arc::new(move |head: RequestHead| Box::pin(resolver(head)))),
            ..Self::default()
        }
    }

    /// Sets allowed origins
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the `Access-Control-Allow-Methods` list
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the `Access-Control-Allow-Headers` list
    ///
    /// An empty list omits the header.
    pub fn with_allowed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.allowed_headers = Some(headers.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the `Access-Control-Expose-Headers` list
    pub fn with_exposed_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.exposed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    /// Sends `Access-Control-Allow-Credentials: true`
    pub fn with_credentials(mut self, credentials: bool) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets `Access-Control-Max-Age`, zero included
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Passes preflight requests on to the route instead of replying right away
    pub fn with_preflight_continue(mut self, preflight_continue: bool) -> Self {
        self.preflight_continue = preflight_continue;
        self
    }

    /// Sets the status of the preflight reply
    pub fn with_options_success_status(mut self, status: StatusCode) -> Self {
        self.options_success_status = status;
        self
    }

    /// Returns the options for the request, running the resolver of a dynamic configuration
    pub(crate) async fn resolve(self: &Arc<Self>, head: &RequestHead) -> Arc<Self> {
        match &self.resolver {
            Some(resolver) => Arc::new(resolver(head.clone()).await),
            None => self.clone(),
        }
    }

    /// Decorates the response with the CORS headers
    ///
    /// A preflight request gets its own reply unless `preflight_continue` is set.
    pub(crate) fn apply(&self, head: &RequestHead, mut resp: HttpResponse) -> HttpResult {
        if matches!(self.origin, Origin::Disabled) {
            return Ok(resp);
        }

        let preflight = head.method() == Method::OPTIONS;
        if preflight && !self.preflight_continue {
            resp = HttpResponse::builder()
                .status(self.options_success_status)
                .header_raw(CONTENT_LENGTH, "0")
                .body(HttpBody::empty())?;
        }

        let request_headers = head.headers();
        let headers = resp.headers_mut();

        self.set_origin(request_headers, headers);
        if self.credentials {
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, TRUE_VALUE);
        }
        if preflight {
            if !self.methods.is_empty() {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_str(&self.methods.join(","))?);
            }
            self.set_allowed_headers(request_headers, headers)?;
            if let Some(max_age) = self.max_age {
                headers.insert(ACCESS_CONTROL_MAX_AGE, max_age.as_secs().into());
            }
        }
        if !self.exposed_headers.is_empty() {
            headers.insert(ACCESS_CONTROL_EXPOSE_HEADERS, HeaderValue::from_str(&self.exposed_headers.join(","))?);
        }
        Ok(resp)
    }

    fn set_origin(&self, request_headers: &HeaderMap, headers: &mut HeaderMap) {
        let value = match &self.origin {
            Origin::Any => Some(WILDCARD),
            Origin::Exact(origin) => HeaderValue::from_str(origin).ok(),
            origin => request_headers
                .get(ORIGIN)
                .filter(|value| value
                    .to_str()
                    .is_ok_and(|value| origin.allows(value)))
                .cloned(),
        };
        if let Some(value) = value {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if !matches!(self.origin, Origin::Any) {
            append_vary(headers, &ORIGIN);
        }
    }

    fn set_allowed_headers(&self, request_headers: &HeaderMap, headers: &mut HeaderMap) -> Result<(), Error> {
        match &self.allowed_headers {
            None => {
                append_vary(headers, &ACCESS_CONTROL_REQUEST_HEADERS);
                if let Some(requested) = request_headers
                    .get(ACCESS_CONTROL_REQUEST_HEADERS)
                    .filter(|value| !value.is_empty()) {
                    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
                }
            },
            Some(allowed) if !allowed.is_empty() => {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_str(&allowed.join(","))?);
            },
            Some(_) => (),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::headers::VARY;
    use crate::http::Request;
    use crate::{HttpRequest, ok};
    use super::*;

    fn head(method: Method, origin: Option<&str>) -> RequestHead {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        HttpRequest::new(builder
            .header(ACCESS_CONTROL_REQUEST_HEADERS, "x-token")
            .body(HttpBody::empty())
            .unwrap())
            .head()
    }

    fn apply(config: &CorsConfig, head: &RequestHead) -> HttpResponse {
        config.apply(head, ok!("body").unwrap()).unwrap()
    }

    #[test]
    fn it_allows_any_origin_by_default() {
        let resp = apply(&CorsConfig::new(), &head(Method::GET, Some("https://a.com")));

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!resp.headers().contains_key(VARY));
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[test]
    fn it_sends_exact_origin() {
        let config = CorsConfig::new().with_origin(Origin::Exact("https://b.com".into()));

        let resp = apply(&config, &head(Method::GET, Some("https://a.com")));

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://b.com");
        assert_eq!(resp.headers()[VARY], "Origin");
    }

    #[test]
    fn it_reflects_listed_origin() {
        let config = CorsConfig::new().with_origin(Origin::List(vec!["https://a.com".into()]));

        let allowed = apply(&config, &head(Method::GET, Some("https://a.com")));
        let denied = apply(&config, &head(Method::GET, Some("https://evil.com")));

        assert_eq!(allowed.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://a.com");
        assert!(!denied.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert_eq!(denied.headers()[VARY], "Origin");
    }

    #[test]
    fn it_matches_origin_by_regex() {
        let config = CorsConfig::new().with_origin(Origin::regex(r"^https://.*\.example\.com$").unwrap());

        let resp = apply(&config, &head(Method::GET, Some("https://api.example.com")));

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://api.example.com");
    }

    #[test]
    fn it_matches_origin_by_predicate() {
        let config = CorsConfig::new().with_origin(Origin::predicate(|origin| origin.ends_with(".dev")));

        let resp = apply(&config, &head(Method::GET, Some("https://app.dev")));

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.dev");
    }

    #[test]
    fn it_does_nothing_when_disabled() {
        let config = CorsConfig::new().with_origin(Origin::Disabled);

        let resp = apply(&config, &head(Method::OPTIONS, Some("https://a.com")));

        assert_eq!(resp.status(), 200);
        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[test]
    fn it_replies_to_preflight() {
        let config = CorsConfig::new()
            .with_credentials(true)
            .with_max_age(Duration::ZERO)
            .with_exposed_headers(["x-total"]);

        let resp = apply(&config, &head(Method::OPTIONS, Some("https://a.com")));

        let headers = resp.headers();
        assert_eq!(resp.status(), 204);
        assert_eq!(headers[CONTENT_LENGTH], "0");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET,HEAD,PUT,PATCH,POST,DELETE");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "x-token");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "0");
        assert_eq!(headers[ACCESS_CONTROL_EXPOSE_HEADERS], "x-total");
        assert_eq!(headers[VARY], "Access-Control-Request-Headers");
    }

    #[test]
    fn it_omits_empty_allowed_headers() {
        let config = CorsConfig::new().with_allowed_headers(Vec::<String>::new());

        let resp = apply(&config, &head(Method::OPTIONS, None));

        assert!(!resp.headers().contains_key(ACCESS_CONTROL_ALLOW_HEADERS));
        assert!(!resp.headers().contains_key(VARY));
    }

    #[test]
    fn it_continues_preflight_when_asked() {
        let config = CorsConfig::new()
            .with_preflight_continue(true)
            .with_options_success_status(StatusCode::OK);

        let resp = apply(&config, &head(Method::OPTIONS, None));

        assert_eq!(resp.status(), 200);
        assert_eq!(resp.size_hint().exact(), Some(4));
        assert!(resp.headers().contains_key(ACCESS_CONTROL_ALLOW_METHODS));
    }

    #[tokio::test]
    async fn it_resolves_dynamic_config() {
        let config = Arc::new(CorsConfig::dynamic(|head: RequestHead| async move {
            CorsConfig::new().with_origin(Origin::Exact(head.uri().path().into()))
        }));

        let resolved = config.resolve(&head(Method::GET, None)).await;

        assert!(matches!(&resolved.origin, Origin::Exact(path) if path == "/"));
    }
}
