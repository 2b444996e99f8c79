//! ETag middleware

use hyper::http::response::Parts;
use serde_json::Value;
use crate::{
    app::settings::ETAG as ETAG_SETTING,
    error::Error,
    headers::{
        etag::{ETag, EtagAlgorithm},
        CONTENT_LENGTH,
        ETAG,
        IF_NONE_MATCH
    },
    http::{Method, StatusCode},
    App,
    AppSettings,
    HttpBody,
    HttpResponse,
    HttpResult,
    RequestHead
};

/// ETag middleware configuration
///
/// # Example
/// ```no_run
/// use mortar::middleware::etag::EtagConfig;
///
/// let config = EtagConfig::new()
///     .with_algorithm("fnv1a".parse().unwrap())
///     .with_weak(false);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct EtagConfig {
    algorithm: EtagAlgorithm,
    weak: Option<bool>,
}

impl EtagConfig {
    /// Creates a configuration with `sha1` digests and the weakness taken from the `etag` setting
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hash function
    pub fn with_algorithm(mut self, algorithm: EtagAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Forces weak (`W/"..."`) or strong tags regardless of the `etag` setting
    pub fn with_weak(mut self, weak: bool) -> Self {
        self.weak = Some(weak);
        self
    }

    /// Resolves tag weakness, `None` means tags are turned off by the `etag` setting
    fn weakness(&self, head: &RequestHead) -> Option<bool> {
        if let Some(weak) = self.weak {
            return Some(weak);
        }
        let setting = head.extensions()
            .get::<AppSettings>()
            .and_then(|settings| settings.get(ETAG_SETTING).cloned());
        match setting {
            Some(Value::Bool(false)) => None,
            Some(Value::String(kind)) if kind == "strong" => Some(false),
            _ => Some(true),
        }
    }

    async fn apply(&self, head: &RequestHead, resp: HttpResponse) -> HttpResult {
        if !matches!(*head.method(), Method::GET | Method::HEAD) || !resp.status().is_success() {
            return Ok(resp);
        }

        // a tag set by the handler is kept, but still answers conditional requests
        if let Some(existing) = resp.headers().get(ETAG) {
            let etag = existing.to_str().map(ETag::new).ok();
            return match etag {
                Some(etag) if not_modified(head, &etag) => Ok(into_not_modified(resp.into_parts().0)),
                _ => Ok(resp),
            };
        }

        if resp.size_hint().exact().is_none() {
            return Ok(resp);
        }
        let Some(weak) = self.weakness(head) else {
            return Ok(resp);
        };

        let (mut parts, body) = resp.into_parts();
        let bytes = body.into_bytes().await?;
        let etag = ETag::compute(self.algorithm, &bytes, weak);

        let not_modified = not_modified(head, &etag);
        parts.headers.insert(ETAG, etag.try_into()?);
        if not_modified {
            return Ok(into_not_modified(parts));
        }
        Ok(HttpResponse::from_parts(parts, HttpBody::full(bytes)))
    }
}

#[inline]
fn not_modified(head: &RequestHead, etag: &ETag) -> bool {
    head.headers()
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| etag.matches(value))
}

fn into_not_modified(mut parts: Parts) -> HttpResponse {
    parts.status = StatusCode::NOT_MODIFIED;
    parts.headers.remove(CONTENT_LENGTH);
    HttpResponse::from_parts(parts, HttpBody::empty())
}

impl App {
    /// Adds an `on_send` hook that tags buffered 2xx responses to `GET` and `HEAD` requests
    /// and replies `304 Not Modified` when `If-None-Match` matches
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, middleware::etag::EtagConfig};
    ///
    /// let mut app = App::new();
    ///
    /// app.use_etag(EtagConfig::new());
    /// ```
    pub fn use_etag(&mut self, config: EtagConfig) -> &mut Self {
        self.on_send(move |head: RequestHead, resp: HttpResponse| async move {
            config.apply(&head, resp).await
        })
    }

    /// Same as [`App::use_etag`] with the algorithm given by name
    pub fn use_etag_with(&mut self, algorithm: &str) -> Result<&mut Self, Error> {
        let algorithm = algorithm.parse()?;
        Ok(self.use_etag(EtagConfig::new().with_algorithm(algorithm)))
    }
}
