//! Cookie parser
//!
//! Parses the `Cookie` header once per request into [`Cookies`] and [`SignedCookies`].

use crate::{
    http::cookie::{parse_cookies, Cookies},
    App,
    Flow,
    HttpRequest
};

/// Cookie parser configuration
///
/// # Example
/// ```no_run
/// use mortar::middleware::cookie_parser::CookieParserConfig;
///
/// // the first secret signs, all of them verify
/// let config = CookieParserConfig::new()
///     .with_secret("current")
///     .with_secrets(["previous", "oldest"]);
/// ```
#[derive(Clone, Default)]
pub struct CookieParserConfig {
    secrets: Vec<Vec<u8>>
}

impl std::fmt::Debug for CookieParserConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieParserConfig")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

impl CookieParserConfig {
    /// Creates a configuration without secrets, signed cookies are left as is
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a secret used to verify signed cookies
    pub fn with_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
        self.secrets.push(secret.as_ref().to_vec());
        self
    }

    /// Adds several secrets, tried in order
    pub fn with_secrets<I, S>(mut self, secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>
    {
        self.secrets.extend(secrets.into_iter().map(|s| s.as_ref().to_vec()));
        self
    }

    /// Parses the request cookies unless they have already been parsed
    fn parse(&self, mut req: HttpRequest) -> HttpRequest {
        if req.extensions().get::<Cookies>().is_some() {
            return req;
        }
        let (cookies, signed) = parse_cookies(req.headers(), &self.secrets);
        let extensions = req.extensions_mut();
        extensions.insert(cookies);
        extensions.insert(signed);
        req
    }
}

impl App {
    /// Adds an `on_request` hook that parses cookies
    ///
    /// Handlers get them through the [`Cookies`] and [`SignedCookies`](crate::http::SignedCookies) extractors.
    pub fn use_cookie_parser(&mut self, config: CookieParserConfig) -> &mut Self {
        self.on_request(move |req: HttpRequest| {
            let req = config.parse(req);
            async move { Ok(Flow::Next(req)) }
        })
    }
}
