//! Cookies parsed by the cookie parser, cookie signing and `Set-Cookie` helpers

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use std::{
    future::{ready, Ready},
    ops::Deref,
    time::Duration
};

use crate::{
    error::Error,
    headers::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE},
    http::{
        Parts,
        endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
    },
    HttpResponse
};

pub use cookie::SameSite;

const JSON_PREFIX: &str = "j:";
const SIGNED_PREFIX: &str = "s:";

type HmacSha256 = Hmac<Sha256>;

/// Value of a parsed cookie
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CookieValue {
    /// Plain text value
    Text(String),
    /// Value of a `j:` cookie
    Json(Value),
    /// Signed cookie whose signature didn't match any of the secrets
    Invalid,
}

impl CookieValue {
    /// Returns the text value
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the JSON value of a `j:` cookie
    #[inline]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Checks whether this is a signed cookie that failed verification
    #[inline]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    /// Turns a plain or unsigned value into text or JSON
    fn from_raw(value: String) -> Self {
        match json_cookie(&value) {
            Some(json) => Self::Json(json),
            None => Self::Text(value),
        }
    }
}

macro_rules! define_cookie_map {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name(pub(crate) IndexMap<String, CookieValue>);

        impl $name {
            /// Returns the cookie value by name
            #[inline]
            pub fn get(&self, name: &str) -> Option<&CookieValue> {
                self.0.get(name)
            }

            /// Unwraps the inner map
            #[inline]
            pub fn into_inner(self) -> IndexMap<String, CookieValue> {
                self.0
            }
        }

        impl Deref for $name {
            type Target = IndexMap<String, CookieValue>;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl FromRequestParts for $name {
            #[inline]
            fn from_parts(parts: &Parts) -> Result<Self, Error> {
                Ok(parts.extensions
                    .get::<$name>()
                    .cloned()
                    .unwrap_or_default())
            }
        }

        impl FromPayload for $name {
            type Future = Ready<Result<Self, Error>>;

            #[inline]
            fn from_payload(payload: Payload<'_>) -> Self::Future {
                match payload {
                    Payload::Parts(parts) => ready(Self::from_parts(parts)),
                    _ => ready(Ok(Self::default())),
                }
            }

            #[inline]
            fn source() -> Source {
                Source::Parts
            }
        }
    };
}

define_cookie_map! {
    /// Unsigned cookies of the request
    ///
    /// Filled in by the cookie parser, empty if it isn't in use.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, ok, http::Cookies};
    /// use mortar::middleware::cookie_parser::CookieParserConfig;
    ///
    /// let mut app = App::new();
    ///
    /// app.use_cookie_parser(CookieParserConfig::new());
    /// app.map_get("/", |cookies: Cookies| async move {
    ///     let theme = cookies.get("theme").and_then(|c| c.as_str()).unwrap_or("light");
    ///     ok!("theme: {theme}")
    /// });
    /// ```
    Cookies
}

define_cookie_map! {
    /// Signed cookies of the request
    ///
    /// Cookies that failed verification are present as [`CookieValue::Invalid`].
    SignedCookies
}

/// Attributes of a cookie set with [`set_cookie`]
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<Duration>,
    http_only: bool,
    secure: bool,
    same_site: Option<SameSite>,
}

impl CookieOptions {
    /// Creates options without any attributes
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `Path` attribute
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the `Domain` attribute
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the `Max-Age` attribute
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Sets the `HttpOnly` attribute
    pub fn http_only(mut self) -> Self {
        self.http_only = true;
        self
    }

    /// Sets the `Secure` attribute
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Sets the `SameSite` attribute
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    fn build(&self, name: String, value: String) -> cookie::Cookie<'static> {
        let mut builder = cookie::Cookie::build((name, value))
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age.and_then(|age| cookie::time::Duration::try_from(age).ok()) {
            builder = builder.max_age(max_age);
        }
        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site);
        }
        builder.build()
    }
}

/// Signs `value` with HMAC-SHA256: `value.signature`
///
/// The signature is base64 encoded without padding.
pub fn sign(value: &str, secret: impl AsRef<[u8]>) -> String {
    format!("{value}.{}", signature(value, secret.as_ref()))
}

/// Verifies a value produced by [`sign`] and returns the original value
///
/// Returns `None` if the signature doesn't match.
pub fn unsign(input: &str, secret: impl AsRef<[u8]>) -> Option<String> {
    let (value, _) = input.rsplit_once('.')?;
    let expected = sign(value, secret);
    let valid: bool = expected.as_bytes().ct_eq(input.as_bytes()).into();
    valid.then(|| value.to_owned())
}

/// Decodes a cookie value that may be signed
///
/// Values without the `s:` prefix are returned as is. Signed ones are checked
/// against each secret in turn, `None` if none of them matches.
pub fn signed_cookie<S: AsRef<[u8]>>(value: &str, secrets: &[S]) -> Option<String> {
    let Some(signed) = value.strip_prefix(SIGNED_PREFIX) else {
        return Some(value.to_owned());
    };
    secrets
        .iter()
        .find_map(|secret| unsign(signed, secret))
}

/// Parses the JSON of a `j:` cookie, `None` for other values or invalid JSON
pub fn json_cookie(value: &str) -> Option<Value> {
    value
        .strip_prefix(JSON_PREFIX)
        .and_then(|json| serde_json::from_str(json).ok())
}

/// Adds a `Set-Cookie` header to the response
///
/// # Example
/// ```no_run
/// use mortar::{App, ok, http::cookie::{set_cookie, CookieOptions}};
///
/// let mut app = App::new();
///
/// app.map_get("/login", || async {
///     let mut resp = ok!()?;
///     set_cookie(&mut resp, "session", "abc", &CookieOptions::new().http_only())?;
///     Ok::<_, mortar::error::Error>(resp)
/// });
/// ```
pub fn set_cookie(
    resp: &mut HttpResponse,
    name: impl Into<String>,
    value: impl Into<String>,
    options: &CookieOptions
) -> Result<(), Error> {
    let cookie = options.build(name.into(), value.into());
    let header = HeaderValue::from_str(&cookie.encoded().to_string())?;
    resp.headers_mut().append(SET_COOKIE, header);
    Ok(())
}

/// Adds a `Set-Cookie` header with a value signed by `secret`
///
/// The cookie parser configured with the same secret turns it back into the original value.
pub fn set_signed_cookie(
    resp: &mut HttpResponse,
    name: impl Into<String>,
    value: &str,
    secret: impl AsRef<[u8]>,
    options: &CookieOptions
) -> Result<(), Error> {
    set_cookie(resp, name, format!("{SIGNED_PREFIX}{}", sign(value, secret)), options)
}

/// Splits the `Cookie` headers into plain and signed cookies
///
/// Only the first cookie of each name is kept. Signed cookies are verified
/// only when there is at least one secret.
pub(crate) fn parse_cookies<S: AsRef<[u8]>>(headers: &HeaderMap, secrets: &[S]) -> (Cookies, SignedCookies) {
    let mut raw = IndexMap::new();
    let pairs = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(cookie::Cookie::split_parse_encoded)
        .filter_map(Result::ok);
    for cookie in pairs {
        let (name, value) = cookie.name_value();
        if !raw.contains_key(name) {
            raw.insert(name.to_owned(), value.to_owned());
        }
    }

    let mut signed = IndexMap::new();
    if !secrets.is_empty() {
        raw.retain(|name, value| {
            if !value.starts_with(SIGNED_PREFIX) {
                return true;
            }
            let decoded = match signed_cookie(value, secrets) {
                Some(value) => CookieValue::from_raw(value),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("invalid signature of cookie: {name}");
                    CookieValue::Invalid
                }
            };
            signed.insert(name.clone(), decoded);
            false
        });
    }

    let plain = raw
        .into_iter()
        .map(|(name, value)| (name, CookieValue::from_raw(value)))
        .collect();

    (Cookies(plain), SignedCookies(signed))
}

#[inline]
fn signature(value: &str, secret: &[u8]) -> String {
    HmacSha256::new_from_slice(secret)
        .map(|mut mac| {
            mac.update(value.as_bytes());
            STANDARD_NO_PAD.encode(mac.finalize().into_bytes())
        })
        .unwrap_or_default()
}
