//! Base HTTP tools

// Re-exporting HTTP status codes, method and etc. from hyper/http
pub use hyper::{
    http::{Method, Uri, Version},
    StatusCode,
};

pub(crate) use hyper::{
    http::{request::Parts, Extensions},
    Request, Response
};

pub use body::{BoxBody, HttpBody};
pub use endpoints::{
    args::{FromRequest, FromRequestParts, FromRequestRef},
    handlers::GenericHandler
};
pub use request::{HttpRequest, RequestHead};

pub use response::{
    into_response::IntoResponse,
    FilterResult,
    HttpResponse,
    HttpResult,
};

#[cfg(feature = "cookie")]
pub use self::cookie::{Cookies, SignedCookies, CookieValue};
#[cfg(feature = "cors")]
pub use self::cors::CorsConfig;

pub mod body;
pub mod request;
pub mod response;
pub mod endpoints;
#[cfg(feature = "cookie")]
pub mod cookie;
#[cfg(feature = "cors")]
pub mod cors;
