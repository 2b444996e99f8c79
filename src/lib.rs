//! # Mortar
//!
//! > An HTTP server shell on top of [Tokio](https://tokio.rs/) and [hyper](https://hyper.rs/)
//! > with lifecycle hooks, a two-phase middleware pipeline and a set of ready-made middleware.
//!
//! ## Features
//! * Method/path router with parameters and catch-all wildcards
//! * Lifecycle hooks: `on_request`, `pre_parsing`, `pre_handler`, `on_send`, `on_error`, `on_request_abort`
//! * Before/after middleware with early exit
//! * Content-type based body decoding with pluggable parsers
//! * Buffered and streaming responses
//! * Cookie parsing with signed cookies, CORS, ETag, multipart upload and reverse proxy
//!
//! ## Example
//! ```no_run
//! use mortar::*;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let mut app = App::new();
//!
//!     app.map_get("/hello/:name", |name: String| async move {
//!         ok!("Hello {name}!")
//!     });
//!
//!     app.run().await
//! }
//! ```

#![forbid(unsafe_code)]

mod server;
pub(crate) mod utils;

pub mod app;
pub mod http;
pub mod headers;
pub mod json;
pub mod error;
pub mod middleware;
#[cfg(feature = "proxy")]
pub mod proxy;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use crate::app::{App, hooks::Flow, settings::Settings};
pub use crate::http::{
    response::builder::{RESPONSE_ERROR, SERVER_NAME},
    response::stream::BodyWriter,
    body::parser::ParsedBody,
    endpoints::args::{
        json::Json,
        path::Path,
        query::Query,
        form::Form,
        client_ip::ClientIp,
        request_id::RequestId,
        settings::AppSettings,
    },
    BoxBody,
    HttpBody,
    HttpRequest,
    HttpResponse,
    HttpResult,
    RequestHead,
};

#[cfg(feature = "multipart")]
pub use crate::http::endpoints::args::multipart::{Files, UploadedFile};

/// Route mapping helpers
pub mod routing {
    pub use crate::app::router::RouteGroup;
}
