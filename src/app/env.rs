//! Runtime environment the application is frozen into on start

use std::{sync::Arc, time::Duration};
use hyper_util::server::graceful::GracefulShutdown;

use super::{App, hooks::Hooks, pipeline::Pipeline};
use crate::{
    http::{
        body::parser::ContentTypeParsers,
        request::request_body_limit::RequestBodyLimit
    },
    AppSettings
};

#[cfg(feature = "tracing")]
use crate::tracing::TracingConfig;

/// How long in-flight connections may take to finish after shutdown was requested
pub(crate) const GRACEFUL_SHUTDOWN_TIMEOUT: u64 = 10;

/// Immutable state shared by all connections and requests.
///
/// Built once from [`App`] when the server starts.
pub(crate) struct AppEnv {
    /// Maximum total size in bytes of the request headers
    pub(crate) max_header_size: usize,

    /// Whether HTTP/1 keep-alive is on
    pub(crate) keep_alive: bool,

    /// How long to wait for the request headers
    pub(crate) header_read_timeout: Duration,

    /// Global middleware, route table and error handling
    pub(super) pipeline: Pipeline,

    /// Body parsers keyed by content type
    pub(super) parsers: ContentTypeParsers,

    /// Lifecycle hooks
    pub(super) hooks: Hooks,

    /// Frozen application settings
    pub(super) settings: AppSettings,

    /// Request body limit
    pub(super) body_limit: RequestBodyLimit,

    /// Time allowed to produce a response
    pub(super) request_timeout: Option<Duration>,

    #[cfg(feature = "tracing")]
    pub(super) tracing_config: Option<TracingConfig>,
}

impl From<App> for AppEnv {
    fn from(app: App) -> Self {
        Self {
            max_header_size: app.max_header_size,
            keep_alive: app.keep_alive,
            header_read_timeout: app.header_read_timeout,
            pipeline: app.pipeline.build(),
            parsers: app.parsers,
            hooks: app.hooks,
            settings: AppSettings::new(Arc::new(app.settings)),
            body_limit: app.body_limit,
            request_timeout: app.request_timeout,
            #[cfg(feature = "tracing")]
            tracing_config: app.tracing_config,
        }
    }
}

/// Waits for the in-flight connections to finish, but no longer than [`GRACEFUL_SHUTDOWN_TIMEOUT`]
pub(super) async fn drain(graceful_shutdown: GracefulShutdown) {
    tokio::select! {
        _ = graceful_shutdown.shutdown() => {
            #[cfg(feature = "tracing")]
            tracing::info!("all connections closed");
        },
        _ = tokio::time::sleep(Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT)) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("timed out waiting for all connections to close");
        }
    }
}
