use std::sync::Arc;
use hyper::{rt::{Read, Write}, server::conn::http1::Builder};
use hyper_util::{rt::TokioTimer, server::graceful::Watcher};
use super::{buf_size, Server};
use crate::app::{env::AppEnv, scope::Scope};

/// HTTP/1 impl
impl<I: Send + Read + Write + Unpin + 'static> Server<I> {
    #[inline]
    pub(super) async fn serve_core(self, scope: Scope, app_env: Arc<AppEnv>, watcher: Watcher) {
        let mut connection_builder = Builder::new();
        connection_builder
            .timer(TokioTimer::new())
            .keep_alive(app_env.keep_alive)
            .max_buf_size(buf_size(&app_env))
            .header_read_timeout(app_env.header_read_timeout);

        let connection = connection_builder.serve_connection(self.io, scope);
        let connection = watcher.watch(connection);

        drop(app_env);

        if let Err(_err) = connection.await {
            #[cfg(feature = "tracing")]
            tracing::error!("error serving connection: {_err:#}");
        }
    }
}
