use std::sync::Arc;
use hyper::rt::{Read, Write};
use hyper_util::{
    rt::{TokioExecutor, TokioTimer},
    server::{conn::auto::Builder, graceful::Watcher}
};
use super::Server;
use crate::app::{env::AppEnv, scope::Scope};

/// HTTP/2 impl, also serves HTTP/1 when both are enabled
impl<I: Send + Read + Write + Unpin + 'static> Server<I> {
    #[inline]
    pub(super) async fn serve_core(self, scope: Scope, app_env: Arc<AppEnv>, watcher: Watcher) {
        let mut connection_builder = Builder::new(TokioExecutor::new());

        #[cfg(feature = "http1")]
        connection_builder
            .http1()
            .timer(TokioTimer::new())
            .keep_alive(app_env.keep_alive)
            .max_buf_size(super::buf_size(&app_env))
            .header_read_timeout(app_env.header_read_timeout);

        connection_builder
            .http2()
            .timer(TokioTimer::new())
            .max_header_list_size(u32::try_from(app_env.max_header_size).unwrap_or(u32::MAX));

        let connection = connection_builder.serve_connection(self.io, scope);
        let connection = watcher.watch(connection);

        drop(app_env);

        if let Err(_err) = connection.await {
            #[cfg(feature = "tracing")]
            tracing::error!("error serving connection: {_err:#}");
        }
    }
}
