//! HTTP server tools

use std::{net::SocketAddr, sync::{Arc, Weak}};
use hyper::rt::{Read, Write};
use hyper_util::server::graceful::Watcher;
use crate::app::{env::AppEnv, scope::Scope};

#[cfg(all(feature = "http1", not(feature = "http2")))]
mod http1;
#[cfg(feature = "http2")]
mod http2;

/// Minimal read buffer size hyper accepts for HTTP/1
#[cfg(feature = "http1")]
const MIN_BUF_SIZE: usize = 8192;

/// A single client connection
pub(super) struct Server<I: Read + Write + Unpin> {
    io: I,
    peer_addr: SocketAddr,
}

impl<I: Send + Read + Write + Unpin + 'static> Server<I> {
    #[inline]
    pub(super) fn new(io: I, peer_addr: SocketAddr) -> Self {
        Self { io, peer_addr }
    }

    /// Serves the connection until it's closed or the server shuts down
    #[inline]
    pub(super) async fn serve(self, env: Weak<AppEnv>, watcher: Watcher) {
        if let Some(instance) = env.upgrade() {
            let scope = Scope::new(env, self.peer_addr);
            self.serve_core(scope, instance, watcher).await;
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("app instance could not be upgraded; aborting...");
        }
    }
}

/// Read buffer size that fits the configured header size
#[cfg(feature = "http1")]
#[inline]
fn buf_size(env: &Arc<AppEnv>) -> usize {
    env.max_header_size.max(MIN_BUF_SIZE)
}
