//! Main application entry point

use hyper_util::{rt::TokioIo, server::graceful::{GracefulShutdown, Watcher}};
use std::{
    future::Future,
    net::SocketAddr,
    sync::{Arc, Weak},
    time::Duration
};

use tokio::{
    io,
    net::{TcpListener, TcpStream},
    signal,
    sync::Semaphore
};

use crate::{
    http::{
        body::parser::ContentTypeParsers,
        request::request_body_limit::RequestBodyLimit
    },
    server::Server
};

use self::{
    env::AppEnv,
    hooks::Hooks,
    pipeline::PipelineBuilder,
    settings::Settings
};

#[cfg(feature = "tracing")]
use crate::tracing::TracingConfig;

pub use self::connection::Connection;

pub mod router;
pub mod hooks;
pub mod settings;
pub(crate) mod pipeline;
pub(crate) mod scope;
pub(crate) mod env;
mod connection;

const DEFAULT_MAX_HEADER_SIZE: usize = 16 * 1024;
const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(72);

/// The web application used to configure hooks, middleware, routes and the server itself.
///
/// Running consumes the application, so nothing can be registered once the server has started.
///
/// # Example
/// ```no_run
/// use mortar::{App, ok};
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let mut app = App::new().bind("127.0.0.1:7878");
///
///     app.map_get("/", || async { ok!("Hello!") });
///
///     app.run().await
/// }
/// ```
pub struct App {
    pub(crate) pipeline: PipelineBuilder,

    pub(crate) parsers: ContentTypeParsers,

    pub(crate) hooks: Hooks,

    pub(crate) settings: Settings,

    #[cfg(feature = "tracing")]
    pub(crate) tracing_config: Option<TracingConfig>,

    connection: Connection,

    body_limit: RequestBodyLimit,

    max_connections: Option<usize>,

    max_header_size: usize,

    keep_alive: bool,

    header_read_timeout: Duration,

    request_timeout: Option<Duration>,

    no_delay: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("connection", &self.connection)
            .field("body_limit", &self.body_limit)
            .field("max_connections", &self.max_connections)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Default for App {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates a new application with the default settings
    ///
    /// Defaults:
    /// - bound to `0.0.0.0:7878`
    /// - 1 MiB request body limit
    /// - 16 KiB of request headers
    /// - keep-alive on
    /// - 72 s to read the request headers
    /// - no request timeout
    pub fn new() -> Self {
        Self {
            pipeline: PipelineBuilder::new(),
            parsers: ContentTypeParsers::default(),
            hooks: Hooks::default(),
            settings: Settings::default(),
            #[cfg(feature = "tracing")]
            tracing_config: None,
            connection: Connection::default(),
            body_limit: RequestBodyLimit::default(),
            max_connections: None,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            keep_alive: true,
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            request_timeout: None,
            no_delay: false,
        }
    }

    /// Binds the server to the specified address
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    ///
    /// let app = App::new().bind("127.0.0.1:8080");
    /// let app = App::new().bind(([127, 0, 0, 1], 8080));
    /// ```
    pub fn bind<S: Into<Connection>>(mut self, socket: S) -> Self {
        self.connection = socket.into();
        self
    }

    /// Sets the maximum request body size in bytes
    ///
    /// Reading a larger body fails with `413 Payload Too Large`.
    ///
    /// Default: 1 MiB
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = RequestBodyLimit::Enabled(limit);
        self
    }

    /// Removes the request body size limit
    pub fn without_body_limit(mut self) -> Self {
        self.body_limit = RequestBodyLimit::Disabled;
        self
    }

    /// Limits the number of concurrent connections, extra connections are dropped
    ///
    /// Default: unlimited
    pub fn with_max_connections(mut self, count: usize) -> Self {
        self.max_connections = Some(count);
        self
    }

    /// Sets the maximum total size of the request headers in bytes
    ///
    /// For HTTP/1 the value is rounded up to the 8 KiB minimum hyper allows.
    ///
    /// Default: 16 KiB
    pub fn with_max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    /// Turns HTTP/1 keep-alive on or off
    ///
    /// Default: on
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets how long to wait for the request headers before closing the connection
    ///
    /// Default: 72 seconds
    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    /// Sets how long a request may take to produce a response.
    /// When it runs out, the reply is `408 Request Timeout`.
    ///
    /// Default: no timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets `TCP_NODELAY` on accepted connections
    pub fn with_no_delay(mut self) -> Self {
        self.no_delay = true;
        self
    }

    /// Starts the [`App`] with its own Tokio runtime.
    ///
    /// Logs and returns if the runtime can't be built or the server fails to start.
    ///
    /// # Panics
    /// Panics when called from within an existing Tokio runtime,
    /// use [`App::run`] there instead.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    ///
    /// App::new().bind("127.0.0.1:7878").run_blocking();
    /// ```
    pub fn run_blocking(self) {
        let Some(runtime) = create_tokio_runtime() else {
            return;
        };

        runtime.block_on(async {
            if let Err(err) = self.run().await {
                #[cfg(feature = "tracing")]
                tracing::error!("failed to run the server: {err:#}");
                #[cfg(not(feature = "tracing"))]
                eprintln!("failed to run the server: {err:#}");
            }
        });
    }

    /// Runs the [`App`] in the current runtime until Ctrl+C
    ///
    /// # Errors
    /// Returns an `io::Error` if the address can't be bound.
    pub async fn run(self) -> io::Result<()> {
        let tcp_listener = TcpListener::bind(self.connection.socket).await?;
        self.run_with_listener(tcp_listener).await
    }

    /// Runs the [`App`] on an already bound listener until Ctrl+C
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    /// use tokio::net::TcpListener;
    ///
    /// #[tokio::main]
    /// async fn main() -> std::io::Result<()> {
    ///     let listener = TcpListener::bind("127.0.0.1:0").await?;
    ///     App::new().run_with_listener(listener).await
    /// }
    /// ```
    pub async fn run_with_listener(self, tcp_listener: TcpListener) -> io::Result<()> {
        self.run_until(tcp_listener, shutdown_signal()).await
    }

    /// Runs the [`App`] on an already bound listener until `shutdown` completes
    ///
    /// After that, no new connections are accepted and the in-flight ones
    /// get up to 10 seconds to finish. Then the `on_close` hooks run.
    pub async fn run_until<F>(self, tcp_listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send
    {
        let socket = tcp_listener.local_addr()?;
        let no_delay = self.no_delay;
        let active_connections = self.max_connections.map(|n| Arc::new(Semaphore::new(n)));
        let hooks = self.hooks.clone();

        let app_env: Arc<AppEnv> = Arc::new(self.into());
        let graceful_shutdown = GracefulShutdown::new();

        #[cfg(feature = "tracing")]
        tracing::info!("listening on: http://{socket}");
        hooks.run_listen(socket).await;

        tokio::pin!(shutdown);
        loop {
            let (stream, _) = tokio::select! {
                accepted = tcp_listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(_err) => {
                        #[cfg(feature = "tracing")]
                        tracing::error!("failed to accept connection: {_err:#}");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let permit = match active_connections.as_ref() {
                Some(sem) => match sem.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("incoming connection rejected: max_connections limit reached");
                        drop(stream);
                        continue;
                    }
                },
                None => None,
            };

            if let Err(_err) = stream.set_nodelay(no_delay) {
                #[cfg(feature = "tracing")]
                tracing::warn!("failed to set TCP_NODELAY on incoming connection: {_err:#}");
            }

            let app_env = Arc::downgrade(&app_env);
            let watcher = graceful_shutdown.watcher();
            tokio::spawn(async move {
                let _permit = permit;
                Self::handle_connection(stream, app_env, watcher).await
            });
        }

        #[cfg(feature = "tracing")]
        tracing::info!("shutdown requested, not accepting new connections");

        drop(tcp_listener);
        env::drain(graceful_shutdown).await;
        drop(app_env);

        hooks.run_close().await;
        Ok(())
    }

    #[inline]
    async fn handle_connection(stream: TcpStream, app_env: Weak<AppEnv>, watcher: Watcher) {
        let peer_addr: SocketAddr = match stream.peer_addr() {
            Ok(addr) => addr,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("failed to get peer address: {_err:#}");
                return;
            }
        };

        Server::new(TokioIo::new(stream), peer_addr)
            .serve(app_env, watcher)
            .await;
    }
}

/// Completes on Ctrl+C
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(_) => (),
        #[cfg(feature = "tracing")]
        Err(err) => tracing::error!("unable to listen for shutdown signal: {err:#}"),
        #[cfg(not(feature = "tracing"))]
        Err(_) => ()
    }
}

#[inline]
fn create_tokio_runtime() -> Option<tokio::runtime::Runtime> {
    if tokio::runtime::Handle::try_current().is_ok() {
        panic!("`App::run_blocking()` cannot be called inside an existing Tokio runtime. Use `run().await` instead.");
    }

    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => Some(runtime),
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::error!("failed to start the runtime: {_err:#}");
            #[cfg(not(feature = "tracing"))]
            eprintln!("failed to start the runtime: {_err:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::Duration;
    use crate::http::request::request_body_limit::RequestBodyLimit;
    use crate::App;

    #[test]
    fn it_binds_app_to_socket() {
        let app = App::new().bind("127.0.0.1:5001");

        assert_eq!(app.connection.socket, SocketAddr::from(([127, 0, 0, 1], 5001)));
    }

    #[test]
    fn it_sets_default_limits() {
        let app = App::new();

        assert_eq!(app.body_limit, RequestBodyLimit::Enabled(1_048_576));
        assert_eq!(app.max_header_size, 16 * 1024);
        assert_eq!(app.header_read_timeout, Duration::from_secs(72));
        assert_eq!(app.max_connections, None);
        assert_eq!(app.request_timeout, None);
        assert!(app.keep_alive);
    }

    #[test]
    fn it_configures_limits() {
        let app = App::new()
            .with_body_limit(10)
            .with_max_connections(2)
            .with_max_header_size(32 * 1024)
            .with_keep_alive(false)
            .with_request_timeout(Duration::from_secs(1))
            .with_no_delay();

        assert_eq!(app.body_limit, RequestBodyLimit::Enabled(10));
        assert_eq!(app.max_connections, Some(2));
        assert_eq!(app.max_header_size, 32 * 1024);
        assert_eq!(app.request_timeout, Some(Duration::from_secs(1)));
        assert!(!app.keep_alive);
        assert!(app.no_delay);
    }

    #[test]
    fn it_disables_body_limit() {
        let app = App::new().without_body_limit();

        assert_eq!(app.body_limit, RequestBodyLimit::Disabled);
    }

    #[tokio::test]
    async fn it_runs_listen_and_close_hooks() {
        use std::sync::{Arc, Mutex};

        let events = Arc::new(Mutex::new(Vec::new()));
        let mut app = App::new();
        let listen = events.clone();
        app.on_listen(move |addr: SocketAddr| {
            let listen = listen.clone();
            async move { listen.lock().unwrap().push(format!("listen {}", addr.ip())) }
        });
        let close = events.clone();
        app.on_close(move || {
            let close = close.clone();
            async move { close.lock().unwrap().push("close".to_owned()) }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        app.run_until(listener, async {}).await.unwrap();

        assert_eq!(*events.lock().unwrap(), ["listen 127.0.0.1", "close"]);
    }

    #[tokio::test]
    #[should_panic(expected = "cannot be called inside an existing Tokio runtime")]
    async fn it_panics_when_run_blocking_inside_runtime() {
        App::new().run_blocking();
    }
}
