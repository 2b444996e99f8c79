//! Errors and how they turn into responses

use std::{
    convert::Infallible,
    error::Error as StdError,
    fmt,
    future::Future,
    io::{Error as IoError, ErrorKind}
};

use super::{
    App,
    headers::{InvalidHeaderName, InvalidHeaderValue},
    http::{
        endpoints::handlers::Func,
        FromRequest,
        GenericHandler,
        IntoResponse,
        StatusCode,
    }
};

pub use self::handler::{ErrorHandler, ErrorFunc};

pub mod handler;
pub mod fallback;

/// Any error that can be sent across threads
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An error with the status code it should be answered with
///
/// Displays as the inner error, so `status!(err.status, text: err)` replies with its message.
#[derive(Debug)]
pub struct Error {
    /// Status code of the reply
    pub status: StatusCode,

    /// Where the error happened, e.g. the request path
    pub instance: Option<String>,

    pub(crate) inner: BoxError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl Error {
    /// A `500 Internal Server Error` that happened at `instance`
    #[inline]
    pub fn new(instance: &str, err: impl Into<BoxError>) -> Self {
        Self::server_error(err).with_instance(instance)
    }

    /// A `500 Internal Server Error`
    #[inline]
    pub fn server_error(err: impl Into<BoxError>) -> Self {
        Self::from_parts(StatusCode::INTERNAL_SERVER_ERROR, None, err)
    }

    /// A `400 Bad Request`
    #[inline]
    pub fn client_error(err: impl Into<BoxError>) -> Self {
        Self::from_parts(StatusCode::BAD_REQUEST, None, err)
    }

    /// Builds an error from its status, instance and cause
    #[inline]
    pub fn from_parts(status: StatusCode, instance: Option<String>, err: impl Into<BoxError>) -> Self {
        Self { status, instance, inner: err.into() }
    }

    /// Sets where the error happened
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Returns the cause
    #[inline]
    pub fn into_inner(self) -> BoxError {
        self.inner
    }

    /// Splits the error into status, instance and cause
    #[inline]
    pub fn into_parts(self) -> (StatusCode, Option<String>, BoxError) {
        (self.status, self.instance, self.inner)
    }

    /// `true` for 5xx errors
    #[inline]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// `true` for 4xx errors
    #[inline]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }
}

macro_rules! impl_from {
    ($ctor:ident: $($ty:ty),+ $(,)?) => {
        $(
        impl From<$ty> for Error {
            #[inline]
            fn from(err: $ty) -> Self {
                Self::$ctor(err)
            }
        }
        )+
    };
}

impl_from!(client_error: serde_json::Error, serde_urlencoded::de::Error);
impl_from!(server_error:
    hyper::Error,
    hyper::http::Error,
    hyper::http::status::InvalidStatusCode,
    InvalidHeaderName,
    InvalidHeaderValue,
);

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::from_parts(io_status(err.kind()), None, err)
    }
}

impl From<Error> for IoError {
    #[inline]
    fn from(err: Error) -> Self {
        Self::other(err)
    }
}

/// Status code an I/O failure is answered with
fn io_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => StatusCode::BAD_REQUEST,
        ErrorKind::TimedOut => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl App {
    /// Sets a global error handler
    ///
    /// It receives every error that reaches the top of the pipeline,
    /// after the `on_error` hooks have seen it.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, error::Error, status};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> std::io::Result<()> {
    ///  let mut app = App::new();
    ///
    ///  app.map_err(|error: Error| async move {
    ///     status!(500, { "error_message": error.to_string() })
    ///  });
    /// # app.run().await
    /// # }
    /// ```
    pub fn map_err<F, R, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Error) -> Fut + Send + Sync + 'static,
        R: IntoResponse,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.pipeline
            .set_error_handler(ErrorFunc(handler).into());
        self
    }

    /// Sets a special fallback handler that handles the unregistered paths
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, not_found};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> std::io::Result<()> {
    ///  let mut app = App::new();
    ///
    ///  app.map_fallback(|| async {
    ///     not_found!("Nothing here")
    ///  });
    /// # app.run().await
    /// # }
    /// ```
    pub fn map_fallback<F, Args, R>(&mut self, handler: F) -> &mut Self
    where
        F: GenericHandler<Args, Output = R>,
        Args: FromRequest + Send + Sync + 'static,
        R: IntoResponse + 'static
    {
        self.pipeline
            .set_fallback_handler(Func::new(handler));
        self
    }
}
