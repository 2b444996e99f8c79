//! Streaming responses: the `stream!` macro and [`BodyWriter`]

use bytes::Bytes;
use hyper::body::{Body, Frame};
use tokio::sync::mpsc;

use std::{
    pin::Pin,
    task::{Context, Poll}
};

use crate::{
    error::Error,
    headers::HeaderMap,
    http::StatusCode,
    HttpBody,
    HttpResponse,
    HttpResult
};

const WRITER_CAPACITY: usize = 16;

/// Produces a `200 OK` response that streams the given
/// [`TryStream`](futures_util::TryStream) of byte chunks.
///
/// # Example
/// ```no_run
/// use mortar::stream;
/// use futures_util::stream::iter;
///
/// let chunks = iter([Ok::<_, std::io::Error>("hello "), Ok("world")]);
/// let response = stream!(chunks; [("content-type", "text/plain")]);
/// ```
#[macro_export]
macro_rules! stream {
    ($body:expr) => {
        $crate::stream!($body; [])
    };
    ($body:expr; [ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::response!(
            $crate::http::StatusCode::OK,
            $crate::HttpBody::stream($body);
            [ $( ($key, $value) ),* ]
        )
    };
}

/// Sends the body of a streaming response chunk by chunk
///
/// The body ends when the writer is dropped.
#[derive(Debug)]
pub struct BodyWriter {
    tx: mpsc::Sender<Bytes>
}

impl BodyWriter {
    /// Sends a chunk to the client
    ///
    /// Fails if the client has gone away.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<(), Error> {
        self.tx
            .send(chunk.into())
            .await
            .map_err(|_| Error::client_error("Client disconnected"))
    }

    /// Returns `true` if the response body has been dropped, e.g. after a client disconnect
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Ends the body
    #[inline]
    pub fn end(self) {}
}

/// A response body fed by a [`BodyWriter`]
struct ChannelBody {
    rx: mpsc::Receiver<Bytes>
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Error;

    #[inline]
    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Error>>> {
        self.rx
            .poll_recv(cx)
            .map(|chunk| chunk.map(|chunk| Ok(Frame::data(chunk))))
    }
}

impl HttpResponse {
    /// Creates a response whose body is written progressively through the returned [`BodyWriter`]
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, HttpResponse, http::StatusCode, headers::HeaderMap};
    ///
    /// let mut app = App::new();
    ///
    /// app.map_get("/events", || async {
    ///     let (writer, response) = HttpResponse::writer(StatusCode::OK, HeaderMap::new())?;
    ///     tokio::spawn(async move {
    ///         for i in 0..3 {
    ///             if writer.write(format!("tick {i}\n")).await.is_err() {
    ///                 break;
    ///             }
    ///         }
    ///     });
    ///     Ok::<_, mortar::error::Error>(response)
    /// });
    /// ```
    pub fn writer(status: StatusCode, headers: HeaderMap) -> Result<(BodyWriter, HttpResponse), Error> {
        let (tx, rx) = mpsc::channel(WRITER_CAPACITY);
        let response = crate::builder!(status)
            .headers(headers)
            .body(HttpBody::boxed(ChannelBody { rx }))?;
        Ok((BodyWriter { tx }, response))
    }
}

/// Wraps a [`BodyWriter`] producer into a streaming [`HttpResult`]
///
/// The producer is spawned and the response is returned right away.
pub fn write_with<F, Fut>(status: StatusCode, headers: HeaderMap, producer: F) -> HttpResult
where
    F: FnOnce(BodyWriter) -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let (writer, response) = HttpResponse::writer(status, headers)?;
    tokio::spawn(producer(writer));
    Ok(response)
}
