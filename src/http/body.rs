//! Request and response bodies

use bytes::Bytes;
use futures_util::{TryStream, TryStreamExt};
use http_body_util::{
    BodyDataStream,
    BodyExt,
    Empty,
    Full,
    LengthLimitError,
    Limited,
    StreamBody
};
use hyper::body::{Body, Frame, Incoming, SizeHint};
use pin_project_lite::pin_project;
use serde::Serialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use std::{
    borrow::Cow,
    fmt,
    pin::Pin,
    task::{Context, Poll}
};

use crate::{
    error::{BoxError, Error},
    http::StatusCode
};

pub mod parser;

/// A type-erased body
pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, Error>;

pin_project! {
    /// Body of an [`HttpRequest`](crate::HttpRequest) or an [`HttpResponse`](crate::HttpResponse)
    ///
    /// Either the connection stream as it came from hyper, any boxed [`Body`],
    /// or one of them capped by the body limit.
    pub struct HttpBody {
        #[pin]
        kind: Kind
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind {
        Incoming { #[pin] body: Incoming },
        Boxed { #[pin] body: BoxBody },
        Capped { #[pin] body: Limited<BoxBody> },
    }
}

impl fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            Kind::Incoming { .. } => "incoming",
            Kind::Boxed { .. } => "boxed",
            Kind::Capped { .. } => "capped",
        };
        f.debug_tuple("HttpBody").field(&kind).finish()
    }
}

impl Body for HttpBody {
    type Data = Bytes;
    type Error = Error;

    #[inline]
    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Bytes>, Error>>> {
        match self.project().kind.project() {
            KindProj::Incoming { body } => body.poll_frame(cx).map_err(Error::client_error),
            KindProj::Boxed { body } => body.poll_frame(cx),
            KindProj::Capped { body } => body.poll_frame(cx).map_err(read_error),
        }
    }

    #[inline]
    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Incoming { body } => body.is_end_stream(),
            Kind::Boxed { body } => body.is_end_stream(),
            Kind::Capped { body } => body.is_end_stream(),
        }
    }

    #[inline]
    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Incoming { body } => body.size_hint(),
            Kind::Boxed { body } => body.size_hint(),
            Kind::Capped { body } => body.size_hint(),
        }
    }
}

impl HttpBody {
    /// Wraps an already boxed body
    #[inline]
    pub fn new(body: BoxBody) -> Self {
        Self { kind: Kind::Boxed { body } }
    }

    #[inline]
    pub(crate) fn incoming(body: Incoming) -> Self {
        Self { kind: Kind::Incoming { body } }
    }

    /// Caps the body at `limit` bytes; reading past it fails with `413`
    ///
    /// A body that is already capped keeps its limit.
    pub(crate) fn limited(self, limit: usize) -> Self {
        match self.kind {
            Kind::Capped { .. } => self,
            _ => Self { kind: Kind::Capped { body: Limited::new(self.into_boxed(), limit) } },
        }
    }

    /// Boxes any [`Body`] with [`Error`] as its error type
    pub fn boxed<B>(body: B) -> Self
    where
        B: Body<Data = Bytes, Error = Error> + Send + Sync + 'static
    {
        Self::new(body.boxed())
    }

    /// Returns the type-erased body
    pub fn into_boxed(self) -> BoxBody {
        match self.kind {
            Kind::Boxed { body } => body,
            Kind::Incoming { body } => body.map_err(Error::client_error).boxed(),
            Kind::Capped { body } => body.map_err(read_error).boxed(),
        }
    }

    /// Turns the body into a stream of data chunks, trailers are skipped
    #[inline]
    pub fn into_data_stream(self) -> BodyDataStream<HttpBody> {
        BodyExt::into_data_stream(self)
    }

    /// Buffers the whole body
    ///
    /// Fails with `413 Payload Too Large` once the body limit is exceeded.
    pub async fn into_bytes(self) -> Result<Bytes, Error> {
        Ok(self.collect().await?.to_bytes())
    }

    /// Serializes `content` into a JSON body
    pub fn json<T: Serialize>(content: T) -> Result<HttpBody, Error> {
        serde_json::to_vec(&content)
            .map(Self::full)
            .map_err(Error::server_error)
    }

    /// A body sent in one piece with an exact size hint
    pub fn full<T: Into<Bytes>>(chunk: T) -> HttpBody {
        Self::boxed(Full::new(chunk.into()).map_err(Error::from))
    }

    /// A body without data
    #[inline]
    pub fn empty() -> HttpBody {
        Self::boxed(Empty::<Bytes>::new().map_err(Error::from))
    }

    /// Streams the file contents
    #[inline]
    pub fn file(file: File) -> HttpBody {
        Self::stream(ReaderStream::new(file))
    }

    /// Streams chunks produced by `stream`, the size is unknown up front
    pub fn stream<S>(stream: S) -> HttpBody
    where
        S: TryStream + Send + Sync + 'static,
        S::Ok: Into<Bytes>,
        S::Error: Into<BoxError>
    {
        let frames = stream
            .map_ok(|chunk| Frame::data(chunk.into()))
            .map_err(|err| read_error(err.into()));
        Self::boxed(StreamBody::new(frames))
    }
}

impl From<Cow<'static, str>> for HttpBody {
    #[inline]
    fn from(text: Cow<'static, str>) -> Self {
        Self::boxed(Full::from(text).map_err(Error::from))
    }
}

/// Keeps `413` for an exceeded limit and an [`Error`] raised by the inner body as is
fn read_error(err: BoxError) -> Error {
    if err.is::<LengthLimitError>() {
        return Error::from_parts(StatusCode::PAYLOAD_TOO_LARGE, None, err);
    }
    err.downcast::<Error>()
        .map(|err| *err)
        .unwrap_or_else(Error::client_error)
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use hyper::body::Body;
    use crate::HttpBody;

    #[tokio::test]
    async fn it_fails_with_413_past_the_limit() {
        let body = HttpBody::full("Hello, World!").limited(5);

        let err = body.into_bytes().await.unwrap_err();

        assert_eq!(err.status, 413);
    }

    #[tokio::test]
    async fn it_reads_body_within_limit() {
        let body = HttpBody::full("Hello, World!").limited(100);

        assert_eq!(body.into_bytes().await.unwrap(), "Hello, World!");
    }

    #[tokio::test]
    async fn it_keeps_the_first_limit() {
        let body = HttpBody::full("Hello, World!").limited(5).limited(100);

        assert!(body.into_bytes().await.is_err());
    }

    #[tokio::test]
    async fn it_collects_stream_chunks() {
        let body = HttpBody::stream(stream::iter([Ok::<_, std::io::Error>("a"), Ok("b")]));

        assert!(body.size_hint().exact().is_none());
        assert_eq!(body.into_bytes().await.unwrap(), "ab");
    }

    #[test]
    fn it_has_exact_size_hint_for_full_body() {
        let body = HttpBody::full("12345");

        assert_eq!(body.size_hint().exact(), Some(5));
    }

    #[test]
    fn it_serializes_json() {
        let body = HttpBody::json(serde_json::json!({ "a": 1 })).unwrap();

        assert_eq!(body.size_hint().exact(), Some(7));
    }
}
