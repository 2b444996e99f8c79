//! Request body decompression
//!
//! Runs as the first step of body decoding when a request carries `Content-Encoding`.

use async_compression::tokio::bufread::{BrotliDecoder, GzipDecoder, ZlibDecoder};
use futures_util::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};

use crate::{
    error::Error,
    headers::{CONTENT_ENCODING, CONTENT_LENGTH},
    http::{
        body::parser::unsupported_encoding,
        request::request_body_limit::RequestBodyLimit
    },
    HttpBody,
    HttpRequest,
};

/// Decodes the request body compressed with `encoding`
///
/// `br`, `gzip` and `deflate` are supported, anything else is a `415`.
/// The body limit applies to the decompressed size as well.
pub(crate) fn decompress_request(req: HttpRequest, encoding: &str) -> Result<HttpRequest, Error> {
    let (mut parts, body) = req.into_parts();
    let reader = StreamReader::new(body
        .into_data_stream()
        .map_err(std::io::Error::from));

    let body = match encoding {
        "br" => decoded(BrotliDecoder::new(reader)),
        "gzip" | "x-gzip" => {
            let mut decoder = GzipDecoder::new(reader);
            decoder.multiple_members(true);
            decoded(decoder)
        },
        "deflate" => decoded(ZlibDecoder::new(reader)),
        _ => return Err(unsupported_encoding(encoding)),
    };

    parts.headers.remove(CONTENT_ENCODING);
    parts.headers.remove(CONTENT_LENGTH);

    let body_limit = parts.extensions
        .get::<RequestBodyLimit>()
        .copied()
        .unwrap_or(RequestBodyLimit::Disabled);

    Ok(HttpRequest::from_parts(parts, body).into_limited(body_limit))
}

#[inline]
fn decoded<R>(decoder: R) -> HttpBody
where
    R: AsyncRead + Send + Sync + 'static
{
    HttpBody::stream(ReaderStream::new(decoder).map_err(read_error))
}

/// Restores the original [`Error`] if the compressed stream failed, e.g. on an exceeded limit
fn read_error(err: std::io::Error) -> Error {
    let message = err.to_string();
    match err.into_inner().map(|inner| inner.downcast::<Error>()) {
        Some(Ok(err)) => *err,
        Some(Err(inner)) => Error::client_error(inner),
        None => Error::client_error(message),
    }
}

#[cfg(test)]
mod tests {
    use async_compression::tokio::write::{BrotliEncoder, GzipEncoder, ZlibEncoder};
    use tokio::io::AsyncWriteExt;
    use crate::http::Request;
    use super::*;

    async fn request(encoding: &str, body: Vec<u8>) -> HttpRequest {
        HttpRequest::new(Request::post("/")
            .header(CONTENT_ENCODING, encoding)
            .header(CONTENT_LENGTH, body.len())
            .body(HttpBody::full(body))
            .unwrap())
    }

    async fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzipEncoder::new(Vec::new());
        encoder.write_all(data).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    async fn read(req: HttpRequest) -> Result<bytes::Bytes, Error> {
        req.into_body().into_bytes().await
    }

    #[tokio::test]
    async fn it_decompresses_gzip() {
        let req = decompress_request(request("gzip", gzip(b"hello gzip").await).await, "gzip").unwrap();

        assert!(!req.headers().contains_key(CONTENT_ENCODING));
        assert!(!req.headers().contains_key(CONTENT_LENGTH));
        assert_eq!(read(req).await.unwrap(), "hello gzip");
    }

    #[tokio::test]
    async fn it_decompresses_deflate() {
        let mut encoder = ZlibEncoder::new(Vec::new());
        encoder.write_all(b"hello deflate").await.unwrap();
        encoder.shutdown().await.unwrap();

        let req = decompress_request(request("deflate", encoder.into_inner()).await, "deflate").unwrap();

        assert_eq!(read(req).await.unwrap(), "hello deflate");
    }

    #[tokio::test]
    async fn it_decompresses_brotli() {
        let mut encoder = BrotliEncoder::new(Vec::new());
        encoder.write_all(b"hello br").await.unwrap();
        encoder.shutdown().await.unwrap();

        let req = decompress_request(request("br", encoder.into_inner()).await, "br").unwrap();

        assert_eq!(read(req).await.unwrap(), "hello br");
    }

    #[tokio::test]
    async fn it_rejects_unknown_encoding() {
        let err = decompress_request(request("zstd", vec![1, 2, 3]).await, "zstd").unwrap_err();

        assert_eq!(err.status, 415);
    }

    #[tokio::test]
    async fn it_fails_on_corrupted_body() {
        let req = decompress_request(request("gzip", b"not gzip at all".to_vec()).await, "gzip").unwrap();

        assert_eq!(read(req).await.unwrap_err().status, 400);
    }

    #[tokio::test]
    async fn it_limits_decompressed_body() {
        let req = request("gzip", gzip(&[b'a'; 4096]).await)
            .await
            .into_limited(RequestBodyLimit::Enabled(1024));

        let req = decompress_request(req, "gzip").unwrap();

        assert_eq!(read(req).await.unwrap_err().status, 413);
    }
}
