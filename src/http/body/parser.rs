//! Content-type based request body decoding

use bytes::Bytes;
use futures_util::future::BoxFuture;
use mime::Mime;
use serde_json::{Map, Value};
use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use crate::{
    App,
    Flow,
    HttpBody,
    HttpRequest,
    error::Error,
    headers::{CONTENT_ENCODING, CONTENT_TYPE},
    http::{Method, StatusCode},
    status
};

/// A request body decoded by one of the content-type parsers
///
/// It is stored in the request extensions and can be extracted by handlers.
///
/// # Example
/// ```no_run
/// use mortar::{App, ParsedBody, ok};
///
/// let mut app = App::new();
///
/// app.map_post("/echo", |body: ParsedBody| async move {
///     match body {
///         ParsedBody::Json(value) => ok!(value),
///         ParsedBody::Text(text) => ok!(text: text),
///         _ => ok!()
///     }
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParsedBody {
    /// No parser matched or the request has no body
    #[default]
    None,
    /// JSON document or url-encoded form represented as a JSON object
    Json(Value),
    /// `text/*` body
    Text(String),
    /// `application/octet-stream` body
    Bytes(Bytes),
}

impl ParsedBody {
    /// Returns the JSON value if the body has been parsed as JSON or form data
    #[inline]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }
}

/// Reasons a built-in parser rejects a body
#[derive(Debug, Clone, Copy)]
pub(crate) enum InvalidBody {
    Json,
    Form,
}

impl fmt::Display for InvalidBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("Invalid JSON format"),
            Self::Form => f.write_str("Invalid form data"),
        }
    }
}

impl std::error::Error for InvalidBody {}

impl From<InvalidBody> for Error {
    #[inline]
    fn from(err: InvalidBody) -> Self {
        Error::client_error(err)
    }
}

/// A function that decodes the request body
pub(crate) type ParserFn = Arc<
    dyn Fn(HttpRequest) -> BoxFuture<'static, Result<HttpRequest, Error>>
    + Send
    + Sync
>;

/// Registry of body parsers keyed by mime essence, e.g. `application/json` or `text/*`
#[derive(Clone)]
pub(crate) struct ContentTypeParsers {
    parsers: HashMap<String, ParserFn>,
}

impl fmt::Debug for ContentTypeParsers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentTypeParsers")
            .field("types", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ContentTypeParsers {
    fn default() -> Self {
        let mut parsers = Self { parsers: HashMap::new() };
        parsers.insert("application/json", Arc::new(|req: HttpRequest| Box::pin(parse_json(req))));
        parsers.insert("application/x-www-form-urlencoded", Arc::new(|req: HttpRequest| Box::pin(parse_form(req))));
        parsers.insert("text/*", Arc::new(|req: HttpRequest| Box::pin(parse_text(req))));
        parsers.insert("application/octet-stream", Arc::new(|req: HttpRequest| Box::pin(parse_bytes(req))));
        parsers
    }
}

impl ContentTypeParsers {
    /// Adds or replaces a parser for the mime type
    #[inline]
    pub(crate) fn insert(&mut self, content_type: &str, parser: ParserFn) {
        self.parsers.insert(content_type.trim().to_ascii_lowercase(), parser);
    }

    /// Finds a parser by the exact mime essence first, then by `type/*`
    pub(crate) fn find(&self, mime: &Mime) -> Option<&ParserFn> {
        let essence = mime.essence_str().to_ascii_lowercase();
        self.parsers
            .get(&essence)
            .or_else(|| self.parsers.get(&format!("{}/*", mime.type_().as_str().to_ascii_lowercase())))
    }

    /// Decodes the request body according to its `Content-Encoding` and `Content-Type`
    ///
    /// Built-in parser failures are turned into a `400` reply with a JSON body.
    pub(crate) async fn decode(&self, req: HttpRequest) -> Result<Flow, Error> {
        if !has_body(req.method()) {
            return Ok(Flow::Next(req));
        }

        let req = decompress(req)?;
        let Some(parser) = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Mime>().ok())
            .and_then(|mime| self.find(&mime)) else {
            return Ok(Flow::Next(req));
        };

        match parser(req).await {
            Ok(req) => Ok(Flow::Next(req)),
            Err(err) => match err.inner.downcast_ref::<InvalidBody>() {
                Some(invalid) => status!(400, { "error": invalid.to_string() }).map(Flow::Reply),
                None => Err(err),
            }
        }
    }
}

impl App {
    /// Registers a body parser for one or more content types
    ///
    /// Replaces the built-in parser for the same type if there is one.
    /// The parser receives the request after decompression and returns it back,
    /// usually with a [`ParsedBody`] stored in its extensions.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, ParsedBody};
    ///
    /// let mut app = App::new();
    ///
    /// app.add_content_type_parser(["application/csv"], |req: mortar::HttpRequest| async move {
    ///     let (parts, body) = req.into_parts();
    ///     let bytes = body.into_bytes().await?;
    ///     let text = String::from_utf8_lossy(&bytes).replace(',', ";");
    ///     let mut req = mortar::HttpRequest::from_parts(parts, mortar::HttpBody::full(bytes));
    ///     req.extensions_mut().insert(ParsedBody::Text(text));
    ///     Ok(req)
    /// });
    /// ```
    pub fn add_content_type_parser<I, S, F, Fut>(&mut self, content_types: I, parser: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpRequest, Error>> + Send + 'static,
    {
        let parser: ParserFn = Arc::new(move |req: HttpRequest| Box::pin(parser(req)));
        for content_type in content_types {
            self.parsers.insert(content_type.as_ref(), parser.clone());
        }
        self
    }
}

#[inline]
fn has_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

fn decompress(req: HttpRequest) -> Result<HttpRequest, Error> {
    let Some(encoding) = req
        .headers()
        .get(CONTENT_ENCODING)
        .map(|v| v.to_str().unwrap_or_default().trim().to_ascii_lowercase()) else {
        return Ok(req);
    };

    if encoding.is_empty() || encoding == "identity" {
        return Ok(req);
    }

    #[cfg(feature = "decompression")]
    return crate::middleware::decompress::decompress_request(req, &encoding);

    #[cfg(not(feature = "decompression"))]
    Err(unsupported_encoding(&encoding))
}

/// Creates a `415` error for a `Content-Encoding` that can't be decoded
#[inline]
pub(crate) fn unsupported_encoding(encoding: &str) -> Error {
    Error::from_parts(
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        None,
        format!("Unsupported Content-Encoding: {encoding}"))
}

/// Reads the whole body, runs `parse` over it and puts the raw bytes back for extractors
async fn buffered<F>(req: HttpRequest, parse: F) -> Result<HttpRequest, Error>
where
    F: FnOnce(&Bytes) -> Result<ParsedBody, Error>
{
    let (parts, body) = req.into_parts();
    let bytes = body.into_bytes().await?;
    let parsed = parse(&bytes)?;

    let mut req = HttpRequest::from_parts(parts, HttpBody::full(bytes));
    req.extensions_mut().insert(parsed);
    Ok(req)
}

async fn parse_json(req: HttpRequest) -> Result<HttpRequest, Error> {
    buffered(req, |bytes| {
        if bytes.is_empty() {
            return Ok(ParsedBody::None);
        }
        serde_json::from_slice(bytes)
            .map(ParsedBody::Json)
            .map_err(|_| InvalidBody::Json.into())
    }).await
}

async fn parse_form(req: HttpRequest) -> Result<HttpRequest, Error> {
    buffered(req, |bytes| form_to_json(bytes).map(ParsedBody::Json)).await
}

async fn parse_text(req: HttpRequest) -> Result<HttpRequest, Error> {
    buffered(req, |bytes| Ok(ParsedBody::Text(String::from_utf8_lossy(bytes).into_owned()))).await
}

async fn parse_bytes(req: HttpRequest) -> Result<HttpRequest, Error> {
    buffered(req, |bytes| Ok(ParsedBody::Bytes(bytes.clone()))).await
}

/// Turns `a=1&b=2&b=3` into `{"a":"1","b":["2","3"]}`
pub(crate) fn form_to_json(bytes: &[u8]) -> Result<Value, Error> {
    let pairs = serde_urlencoded::from_bytes::<Vec<(String, String)>>(bytes)
        .map_err(|_| InvalidBody::Form)?;

    let mut map = Map::new();
    for (key, value) in pairs {
        merge_field(&mut map, key, Value::String(value));
    }
    Ok(Value::Object(map))
}

/// Inserts a field, turning repeated names into arrays
pub(crate) fn merge_field(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, value);
        },
        Some(Value::Array(values)) => values.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}
