//! File responses

use std::path::Path;
use tokio::fs::File;

use crate::{
    headers::{CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED},
    http::StatusCode,
    HttpBody,
    HttpResult,
    response
};

/// Streams a file from disk
///
/// `Content-Type` is guessed from the extension and `Last-Modified` comes
/// from the file metadata. A missing file is reported as `404`.
///
/// # Example
/// ```no_run
/// use mortar::{App, http::response::send_file};
///
/// let mut app = App::new();
///
/// app.map_get("/report", || send_file("reports/latest.pdf"));
/// ```
pub async fn send_file(path: impl AsRef<Path>) -> HttpResult {
    let path = path.as_ref();
    let file = File::open(path).await?;
    let metadata = file.metadata().await?;

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut response = response!(
        StatusCode::OK,
        HttpBody::file(file);
        [
            (CONTENT_TYPE, mime.as_ref()),
            (CONTENT_LENGTH, itoa::Buffer::new().format(metadata.len()))
        ]
    )?;

    if let Ok(modified) = metadata.modified() {
        response.headers_mut().insert(
            LAST_MODIFIED,
            httpdate::fmt_http_date(modified).parse()?);
    }

    Ok(response)
}
