//! Multipart form parser that stores uploaded files on disk

use serde_json::{Map, Value};
use std::{path::{Path, PathBuf}, sync::Arc};
use tokio::{fs::File, io::{AsyncWriteExt, BufWriter}};
use uuid::Uuid;

use crate::{
    error::Error,
    headers::CONTENT_TYPE,
    http::body::parser::{merge_field, InvalidBody},
    App,
    Files,
    HttpBody,
    HttpRequest,
    ParsedBody,
    UploadedFile
};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Multipart parser configuration
///
/// # Example
/// ```no_run
/// use mortar::middleware::multer::MulterConfig;
///
/// let config = MulterConfig::new("uploads")
///     .with_max_file_size(10 * 1024 * 1024)
///     .with_field_limit(16);
/// ```
#[derive(Debug, Clone)]
pub struct MulterConfig {
    dest: PathBuf,
    max_file_size: Option<u64>,
    field_limit: Option<usize>,
}

impl MulterConfig {
    /// Creates a configuration that saves files into `dest`
    ///
    /// The directory is created on the first upload if it doesn't exist.
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            max_file_size: None,
            field_limit: None,
        }
    }

    /// Sets the maximum size of a single file in bytes
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    /// Sets the maximum number of parts, files and text fields together
    pub fn with_field_limit(mut self, limit: usize) -> Self {
        self.field_limit = Some(limit);
        self
    }

    async fn parse(&self, req: HttpRequest) -> Result<HttpRequest, Error> {
        let boundary = req.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| multer::parse_boundary(value).ok())
            .ok_or(InvalidBody::Form)?;

        tokio::fs::create_dir_all(&self.dest).await?;

        let (mut parts, body) = req.into_parts();
        let mut multipart = multer::Multipart::new(body.into_data_stream(), boundary);

        let mut fields = Map::new();
        let mut files = Files::default();
        if let Err(err) = self.read(&mut multipart, &mut fields, &mut files).await {
            remove_files(&files).await;
            return Err(err);
        }

        parts.extensions.insert(ParsedBody::Json(Value::Object(fields)));
        parts.extensions.insert(files);
        Ok(HttpRequest::from_parts(parts, HttpBody::empty()))
    }

    async fn read(
        &self,
        multipart: &mut multer::Multipart<'static>,
        fields: &mut Map<String, Value>,
        files: &mut Files
    ) -> Result<(), Error> {
        let mut count = 0;
        while let Some(field) = multipart.next_field().await.map_err(|_| InvalidBody::Form)? {
            count += 1;
            if self.field_limit.is_some_and(|limit| count > limit) {
                return Err(InvalidBody::Form.into());
            }

            let name = field.name()
                .map(str::to_owned)
                .ok_or(InvalidBody::Form)?;

            if field.file_name().is_some() {
                files.push(self.save(name, field).await?);
            } else {
                let text = field.text().await.map_err(|_| InvalidBody::Form)?;
                merge_field(fields, name, Value::String(text));
            }
        }
        Ok(())
    }

    async fn save(&self, field_name: String, mut field: multer::Field<'static>) -> Result<UploadedFile, Error> {
        let original_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(ToString::to_string);
        let path = self.dest.join(Uuid::new_v4().to_string());

        match self.write(&path, &mut field).await {
            Ok(size) => Ok(UploadedFile {
                field_name,
                original_name,
                content_type,
                path,
                size
            }),
            Err(err) => {
                remove_file(&path).await;
                Err(err)
            }
        }
    }

    async fn write(&self, path: &Path, field: &mut multer::Field<'static>) -> Result<u64, Error> {
        let mut writer = BufWriter::new(File::create(path).await?);
        let mut size = 0;
        while let Some(chunk) = field.chunk().await.map_err(|_| InvalidBody::Form)? {
            size += chunk.len() as u64;
            if self.max_file_size.is_some_and(|max| size > max) {
                return Err(InvalidBody::Form.into());
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        Ok(size)
    }
}

async fn remove_files(files: &Files) {
    for file in files.values().flatten() {
        remove_file(&file.path).await;
    }
}

async fn remove_file(path: &Path) {
    if let Err(_err) = tokio::fs::remove_file(path).await {
        #[cfg(feature = "tracing")]
        tracing::warn!("failed to remove partial upload {}: {_err}", path.display());
    }
}

impl App {
    /// Registers a `multipart/form-data` body parser
    ///
    /// Text fields end up in [`ParsedBody::Json`] as an object, files are streamed
    /// to the destination folder under random names and listed by the [`Files`] extractor.
    /// A malformed body or an exceeded limit gives `400 {"error":"Invalid form data"}`.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, Files, ParsedBody, ok};
    /// use mortar::middleware::multer::MulterConfig;
    ///
    /// let mut app = App::new();
    ///
    /// app.use_multer(MulterConfig::new("uploads").with_max_file_size(1024 * 1024));
    /// app.map_post("/upload", |body: ParsedBody, files: Files| async move {
    ///     ok!({ "fields": body.as_json(), "files": files.len() })
    /// });
    /// ```
    pub fn use_multer(&mut self, config: MulterConfig) -> &mut Self {
        let config = Arc::new(config);
        self.add_content_type_parser([MULTIPART_FORM_DATA], move |req: HttpRequest| {
            let config = config.clone();
            async move { config.parse(req).await }
        })
    }
}
