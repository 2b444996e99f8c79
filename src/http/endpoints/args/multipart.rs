//! Extractors for files uploaded with `multipart/form-data`

use indexmap::IndexMap;
use serde::Serialize;
use std::{
    future::{ready, Ready},
    ops::Deref,
    path::PathBuf
};

use crate::error::Error;
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

/// A file stored on disk by the multipart parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    /// Form field the file was sent in
    pub field_name: String,
    /// File name supplied by the client
    pub original_name: Option<String>,
    /// `Content-Type` of the part, if the client sent one
    pub content_type: Option<String>,
    /// Where the file has been saved
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Uploaded files grouped by form field, in the order they were received
///
/// Empty if the request wasn't a multipart one or carried no files.
///
/// # Example
/// ```no_run
/// use mortar::{App, Files, ok};
/// use mortar::middleware::multer::MulterConfig;
///
/// let mut app = App::new();
///
/// app.use_multer(MulterConfig::new("uploads"));
/// app.map_post("/upload", |files: Files| async move {
///     ok!(files.into_inner())
/// });
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Files(pub IndexMap<String, Vec<UploadedFile>>);

impl Files {
    /// Unwraps the inner map
    #[inline]
    pub fn into_inner(self) -> IndexMap<String, Vec<UploadedFile>> {
        self.0
    }

    /// Returns the first file sent in the field
    #[inline]
    pub fn first(&self, field: &str) -> Option<&UploadedFile> {
        self.0.get(field).and_then(|files| files.first())
    }

    #[inline]
    pub(crate) fn push(&mut self, file: UploadedFile) {
        self.0
            .entry(file.field_name.clone())
            .or_default()
            .push(file);
    }
}

impl Deref for Files {
    type Target = IndexMap<String, Vec<UploadedFile>>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts for Files {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        Ok(parts.extensions
            .get::<Files>()
            .cloned()
            .unwrap_or_default())
    }
}

impl FromPayload for Files {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Ok(Files::default())),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}
