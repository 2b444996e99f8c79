//! Extractor for the application settings

use std::{
    future::{ready, Ready},
    ops::Deref,
    sync::Arc
};

use crate::{error::Error, Settings};
use crate::http::{
    Parts,
    endpoints::args::{FromPayload, FromRequestParts, Payload, Source}
};

/// Read-only view of the settings the server was started with
///
/// # Example
/// ```no_run
/// use mortar::{App, AppSettings, ok};
///
/// let mut app = App::new();
///
/// app.map_get("/env", |settings: AppSettings| async move {
///     ok!("{}", settings.env())
/// });
/// ```
#[derive(Debug, Clone)]
pub struct AppSettings(Arc<Settings>);

impl AppSettings {
    #[inline]
    pub(crate) fn new(settings: Arc<Settings>) -> Self {
        Self(settings)
    }
}

impl Deref for AppSettings {
    type Target = Settings;

    #[inline]
    fn deref(&self) -> &Settings {
        &self.0
    }
}

impl FromRequestParts for AppSettings {
    #[inline]
    fn from_parts(parts: &Parts) -> Result<Self, Error> {
        parts.extensions
            .get::<AppSettings>()
            .cloned()
            .ok_or_else(|| Error::server_error("Application settings are unavailable"))
    }
}

impl FromPayload for AppSettings {
    type Future = Ready<Result<Self, Error>>;

    #[inline]
    fn from_payload(payload: Payload<'_>) -> Self::Future {
        match payload {
            Payload::Parts(parts) => ready(Self::from_parts(parts)),
            _ => ready(Err(Error::server_error("Application settings are unavailable"))),
        }
    }

    #[inline]
    fn source() -> Source {
        Source::Parts
    }
}
