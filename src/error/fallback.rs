//! Fallback handler

use crate::{HttpResult, status};

/// Default fallback handler that creates a 404 [`HttpResult`]
#[inline]
pub(crate) async fn default_fallback_handler() -> HttpResult {
    status!(404, "Not Found")
}
