//! Outcome of a route filter

use crate::error::{BoxError, Error};

/// Whether a request passed a [`filter`](crate::App::filter)
///
/// Built from `bool`, `()` or `Result<(), E>`. A rejected request is answered with `400`.
#[derive(Debug)]
pub struct FilterResult(Result<(), Error>);

impl FilterResult {
    /// The request passes
    #[inline]
    pub fn pass() -> Self {
        Self(Ok(()))
    }

    /// The request is rejected with a generic message
    #[inline]
    pub fn reject() -> Self {
        Self(Err(Error::client_error("Filter: the request has been rejected")))
    }

    /// The request is rejected with the given reason
    #[inline]
    pub fn reject_with(reason: impl Into<BoxError>) -> Self {
        Self(Err(Error::client_error(reason)))
    }

    /// Unwraps the inner result
    #[inline]
    pub fn into_inner(self) -> Result<(), Error> {
        self.0
    }
}

impl From<bool> for FilterResult {
    #[inline]
    fn from(passed: bool) -> Self {
        if passed { Self::pass() } else { Self::reject() }
    }
}

impl From<()> for FilterResult {
    #[inline]
    fn from(_: ()) -> Self {
        Self::pass()
    }
}

impl<E: Into<BoxError>> From<Result<(), E>> for FilterResult {
    #[inline]
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::pass(),
            Err(err) => Self::reject_with(err),
        }
    }
}
