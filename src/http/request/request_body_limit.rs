//! Request Body Limit

const DEFAULT_BODY_SIZE: usize = 1024 * 1024; // 1 MiB

/// Represents whether a request body has a configured limit or not
///
/// Default: 1 MiB
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum RequestBodyLimit {
    /// Body limit completely disabled
    Disabled,
    /// Configured body limit with a specific size
    Enabled(usize),
}

impl Default for RequestBodyLimit {
    #[inline]
    fn default() -> Self {
        Self::Enabled(DEFAULT_BODY_SIZE)
    }
}
