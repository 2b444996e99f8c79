//! Request tracing

use crate::App;

const DEFAULT_SPAN_HEADER_NAME: &str = "request-id";

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Specifies whether to include the span id as an HTTP header
    ///
    /// Default: `false`
    include_header: bool,

    /// Span id HTTP header name
    ///
    /// Default: `request-id`
    span_header_name: &'static str,
}

impl Default for TracingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            include_header: false,
            span_header_name: DEFAULT_SPAN_HEADER_NAME,
        }
    }
}

impl TracingConfig {
    /// Creates a default tracing configuration
    ///
    /// Defaults:
    /// - include_header: `false`
    /// - span_header_name: `request-id`
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes the span id into every response as an HTTP header
    pub fn with_header(mut self) -> Self {
        self.include_header = true;
        self
    }

    /// Sets the name of the span id header
    ///
    /// Default: `request-id`
    pub fn with_header_name(mut self, name: &'static str) -> Self {
        self.span_header_name = name;
        self
    }

    #[inline]
    pub(crate) fn include_header(&self) -> bool {
        self.include_header
    }

    #[inline]
    pub(crate) fn header_name(&self) -> &'static str {
        self.span_header_name
    }
}

impl App {
    /// Sets the tracing configuration used by [`App::use_tracing`]
    pub fn with_tracing(mut self, config: TracingConfig) -> Self {
        self.tracing_config = Some(config);
        self
    }

    /// Wraps each request into its own `request` span with `method` and `uri` fields
    ///
    /// The span covers everything from the `on_request` hooks to the `on_send` hooks.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, tracing::TracingConfig};
    ///
    /// let mut app = App::new().with_tracing(TracingConfig::new().with_header());
    ///
    /// app.use_tracing();
    /// ```
    pub fn use_tracing(&mut self) -> &mut Self {
        if self.tracing_config.is_none() {
            self.tracing_config = Some(TracingConfig::default());
        }
        self
    }
}
