//! CORS middleware

use std::sync::Arc;
use crate::{http::cors::CorsConfig, App, HttpResponse, RequestHead};

impl App {
    /// Adds an `on_send` hook that decorates every response with CORS headers
    ///
    /// Preflight (`OPTIONS`) requests get an empty reply with the configured status
    /// unless `preflight_continue` is set.
    ///
    /// # Example
    /// ```no_run
    /// use mortar::{App, http::cors::{CorsConfig, Origin}};
    ///
    /// let mut app = App::new();
    ///
    /// app.use_cors(CorsConfig::new()
    ///     .with_origin(Origin::List(vec!["https://example.com".into()]))
    ///     .with_credentials(true));
    /// ```
    pub fn use_cors(&mut self, config: CorsConfig) -> &mut Self {
        let config = Arc::new(config);
        self.on_send(move |head: RequestHead, resp: HttpResponse| {
            let config = config.clone();
            async move {
                config
                    .resolve(&head)
                    .await
                    .apply(&head, resp)
            }
        })
    }
}
