//! Application settings

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::App;

const DEFAULT_ENV: &str = "dev";
const ENV_VAR: &str = "MORTAR_ENV";

/// Name of the setting that controls the default ETag weakness
pub const ETAG: &str = "etag";
/// Name of the setting that holds the environment name
pub const ENV: &str = "env";
/// Name of the setting that selects the query string parser
pub const QUERY_PARSER: &str = "query parser";
/// Name of the setting that allows reading the client address from `X-Forwarded-For`
pub const TRUST_PROXY: &str = "trust proxy";
/// Name of the setting that controls the `X-Powered-By` header
pub const X_POWERED_BY: &str = "x-powered-by";

/// A key/value store of application settings
///
/// Settings are frozen when the server starts and are available to handlers
/// through the [`AppSettings`](crate::AppSettings) extractor.
///
/// # Example
/// ```no_run
/// use mortar::App;
///
/// let mut app = App::new();
///
/// app.settings_mut().enable("trust proxy");
/// app.settings_mut().set("title", "My site");
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    values: HashMap<String, Value>,
    protected: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let env = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.into());

        let mut settings = Self {
            values: HashMap::new(),
            protected: HashSet::new()
        };
        settings.set(ETAG, "weak");
        settings.set(ENV, env);
        settings.set(QUERY_PARSER, "simple");
        settings.set(TRUST_PROXY, false);
        settings.set(X_POWERED_BY, true);
        settings
    }
}

impl Settings {
    /// Creates settings with the default values
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to the setting `name`
    ///
    /// Returns `false` and keeps the current value if the setting is protected.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let name = name.into();
        if self.protected.contains(&name) {
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    /// Returns the value of the setting
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Sets the setting to `true`
    #[inline]
    pub fn enable(&mut self, name: impl Into<String>) -> bool {
        self.set(name, true)
    }

    /// Sets the setting to `false`
    #[inline]
    pub fn disable(&mut self, name: impl Into<String>) -> bool {
        self.set(name, false)
    }

    /// Checks if the setting is exactly `true`
    #[inline]
    pub fn enabled(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Value::Bool(true)))
    }

    /// Checks if the setting is anything but `true`
    #[inline]
    pub fn disabled(&self, name: &str) -> bool {
        !self.enabled(name)
    }

    /// Protects the setting from further changes
    #[inline]
    pub fn protect(&mut self, name: impl Into<String>) {
        self.protected.insert(name.into());
    }

    /// Returns the environment name, `dev` unless `MORTAR_ENV` says otherwise
    #[inline]
    pub fn env(&self) -> &str {
        self.get(ENV)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ENV)
    }
}

impl App {
    /// Returns the application settings
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the application settings for modification
    #[inline]
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Assigns a setting value
    ///
    /// # Example
    /// ```no_run
    /// use mortar::App;
    ///
    /// let mut app = App::new();
    /// app.set("etag", "strong");
    /// ```
    #[inline]
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.settings.set(name, value);
        self
    }

    /// Sets a setting to `true`
    #[inline]
    pub fn enable(&mut self, name: impl Into<String>) -> &mut Self {
        self.settings.enable(name);
        self
    }

    /// Sets a setting to `false`
    #[inline]
    pub fn disable(&mut self, name: impl Into<String>) -> &mut Self {
        self.settings.disable(name);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[test]
    fn it_has_defaults() {
        let settings = Settings::new();

        assert_eq!(settings.get(ETAG), Some(&json!("weak")));
        assert_eq!(settings.get(QUERY_PARSER), Some(&json!("simple")));
        assert!(settings.disabled(TRUST_PROXY));
        assert!(settings.enabled(X_POWERED_BY));
        assert!(!settings.env().is_empty());
    }

    #[test]
    fn it_enables_and_disables() {
        let mut settings = Settings::new();

        settings.enable("feature");
        assert!(settings.enabled("feature"));

        settings.disable("feature");
        assert!(settings.disabled("feature"));
    }

    #[test]
    fn it_treats_non_bool_as_disabled() {
        let mut settings = Settings::new();
        settings.set("feature", "yes");

        assert!(!settings.enabled("feature"));
        assert!(settings.disabled("feature"));
    }

    #[test]
    fn it_keeps_protected_values() {
        let mut settings = Settings::new();
        settings.set("title", "a");
        settings.protect("title");

        assert!(!settings.set("title", "b"));
        assert_eq!(settings.get("title"), Some(&json!("a")));
    }

    #[test]
    fn it_returns_none_for_unknown() {
        assert!(Settings::new().get("unknown").is_none());
    }
}
