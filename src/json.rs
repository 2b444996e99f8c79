//! JSON helpers re-exported for response macros

#[doc(hidden)]
pub use serde_json::json as json_internal;
pub use serde_json::{Value, Map};
