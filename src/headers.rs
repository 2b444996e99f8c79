//! HTTP headers and helpers for working with them

pub use hyper::header::*;

use crate::utils::str::split_list;

#[cfg(feature = "etag")]
pub mod etag;

/// Carries a unique id of every request
pub const REQ_UUID: HeaderName = HeaderName::from_static("req-uuid");

/// Announces the server framework when the `x-powered-by` setting is on
pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Appends `field` to the `Vary` header, keeping the values that are already there.
///
/// Does nothing if the field is already listed or the header is `*`.
pub fn append_vary(headers: &mut HeaderMap, field: &HeaderName) {
    let current = headers
        .get_all(VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(split_list)
        .map(str::to_owned)
        .collect::<Vec<_>>();

    if current.iter().any(|v| v == "*" || v.eq_ignore_ascii_case(field.as_str())) {
        return;
    }

    let mut value = current.join(", ");
    if !value.is_empty() {
        value.push_str(", ");
    }
    value.push_str(&canonical_name(field));

    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(VARY, value);
    }
}

/// Formats a lowercase header name as `Title-Case`
fn canonical_name(name: &HeaderName) -> String {
    let mut upper = true;
    name.as_str()
        .chars()
        .map(|c| {
            let c = if upper { c.to_ascii_uppercase() } else { c };
            upper = c == '-';
            c
        })
        .collect()
}
