//! The `status!` macro: responses with an arbitrary HTTP status

/// Produces an [`HttpResult`](crate::HttpResult) with the given numeric status code.
///
/// The body kind is picked by the form of the arguments:
/// * `status!(404)` - empty body
/// * `status!(401, text: expr)` - `expr.to_string()` as `text/plain`
/// * `status!(401, "Hi {name}")` or `status!(401, "Hi {}", name)` - formatted `text/plain`
/// * `status!(401, json: expr)` or `status!(401, expr)` - `expr` serialized as JSON
/// * `status!(401, { "error": "denied" })` - inline JSON object
///
/// Each form optionally takes a trailing header list: `; [("x-key", "value")]`.
///
/// # Example
/// ```no_run
/// use mortar::status;
///
/// let response = status!(401, { "error": "denied" }; [("www-authenticate", "Bearer")]);
/// ```
#[macro_export]
macro_rules! status {
    (@text $status:expr, $body:expr, [ $( ($key:expr, $value:expr) ),* ]) => {
        $crate::http::response::builder::make_status_builder($status)
            .header_raw($crate::headers::CONTENT_TYPE, "text/plain; charset=utf-8")
            $( .header_raw($key, $value) )*
            .body($crate::HttpBody::full($body))
    };
    (@json $status:expr, $body:expr, [ $( ($key:expr, $value:expr) ),* ]) => {
        match $crate::HttpBody::json($body) {
            Ok(body) => $crate::http::response::builder::make_status_builder($status)
                .header_raw($crate::headers::CONTENT_TYPE, "application/json")
                $( .header_raw($key, $value) )*
                .body(body),
            Err(err) => Err(err),
        }
    };

    ($status:expr $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::http::response::builder::make_status_builder($status)
            $( $( .header_raw($key, $value) )* )?
            .body($crate::HttpBody::empty())
    };

    ($status:expr, text: $body:expr $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@text $status, $body.to_string(), [ $( $( ($key, $value) ),* )? ])
    };

    ($status:expr, json: $body:expr $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@json $status, $body, [ $( $( ($key, $value) ),* )? ])
    };

    ($status:expr, { $($json:tt)* } $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@json $status, $crate::json::json_internal!({ $($json)* }), [ $( $( ($key, $value) ),* )? ])
    };

    ($status:expr, $fmt:literal $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@text $status, format!($fmt), [ $( $( ($key, $value) ),* )? ])
    };

    ($status:expr, $fmt:literal, $( $arg:expr ),+ $(,)? $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@text $status, format!($fmt, $( $arg ),+), [ $( $( ($key, $value) ),* )? ])
    };

    ($status:expr, $body:expr $(; [ $( ($key:expr, $value:expr) ),* $(,)? ])?) => {
        $crate::status!(@json $status, $body, [ $( $( ($key, $value) ),* )? ])
    };
}
