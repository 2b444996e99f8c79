//! Shorthands for the most common statuses
//!
//! Each macro accepts the same argument forms as [`status!`](crate::status)
//! with the status code omitted.

/// Produces `200 OK`
///
/// # Example
/// ```no_run
/// use mortar::ok;
///
/// let name = "John";
/// let response = ok!("Hello {name}!");
/// ```
#[macro_export]
macro_rules! ok {
    () => {
        $crate::status!(200)
    };
    ([ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::status!(200; [ $( ($key, $value) ),* ])
    };
    ($($args:tt)+) => {
        $crate::status!(200, $($args)+)
    };
}

/// Produces `201 Created`
#[macro_export]
macro_rules! created {
    () => {
        $crate::status!(201)
    };
    ([ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::status!(201; [ $( ($key, $value) ),* ])
    };
    ($($args:tt)+) => {
        $crate::status!(201, $($args)+)
    };
}

/// Produces `204 No Content`
#[macro_export]
macro_rules! no_content {
    () => {
        $crate::status!(204)
    };
    ([ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::status!(204; [ $( ($key, $value) ),* ])
    };
}

/// Produces `400 Bad Request`
#[macro_export]
macro_rules! bad_request {
    () => {
        $crate::status!(400)
    };
    ([ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::status!(400; [ $( ($key, $value) ),* ])
    };
    ($($args:tt)+) => {
        $crate::status!(400, $($args)+)
    };
}

/// Produces `404 Not Found`
#[macro_export]
macro_rules! not_found {
    () => {
        $crate::status!(404)
    };
    ([ $( ($key:expr, $value:expr) ),* $(,)? ]) => {
        $crate::status!(404; [ $( ($key, $value) ),* ])
    };
    ($($args:tt)+) => {
        $crate::status!(404, $($args)+)
    };
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn it_creates_ok_with_text() {
        let name = "John";
        let mut response = ok!("Hello {name}!").unwrap();
        let body = response.body_mut().collect().await.unwrap().to_bytes();

        assert_eq!(response.status(), 200);
        assert_eq!(body, "Hello John!");
    }

    #[tokio::test]
    async fn it_creates_ok_with_headers_only() {
        let response = ok!([("x-api-key", "123")]).unwrap();

        assert_eq!(response.headers()["x-api-key"], "123");
    }

    #[tokio::test]
    async fn it_creates_created_with_json() {
        let mut response = created!({ "id": 1 }).unwrap();
        let body = response.body_mut().collect().await.unwrap().to_bytes();

        assert_eq!(response.status(), 201);
        assert_eq!(body, r#"{"id":1}"#);
    }

    #[tokio::test]
    async fn it_creates_no_content() {
        let response = no_content!().unwrap();

        assert_eq!(response.status(), 204);
    }

    #[tokio::test]
    async fn it_creates_bad_request_with_text() {
        let mut response = bad_request!(text: "invalid id").unwrap();
        let body = response.body_mut().collect().await.unwrap().to_bytes();

        assert_eq!(response.status(), 400);
        assert_eq!(body, "invalid id");
    }

    #[tokio::test]
    async fn it_creates_not_found() {
        let response = not_found!().unwrap();

        assert_eq!(response.status(), 404);
    }
}
