use mortar::{App, RequestHead, ok};
use mortar::headers::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, VARY,
};
use mortar::http::{cors::{CorsConfig, Origin}, Method, StatusCode};
use std::time::Duration;

mod common;
use common::{client, TestServer};

fn app_with(config: CorsConfig) -> App {
    let mut app = App::new();
    app.use_cors(config);
    app.map_get("/items", || async { ok!("items") });
    app.map_post("/items", || async { ok!("created") });
    app
}

#[tokio::test]
async fn it_allows_any_origin_by_default() {
    let server = TestServer::start(app_with(CorsConfig::new())).await;

    let response = client()
        .get(server.url("/items"))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!response.headers().contains_key(VARY));
    assert_eq!(response.text().await.unwrap(), "items");
}

#[tokio::test]
async fn it_reflects_listed_origin() {
    let config = CorsConfig::new()
        .with_origin(Origin::List(vec!["https://a.com".into(), "https://b.com".into()]))
        .with_credentials(true);
    let server = TestServer::start(app_with(config)).await;

    let allowed = client()
        .get(server.url("/items"))
        .header("origin", "https://b.com")
        .send()
        .await
        .unwrap();
    let denied = client()
        .get(server.url("/items"))
        .header("origin", "https://evil.com")
        .send()
        .await
        .unwrap();

    assert_eq!(allowed.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://b.com");
    assert_eq!(allowed.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(allowed.headers()[VARY], "Origin");
    assert!(!denied.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(denied.status(), StatusCode::OK);
}

#[tokio::test]
async fn it_matches_origin_by_regex() {
    let config = CorsConfig::new()
        .with_origin(Origin::regex(r"^https://.*\.example\.com$").unwrap());
    let server = TestServer::start(app_with(config)).await;

    let response = client()
        .get(server.url("/items"))
        .header("origin", "https://api.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://api.example.com");
}

#[tokio::test]
async fn it_answers_preflight() {
    let config = CorsConfig::new()
        .with_methods(["GET", "POST"])
        .with_max_age(Duration::from_secs(600));
    let server = TestServer::start(app_with(config)).await;

    let response = client()
        .request(Method::OPTIONS, server.url("/items"))
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "x-custom, content-type")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET,POST");
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_HEADERS], "x-custom, content-type");
    assert_eq!(response.headers()[ACCESS_CONTROL_MAX_AGE], "600");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn it_answers_preflight_with_custom_status() {
    let config = CorsConfig::new()
        .with_options_success_status(StatusCode::OK)
        .with_allowed_headers(["content-type"]);
    let server = TestServer::start(app_with(config)).await;

    let response = client()
        .request(Method::OPTIONS, server.url("/items"))
        .header("origin", "https://example.com")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
}

#[tokio::test]
async fn it_passes_preflight_to_handler_when_continuing() {
    let config = CorsConfig::new().with_preflight_continue(true);
    let mut app = app_with(config);
    app.map_options("/custom", || async { ok!("handled") });
    let server = TestServer::start(app).await;

    let response = client()
        .request(Method::OPTIONS, server.url("/custom"))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(response.text().await.unwrap(), "handled");
}

#[tokio::test]
async fn it_exposes_headers() {
    let config = CorsConfig::new().with_exposed_headers(["x-total", "x-page"]);
    let server = TestServer::start(app_with(config)).await;

    let response = client()
        .get(server.url("/items"))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()[ACCESS_CONTROL_EXPOSE_HEADERS], "x-total,x-page");
}

#[tokio::test]
async fn it_resolves_config_per_request() {
    let config = CorsConfig::dynamic(|head: RequestHead| async move {
        if head.uri().path().starts_with("/public") {
            CorsConfig::new()
        } else {
            CorsConfig::new().with_origin(Origin::Disabled)
        }
    });
    let mut app = App::new();
    app.use_cors(config);
    app.map_get("/public/info", || async { ok!() });
    app.map_get("/private/info", || async { ok!() });
    let server = TestServer::start(app).await;

    let public = client()
        .get(server.url("/public/info"))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();
    let private = client()
        .get(server.url("/private/info"))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(public.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(!private.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
}
