use mortar::{App, RequestId, ok};
use mortar::tracing::TracingConfig;
use tracing_subscriber::EnvFilter;

mod common;
use common::{client, TestServer};

fn init_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn it_adds_span_id_header() {
    init_subscriber();

    let mut app = App::new().with_tracing(TracingConfig::new().with_header());
    app.use_tracing();
    app.map_get("/test", || async { ok!("Pass!") });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/test")).send().await.unwrap();

    let span_id = response.headers()["request-id"].to_str().unwrap().to_owned();
    assert!(span_id.parse::<u64>().is_ok());
    assert_eq!(response.text().await.unwrap(), "Pass!");
}

#[tokio::test]
async fn it_uses_custom_span_header_name() {
    init_subscriber();

    let mut app = App::new().with_tracing(TracingConfig::new()
        .with_header()
        .with_header_name("x-span-id"));
    app.use_tracing();
    app.map_get("/test", || async { ok!() });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/test")).send().await.unwrap();

    assert!(response.headers().contains_key("x-span-id"));
    assert!(!response.headers().contains_key("request-id"));
}

#[tokio::test]
async fn it_omits_span_header_by_default() {
    init_subscriber();

    let mut app = App::new();
    app.use_tracing();
    app.map_get("/test", || async { ok!() });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/test")).send().await.unwrap();

    assert!(!response.headers().contains_key("request-id"));
}

#[tokio::test]
async fn it_sends_request_id_matching_extractor() {
    let mut app = App::new();
    app.map_get("/id", |id: RequestId| async move { ok!("{id}") });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/id")).send().await.unwrap();

    let header = response.headers()["req-uuid"].to_str().unwrap().to_owned();
    assert_eq!(response.text().await.unwrap(), header);
}
