use mortar::{App, ParsedBody, RequestHead, ok, status};
use mortar::headers::{HeaderMap, HeaderName, HeaderValue, HOST};
use mortar::http::{Method, StatusCode, Uri};
use mortar::proxy::{ProxyBody, ProxyOptions, UpstreamResponse};
use serde_json::{json, Value};
use std::time::Duration;

mod common;
use common::{client, TestServer};

async fn upstream() -> TestServer {
    let mut app = App::new();
    app.map_all("/{*path}", |method: Method, uri: Uri, headers: HeaderMap, body: ParsedBody| async move {
        ok!({
            "method": method.as_str(),
            "uri": uri.to_string(),
            "host": headers.get(HOST).and_then(|h| h.to_str().ok()),
            "tag": headers.get("x-proxy-tag").and_then(|h| h.to_str().ok()),
            "body": body.as_json().cloned(),
        })
    });
    app.map_get("/slow", || async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        ok!()
    });
    TestServer::start(app).await
}

fn target(server: &TestServer) -> String {
    format!("http://{}", server.addr())
}

#[tokio::test]
async fn it_forwards_under_mount_path() {
    let backend = upstream().await;
    let mut app = App::new();
    app.map_proxy("/api", ProxyOptions::new(&target(&backend)).unwrap()
        .with_path_rewrite("^/api", "").unwrap()
        .with_header(HeaderName::from_static("x-proxy-tag"), HeaderValue::from_static("mortar")));
    app.map_get("/local", || async { ok!("local") });
    let server = TestServer::start(app).await;

    let proxied = client().get(server.url("/api/users?page=2")).send().await.unwrap();
    let local = client().get(server.url("/local")).send().await.unwrap();

    assert_eq!(proxied.status(), StatusCode::OK);
    let body = proxied.json::<Value>().await.unwrap();
    assert_eq!(body["method"], "GET");
    assert_eq!(body["uri"], "/users?page=2");
    assert_eq!(body["host"], backend.addr().to_string());
    assert_eq!(body["tag"], "mortar");
    assert_eq!(local.text().await.unwrap(), "local");
}

#[tokio::test]
async fn it_forwards_json_body() {
    let backend = upstream().await;
    let mut app = App::new();
    app.map_proxy("/api", ProxyOptions::new(&target(&backend)).unwrap());
    let server = TestServer::start(app).await;

    let response = client()
        .post(server.url("/api/items"))
        .json(&json!({ "name": "item" }))
        .send()
        .await
        .unwrap();

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["uri"], "/api/items");
    assert_eq!(body["body"], json!({ "name": "item" }));
}

#[tokio::test]
async fn it_decorates_upstream_response() {
    let backend = upstream().await;
    let mut app = App::new();
    app.map_proxy("/api", ProxyOptions::new(&target(&backend)).unwrap()
        .with_response_decorator(|resp: UpstreamResponse, head: RequestHead| async move {
            let mut body: Value = serde_json::from_slice(&resp.body)?;
            body["decorated"] = json!(head.uri().path());
            Ok(ProxyBody::Json(body))
        }));
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/api/x")).send().await.unwrap();

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["decorated"], "/api/x");
    assert_eq!(body["uri"], "/api/x");
}

#[tokio::test]
async fn it_decorates_upstream_request() {
    let backend = upstream().await;
    let mut app = App::new();
    app.map_proxy("/api", ProxyOptions::new(&target(&backend)).unwrap()
        .with_path_resolver(|_: RequestHead| async { "/resolved?by=resolver".to_owned() })
        .with_request_decorator(|mut parts: hyper::http::request::Parts| async move {
            parts.headers.insert("x-proxy-tag", HeaderValue::from_static("decorated"));
            Ok(parts)
        }));
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/api/anything")).send().await.unwrap();

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["uri"], "/resolved?by=resolver");
    assert_eq!(body["tag"], "decorated");
}

#[tokio::test]
async fn it_replies_500_on_timeout() {
    let backend = upstream().await;
    let mut app = App::new();
    app.map_proxy("/", ProxyOptions::new(&target(&backend)).unwrap()
        .with_timeout(Duration::from_millis(100)));
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/slow")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text().await.unwrap(), "Proxy error: Proxy timeout");
}

#[tokio::test]
async fn it_uses_error_handler() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let mut app = App::new();
    app.map_proxy("/api", ProxyOptions::new(&format!("http://{dead}")).unwrap()
        .with_error_handler(|_, head: RequestHead| async move {
            status!(502, "upstream down for {}", head.uri().path())
        }));
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/api/x")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.text().await.unwrap(), "upstream down for /api/x");
}

#[tokio::test]
async fn it_passes_filtered_requests_through() {
    let backend = upstream().await;
    let mut app = App::new();
    app.use_proxy(ProxyOptions::new(&target(&backend)).unwrap()
        .with_filter(|head: RequestHead| async move { head.uri().path().starts_with("/remote") }));
    app.map_get("/remote/a", || async { ok!("local") });
    app.map_get("/here", || async { ok!("here") });
    let server = TestServer::start(app).await;

    let remote = client().get(server.url("/remote/a")).send().await.unwrap();
    let here = client().get(server.url("/here")).send().await.unwrap();

    assert_eq!(remote.json::<Value>().await.unwrap()["uri"], "/remote/a");
    assert_eq!(here.text().await.unwrap(), "here");
}

#[test]
fn it_rejects_https_target() {
    let err = ProxyOptions::new("https://example.com").unwrap_err();

    assert_eq!(err.to_string(), "Unsupported proxy target scheme: https");
}
