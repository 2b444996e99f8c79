use mortar::{App, Json, Path, Query, ok, not_found};
use mortar::headers::{ALLOW, CONTENT_LENGTH};
use mortar::http::{Method, StatusCode};
use serde::Deserialize;

mod common;
use common::{client, TestServer};

#[derive(Deserialize)]
struct Page {
    page: u32,
}

#[derive(Deserialize)]
struct UserPost {
    user: String,
    post: u32,
}

#[tokio::test]
async fn it_matches_route_params() {
    let mut app = App::new();
    app.map_get("/users/:id", |id: u32| async move {
        ok!("user {id}")
    });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/users/42")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "user 42");
}

#[tokio::test]
async fn it_matches_braced_params_into_struct() {
    let mut app = App::new();
    app.map_get("/users/{user}/posts/{post}", |path: Path<UserPost>| async move {
        ok!("{} {}", path.user, path.post)
    });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/users/john/posts/7")).send().await.unwrap();

    assert_eq!(response.text().await.unwrap(), "john 7");
}

#[tokio::test]
async fn it_prefers_static_segment_over_param() {
    let mut app = App::new();
    app.map_get("/users/me", || async { ok!("me") });
    app.map_get("/users/:id", |id: String| async move { ok!("id {id}") });
    let server = TestServer::start(app).await;

    let me = client().get(server.url("/users/me")).send().await.unwrap();
    let other = client().get(server.url("/users/you")).send().await.unwrap();

    assert_eq!(me.text().await.unwrap(), "me");
    assert_eq!(other.text().await.unwrap(), "id you");
}

#[tokio::test]
async fn it_matches_param_route_when_static_route_lacks_method() {
    let mut app = App::new();
    app.map_get("/users/me", || async { ok!("me") });
    app.map_delete("/users/:id", |id: String| async move { ok!("deleted {id}") });
    let server = TestServer::start(app).await;

    let deleted = client().delete(server.url("/users/me")).send().await.unwrap();
    let me = client().get(server.url("/users/me")).send().await.unwrap();
    let put = client().put(server.url("/users/me")).send().await.unwrap();

    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(deleted.text().await.unwrap(), "deleted me");
    assert_eq!(me.text().await.unwrap(), "me");
    assert_eq!(put.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(put.headers()[ALLOW], "GET, HEAD");
}

#[tokio::test]
async fn it_captures_wildcard_remainder() {
    let mut app = App::new();
    app.map_get("/files/{*path}", |path: String| async move {
        ok!("file: {path}")
    });
    let server = TestServer::start(app).await;

    let nested = client().get(server.url("/files/a/b/c.txt")).send().await.unwrap();
    let empty = client().get(server.url("/files")).send().await.unwrap();

    assert_eq!(nested.text().await.unwrap(), "file: a/b/c.txt");
    assert_eq!(empty.text().await.unwrap(), "file: ");
}

#[tokio::test]
async fn it_parses_query() {
    let mut app = App::new();
    app.map_get("/items", |query: Query<Page>| async move {
        ok!("page {}", query.page)
    });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/items?page=3")).send().await.unwrap();

    assert_eq!(response.text().await.unwrap(), "page 3");
}

#[tokio::test]
async fn it_replies_404_for_unknown_route() {
    let server = TestServer::start(App::new()).await;

    let response = client().get(server.url("/missing")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn it_uses_custom_fallback() {
    let mut app = App::new();
    app.map_fallback(|| async { not_found!("Nothing here") });
    let server = TestServer::start(app).await;

    let response = client().get(server.url("/missing")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "Nothing here");
}

#[tokio::test]
async fn it_replies_405_with_allow() {
    let mut app = App::new();
    app.map_get("/items", || async { ok!() });
    app.map_post("/items", || async { ok!() });
    let server = TestServer::start(app).await;

    let response = client().delete(server.url("/items")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[ALLOW], "GET, POST, HEAD");
}

#[tokio::test]
async fn it_answers_options_automatically() {
    let mut app = App::new();
    app.map_put("/items", || async { ok!() });
    let server = TestServer::start(app).await;

    let response = client()
        .request(Method::OPTIONS, server.url("/items"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[ALLOW], "PUT");
}

#[tokio::test]
async fn it_serves_head_from_get_without_body() {
    let mut app = App::new();
    app.map_get("/hello", || async { ok!("Hello, World!") });
    let server = TestServer::start(app).await;

    let response = client().head(server.url("/hello")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_LENGTH], "13");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn it_maps_all_methods() {
    let mut app = App::new();
    app.map_all("/echo", |method: Method| async move { ok!("{method}") });
    let server = TestServer::start(app).await;

    let put = client().put(server.url("/echo")).send().await.unwrap();
    let patch = client().patch(server.url("/echo")).send().await.unwrap();

    assert_eq!(put.text().await.unwrap(), "PUT");
    assert_eq!(patch.text().await.unwrap(), "PATCH");
}

#[tokio::test]
async fn it_maps_route_groups() {
    let mut app = App::new();
    app.group("/api", |api| {
        api.map_get("/status", || async { ok!("up") });
        api.map_post("/echo", |body: Json<serde_json::Value>| async move { ok!(body.into_inner()) });
    });
    let server = TestServer::start(app).await;

    let status = client().get(server.url("/api/status")).send().await.unwrap();
    let echo = client()
        .post(server.url("/api/echo"))
        .json(&serde_json::json!({ "a": 1 }))
        .send()
        .await
        .unwrap();

    assert_eq!(status.text().await.unwrap(), "up");
    assert_eq!(echo.json::<serde_json::Value>().await.unwrap(), serde_json::json!({ "a": 1 }));
}
