use mortar::{App, Form, HttpBody, HttpRequest, Json, ParsedBody, ok};
use mortar::http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

mod common;
use common::{client, TestServer};

#[derive(Deserialize)]
struct User {
    name: String,
    age: u32,
}

fn echo_app() -> App {
    let mut app = App::new();
    app.map_post("/echo", |body: ParsedBody| async move {
        match body {
            ParsedBody::Json(value) => ok!({ "json": value }),
            ParsedBody::Text(text) => ok!({ "text": text }),
            ParsedBody::Bytes(bytes) => ok!({ "bytes": bytes.len() }),
            ParsedBody::None => ok!({ "none": true }),
        }
    });
    app
}

#[tokio::test]
async fn it_parses_json_body() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .json(&json!({ "name": "John", "tags": [1, 2] }))
        .send()
        .await
        .unwrap();

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body, json!({ "json": { "name": "John", "tags": [1, 2] } }));
}

#[tokio::test]
async fn it_rejects_malformed_json() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "error": "Invalid JSON format" }));
}

#[tokio::test]
async fn it_parses_form_with_repeated_fields() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("a=1&b=2&b=3")
        .send()
        .await
        .unwrap();

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body, json!({ "json": { "a": "1", "b": ["2", "3"] } }));
}

#[tokio::test]
async fn it_parses_text_and_bytes() {
    let server = TestServer::start(echo_app()).await;

    let text = client()
        .post(server.url("/echo"))
        .header("content-type", "text/plain; charset=utf-8")
        .body("hello")
        .send()
        .await
        .unwrap();
    let bytes = client()
        .post(server.url("/echo"))
        .header("content-type", "application/octet-stream")
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();

    assert_eq!(text.json::<Value>().await.unwrap(), json!({ "text": "hello" }));
    assert_eq!(bytes.json::<Value>().await.unwrap(), json!({ "bytes": 3 }));
}

#[tokio::test]
async fn it_leaves_unknown_content_type_unparsed() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/xml")
        .body("<a/>")
        .send()
        .await
        .unwrap();

    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "none": true }));
}

#[tokio::test]
async fn it_keeps_body_for_typed_extractors() {
    let mut app = App::new();
    app.map_post("/json", |user: Json<User>| async move {
        ok!("{} is {}", user.name, user.age)
    });
    app.map_post("/form", |user: Form<User>| async move {
        ok!("{} is {}", user.name, user.age)
    });
    let server = TestServer::start(app).await;

    let json = client()
        .post(server.url("/json"))
        .json(&json!({ "name": "John", "age": 33 }))
        .send()
        .await
        .unwrap();
    let form = client()
        .post(server.url("/form"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Jane&age=30")
        .send()
        .await
        .unwrap();

    assert_eq!(json.text().await.unwrap(), "John is 33");
    assert_eq!(form.text().await.unwrap(), "Jane is 30");
}

#[tokio::test]
async fn it_uses_custom_content_type_parser() {
    let mut app = echo_app();
    app.add_content_type_parser(["application/csv"], |req: HttpRequest| async move {
        let (mut parts, body) = req.into_parts();
        let bytes = body.into_bytes().await?;
        let fields = String::from_utf8_lossy(&bytes)
            .split(',')
            .map(|field| Value::String(field.trim().to_owned()))
            .collect();
        parts.extensions.insert(ParsedBody::Json(Value::Array(fields)));
        Ok(HttpRequest::from_parts(parts, HttpBody::full(bytes)))
    });
    let server = TestServer::start(app).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/csv")
        .body("a, b,c")
        .send()
        .await
        .unwrap();

    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "json": ["a", "b", "c"] }));
}

#[tokio::test]
async fn it_rejects_body_over_limit() {
    let mut app = App::new().with_body_limit(8);
    app.map_post("/echo", |body: ParsedBody| async move {
        ok!({ "ok": body.as_json().is_some() })
    });
    let server = TestServer::start(app).await;

    let response = client()
        .post(server.url("/echo"))
        .json(&json!({ "text": "longer than eight bytes" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
