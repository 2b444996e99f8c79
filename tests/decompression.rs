use async_compression::tokio::write::{BrotliEncoder, GzipEncoder, ZlibEncoder};
use mortar::{App, ParsedBody, ok};
use mortar::http::StatusCode;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

mod common;
use common::{client, TestServer};

async fn compress(encoding: &str, data: &[u8]) -> Vec<u8> {
    match encoding {
        "gzip" => {
            let mut encoder = GzipEncoder::new(Vec::new());
            encoder.write_all(data).await.unwrap();
            encoder.shutdown().await.unwrap();
            encoder.into_inner()
        }
        "deflate" => {
            let mut encoder = ZlibEncoder::new(Vec::new());
            encoder.write_all(data).await.unwrap();
            encoder.shutdown().await.unwrap();
            encoder.into_inner()
        }
        "br" => {
            let mut encoder = BrotliEncoder::new(Vec::new());
            encoder.write_all(data).await.unwrap();
            encoder.shutdown().await.unwrap();
            encoder.into_inner()
        }
        _ => data.to_vec(),
    }
}

fn echo_app() -> App {
    let mut app = App::new();
    app.map_post("/echo", |body: ParsedBody| async move {
        match body.as_json() {
            Some(value) => ok!({ "received": value.clone() }),
            None => ok!({ "received": null }),
        }
    });
    app
}

#[tokio::test]
async fn it_decodes_compressed_json_bodies() {
    let server = TestServer::start(echo_app()).await;
    let payload = json!({ "name": "John", "items": [1, 2, 3] });
    let raw = serde_json::to_vec(&payload).unwrap();

    for encoding in ["gzip", "deflate", "br"] {
        let response = client()
            .post(server.url("/echo"))
            .header("content-type", "application/json")
            .header("content-encoding", encoding)
            .body(compress(encoding, &raw).await)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{encoding}");
        assert_eq!(response.json::<Value>().await.unwrap(), json!({ "received": payload }), "{encoding}");
    }
}

#[tokio::test]
async fn it_passes_identity_encoding_through() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/json")
        .header("content-encoding", "identity")
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.json::<Value>().await.unwrap(), json!({ "received": { "a": 1 } }));
}

#[tokio::test]
async fn it_rejects_unknown_encoding() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/json")
        .header("content-encoding", "compress")
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn it_rejects_corrupted_stream() {
    let server = TestServer::start(echo_app()).await;

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body("definitely not gzip")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn it_limits_decompressed_size() {
    let mut app = App::new().with_body_limit(100);
    app.map_post("/echo", |body: ParsedBody| async move {
        ok!({ "ok": body.as_json().is_some() })
    });
    let server = TestServer::start(app).await;

    let big = serde_json::to_vec(&json!({ "data": "x".repeat(4096) })).unwrap();
    let compressed = compress("gzip", &big).await;
    assert!(compressed.len() < 100);

    let response = client()
        .post(server.url("/echo"))
        .header("content-type", "application/json")
        .header("content-encoding", "gzip")
        .body(compressed)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
