//! HTTP API tests against a server bound to a local port.

use axum::{http::StatusCode, routing::post, Json, Router};
use fieldmap::server::{router, AppState};
use fieldmap::Config;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Mock submission endpoint, returns its URL and hit counter.
async fn spawn_endpoint(status: StatusCode) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/users",
        post(move |Json(_): Json<Value>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, Json(json!({ "id": 1 })))
            }
        }),
    );
    (format!("{}/users", serve(app).await), hits)
}

/// Mock endpoint that answers 201 after `delay`.
async fn spawn_slow_endpoint(delay: Duration) -> String {
    let app = Router::new().route(
        "/users",
        post(move |Json(_): Json<Value>| async move {
            tokio::time::sleep(delay).await;
            (StatusCode::CREATED, Json(json!({ "id": 1 })))
        }),
    );
    format!("{}/users", serve(app).await)
}

async fn spawn_api(endpoint: &str, max_file_size: u64) -> String {
    let config = Config {
        max_file_size,
        ..Config::default()
    }
    .with_endpoint(endpoint)
    .unwrap();
    serve(router(AppState::new(&config).unwrap())).await
}

async fn upload(client: &reqwest::Client, base: &str, content: &'static [u8]) -> reqwest::Response {
    let form = Form::new().part("file", Part::bytes(content).file_name("contacts.csv"));
    client
        .post(format!("{}/api/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

async fn map(client: &reqwest::Client, base: &str, field: &str, header: &str) -> reqwest::Response {
    client
        .put(format!("{}/api/mapping/{}", base, field))
        .json(&json!({ "header": header }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let base = spawn_api("http://127.0.0.1:9/users", 1024).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "fieldmap");
}

#[tokio::test]
async fn test_full_flow() {
    let (endpoint, hits) = spawn_endpoint(StatusCode::CREATED).await;
    let base = spawn_api(&endpoint, 1024 * 1024).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &base, b"name,email,phone\nAda,ada@x.com,\nBob,bob@x.com,555").await;
    assert_eq!(response.status(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["headers"], json!(["name", "email", "phone"]));
    assert_eq!(view["editorOpen"], true);
    assert_eq!(view["canConfirm"], false);

    assert_eq!(map(&client, &base, "name", "name").await.status(), 200);
    let view: Value = map(&client, &base, "email", "email").await.json().await.unwrap();
    assert_eq!(view["canConfirm"], true);

    let view: Value = client
        .post(format!("{}/api/mapping/confirm", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["editorOpen"], false);
    assert_eq!(view["preview"][0]["phone"], "N/A");
    assert_eq!(view["canSubmit"], true);

    let response = client.post(format!("{}/api/submit", base)).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let view: Value = response.json().await.unwrap();
    assert_eq!(view["outcome"]["state"], "succeeded");
    assert_eq!(view["feedback"]["message"], "Data submitted successfully!");
    assert_eq!(view["feedback"]["type"], "success");
    assert_eq!(view["lastSubmission"]["recordCount"], 2);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_submit_without_dataset() {
    let (endpoint, hits) = spawn_endpoint(StatusCode::OK).await;
    let base = spawn_api(&endpoint, 1024).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/submit", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No data to submit. Please map a CSV file first.");
    assert_eq!(body["session"]["outcome"]["reason"], "no data");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_submission() {
    let (endpoint, _) = spawn_endpoint(StatusCode::INTERNAL_SERVER_ERROR).await;
    let base = spawn_api(&endpoint, 1024).await;
    let client = reqwest::Client::new();

    upload(&client, &base, b"name,email\nAda,ada@x.com").await;
    map(&client, &base, "name", "name").await;
    map(&client, &base, "email", "email").await;
    client.post(format!("{}/api/mapping/confirm", base)).send().await.unwrap();

    let response = client.post(format!("{}/api/submit", base)).send().await.unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["session"]["outcome"]["state"], "failed");
    assert_eq!(body["session"]["outcome"]["reason"], "request rejected");
    assert_eq!(body["session"]["canSubmit"], true);
}

#[tokio::test]
async fn test_mapping_errors() {
    let base = spawn_api("http://127.0.0.1:9/users", 1024).await;
    let client = reqwest::Client::new();
    upload(&client, &base, b"name,email\nAda,ada@x.com").await;

    assert_eq!(map(&client, &base, "fax", "name").await.status(), 404);
    assert_eq!(map(&client, &base, "name", "missing").await.status(), 422);

    let response = client
        .post(format!("{}/api/mapping/confirm", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["session"]["feedback"]["message"],
        "Error: 'name' and 'email' fields must be mapped."
    );
}

#[tokio::test]
async fn test_live_issue_reported() {
    let base = spawn_api("http://127.0.0.1:9/users", 1024).await;
    let client = reqwest::Client::new();
    upload(&client, &base, b"name,email\nCy,not-an-email").await;

    let view: Value = map(&client, &base, "email", "email").await.json().await.unwrap();
    assert!(view["liveMessage"].as_str().unwrap().contains("not-an-email"));
    assert_eq!(view["canConfirm"], false);

    let view: Value = client
        .delete(format!("{}/api/mapping", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(view["liveMessage"].is_null());
    assert_eq!(view["mapping"]["email"], "");
}

#[tokio::test]
async fn test_upload_errors() {
    let base = spawn_api("http://127.0.0.1:9/users", 16).await;
    let client = reqwest::Client::new();

    let response = upload(&client, &base, b"name,email\nAda,ada@x.com\nBob,bob@x.com").await;
    assert_eq!(response.status(), 413);

    let response = upload(&client, &base, b"\n\n").await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["session"]["feedback"]["type"], "error");

    // Import trigger is enabled again after each failure
    let view: Value = reqwest::get(format!("{}/api/session", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["importPending"], false);
}

#[tokio::test]
async fn test_cancel_and_reopen_editor() {
    let base = spawn_api("http://127.0.0.1:9/users", 1024).await;
    let client = reqwest::Client::new();
    upload(&client, &base, b"name,email\nAda,ada@x.com").await;

    let view: Value = client
        .post(format!("{}/api/mapping/cancel", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["editorOpen"], false);

    let view: Value = client
        .post(format!("{}/api/mapping/open", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["editorOpen"], true);
}

#[tokio::test]
async fn test_submit_completes_after_client_gives_up() {
    let endpoint = spawn_slow_endpoint(Duration::from_millis(800)).await;
    let base = spawn_api(&endpoint, 1024).await;
    let client = reqwest::Client::new();

    upload(&client, &base, b"name,email\nAda,ada@x.com").await;
    map(&client, &base, "name", "name").await;
    map(&client, &base, "email", "email").await;
    client.post(format!("{}/api/mapping/confirm", base)).send().await.unwrap();

    let impatient = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    assert!(impatient.post(format!("{}/api/submit", base)).send().await.is_err());

    // The outbound request still finishes and is recorded
    let mut view = Value::Null;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        view = reqwest::get(format!("{}/api/session", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if view["outcome"]["state"] != "in-flight" {
            break;
        }
    }

    assert_eq!(view["outcome"]["state"], "succeeded");
    assert_eq!(view["canSubmit"], true);
    assert_eq!(view["submitLabel"], "Submit to API");
    assert_eq!(view["feedback"]["message"], "Data submitted successfully!");
}
