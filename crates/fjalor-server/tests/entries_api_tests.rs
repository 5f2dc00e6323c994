use fjalor_server::{build_router, AppState, Database, ServerConfig};
use serde_json::{json, Value};

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(config: ServerConfig) -> String {
    let app = build_router(AppState::new(Database::open_in_memory().unwrap(), config));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}/api/entries", port)
}

fn entry_body(word: &str) -> Value {
    json!({
        "word": word,
        "definition": "animal",
        "illustration": "Macja po fle.",
        "recording": null
    })
}

#[tokio::test]
async fn create_then_list() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.post(&url).json(&entry_body(" mace ")).send().await.unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["entry"]["word"], "mace");
    assert!(created["entry"]["id"].as_str().is_some());
    assert_eq!(created["entry"]["createdAt"], created["entry"]["updatedAt"]);

    client.post(&url).json(&entry_body("bukë")).send().await.unwrap();

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let words: Vec<_> = body["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["word"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(words, vec!["bukë", "mace"]);
}

#[tokio::test]
async fn duplicate_word_is_conflict() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    client.post(&url).json(&entry_body("Mace")).send().await.unwrap();
    let resp = client.post(&url).json(&entry_body("mace")).send().await.unwrap();

    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Word already exists");
}

#[tokio::test]
async fn missing_fields_and_bad_json_are_bad_request() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(&url)
        .json(&json!({ "word": "mace", "definition": "animal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(&url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid JSON"));
}

#[tokio::test]
async fn update_and_delete_by_id() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(&url)
        .json(&entry_body("mace"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["entry"]["id"].as_str().unwrap().to_string();

    let resp = client
        .put(&url)
        .query(&[("id", &id)])
        .json(&entry_body("Mace"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["entry"]["word"], "Mace");
    assert_eq!(updated["entry"]["createdAt"], created["entry"]["createdAt"]);

    let resp = client.delete(&url).query(&[("id", &id)]).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);

    let resp = client.delete(&url).query(&[("id", &id)]).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(&url)
        .query(&[("id", &id)])
        .json(&entry_body("mace"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn missing_id_is_bad_request() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.delete(&url).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing id");
}

#[tokio::test]
async fn writes_require_passphrase_when_configured() {
    let url = spawn_test_server(ServerConfig {
        passphrase: Some(" sekret ".to_string()),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client.post(&url).json(&entry_body("mace")).send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(&url)
        .header("X-Passphrase", "wrong")
        .json(&entry_body("mace"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .post(&url)
        .header("X-Passphrase", "sekret ")
        .json(&entry_body("mace"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Reads stay open
    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn cors_headers_and_preflight() {
    let url = spawn_test_server(ServerConfig {
        allowed_origin: "https://dict.example".to_string(),
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let resp = client
        .request(reqwest::Method::OPTIONS, &url)
        .header("Origin", "https://dict.example")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let headers = resp.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://dict.example"
    );
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET,POST,PUT,DELETE,OPTIONS"
    );
    assert_eq!(headers["access-control-max-age"], "86400");
    assert_eq!(headers["vary"], "Origin");

    let resp = client.get(&url).send().await.unwrap();
    assert!(resp.headers().contains_key("access-control-allow-origin"));
    let content_type = resp.headers()["content-type"].to_str().unwrap();
    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.patch(&url).send().await.unwrap();
    assert_eq!(resp.status(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn malformed_query_is_json_bad_request() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .delete(format!("{}?id=a&id=b", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("application/json"));
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Invalid query"));
}

fn recording_of(len: usize) -> String {
    format!("data:audio/webm;base64,{}", "A".repeat(len))
}

#[tokio::test]
async fn large_recording_is_accepted() {
    let url = spawn_test_server(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let mut body = entry_body("mace");
    body["recording"] = json!(recording_of(3 * 1024 * 1024));

    let resp = client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(
        created["entry"]["recording"].as_str().unwrap().len(),
        body["recording"].as_str().unwrap().len()
    );
}

#[tokio::test]
async fn oversized_body_is_json_payload_too_large() {
    let url = spawn_test_server(ServerConfig {
        max_body_bytes: 1024,
        ..Default::default()
    })
    .await;
    let client = reqwest::Client::new();

    let mut body = entry_body("mace");
    body["recording"] = json!(recording_of(2048));

    let resp = client.post(&url).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 413);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.contains("application/json"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Request body too large");
}
