use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    CONTENT_TYPE, ORIGIN,
};
use serde_json::{Value, json};

use fibdispatch_api::app::services::AppServices;
use fibdispatch_infra::{ConnectionState, ReadinessGate};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let services = AppServices::in_memory().await.expect("in-memory services");
        Self::spawn_with(services).await
    }

    async fn spawn_with(services: AppServices) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = fibdispatch_api::app::build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn submit(client: &reqwest::Client, srv: &TestServer, index: Value) -> reqwest::Response {
    client
        .post(srv.url("/calculate/results"))
        .json(&json!({ "index": index }))
        .send()
        .await
        .unwrap()
}

async fn get_json(client: &reqwest::Client, srv: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = client.get(srv.url(path)).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

/// Poll until both views report a computed value for `index`.
///
/// Results are eventually consistent (submission vs worker processing).
async fn wait_for_result(client: &reqwest::Client, srv: &TestServer, index: i64) -> (String, i64) {
    let key = index.to_string();
    for _ in 0..100 {
        let (_, current) = get_json(client, srv, "/results/current").await;
        let (_, all) = get_json(client, srv, "/results/all").await;

        let cached = current[&key].as_str().map(str::to_string);
        let durable = all
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["number"] == json!(index))
            .and_then(|row| row["result"].as_i64());

        if let (Some(c), Some(d)) = (cached, durable) {
            if c == d.to_string() {
                return (c, d);
            }
        }

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    panic!("index {index} was not processed within timeout");
}

async fn assert_nothing_stored(client: &reqwest::Client, srv: &TestServer) {
    let (_, all) = get_json(client, srv, "/results/all").await;
    assert_eq!(all, json!([]));
    let (_, current) = get_json(client, srv, "/results/current").await;
    assert_eq!(current, json!({}));
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn submit_ten_shows_up_in_both_views() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(&client, &srv, json!(10)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "working": true }));

    let (cached, durable) = wait_for_result(&client, &srv, 10).await;
    assert_eq!(cached, "55");
    assert_eq!(durable, 55);

    let (_, all) = get_json(&client, &srv, "/results/all").await;
    assert_eq!(all, json!([{ "number": 10, "result": 55 }]));
}

#[tokio::test]
async fn too_high_is_rejected_with_422() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(&client, &srv, json!(41)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Number too high" }));

    assert_nothing_stored(&client, &srv).await;
}

#[tokio::test]
async fn negative_and_non_numeric_are_rejected_with_400() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = submit(&client, &srv, json!(-1)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Number must be non-negative");

    for raw in [json!("abc"), json!(null), json!(1.5)] {
        let res = submit(&client, &srv, raw.clone()).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "input {raw}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Invalid number");
    }

    assert_nothing_stored(&client, &srv).await;
}

#[tokio::test]
async fn zero_and_one_are_their_own_results() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    submit(&client, &srv, json!(0)).await;
    submit(&client, &srv, json!("1")).await;

    assert_eq!(wait_for_result(&client, &srv, 0).await, ("0".to_string(), 0));
    assert_eq!(wait_for_result(&client, &srv, 1).await, ("1".to_string(), 1));

    let (_, all) = get_json(&client, &srv, "/results/all").await;
    assert_eq!(
        all,
        json!([{ "number": 0, "result": 0 }, { "number": 1, "result": 1 }])
    );
}

#[tokio::test]
async fn resubmission_does_not_double_count_or_reset() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    assert_eq!(submit(&client, &srv, json!(5)).await.status(), StatusCode::OK);
    assert_eq!(submit(&client, &srv, json!(5)).await.status(), StatusCode::OK);

    let (cached, durable) = wait_for_result(&client, &srv, 5).await;
    assert_eq!((cached.as_str(), durable), ("5", 5));

    // Resubmitting a completed index never resets the durable value.
    submit(&client, &srv, json!(5)).await;
    let (_, all) = get_json(&client, &srv, "/results/all").await;
    assert_eq!(all, json!([{ "number": 5, "result": 5 }]));
}

#[tokio::test]
async fn unready_connections_answer_503() {
    let cache = Arc::new(ConnectionState::new("redis cache"));
    let bus = Arc::new(ConnectionState::new("redis publisher"));
    let services = AppServices::in_memory_with_gate(ReadinessGate::new(cache.clone(), bus.clone()))
        .await
        .unwrap();
    let srv = TestServer::spawn_with(services).await;
    let client = reqwest::Client::new();

    let res = submit(&client, &srv, json!(3)).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "redis publisher not ready yet");

    let (status, _) = get_json(&client, &srv, "/results/current").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    // The durable view has no gate.
    let (status, all) = get_json(&client, &srv, "/results/all").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all, json!([]));

    // Validation still runs first.
    let res = submit(&client, &srv, json!(41)).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    cache.mark_ready();
    bus.mark_ready();
    assert_eq!(submit(&client, &srv, json!(3)).await.status(), StatusCode::OK);
    assert_eq!(wait_for_result(&client, &srv, 3).await.1, 2);
}

#[tokio::test]
async fn malformed_bodies_are_rejected_as_invalid_number() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let json_bodies = ["[1]", "\"abc\"", "7", "{not json", ""];
    for raw in json_bodies {
        let res = client
            .post(srv.url("/calculate/results"))
            .header(CONTENT_TYPE, "application/json")
            .body(raw)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {raw:?}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "Invalid number" }), "body {raw:?}");
    }

    // No content type at all.
    let res = client
        .post(srv.url("/calculate/results"))
        .body(r#"{"index":5}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid number" }));

    assert_nothing_stored(&client, &srv).await;
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let preflight = client
        .request(reqwest::Method::OPTIONS, srv.url("/calculate/results"))
        .header(ORIGIN, "http://client.example")
        .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .send()
        .await
        .unwrap();
    assert!(preflight.status().is_success());
    assert_eq!(preflight.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let res = client
        .get(srv.url("/results/all"))
        .header(ORIGIN, "http://client.example")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
