use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use dbdesk_config::Config;
use dbdesk_server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

const CONN: &str = "mongodb://localhost:27017";

fn app(config: Config) -> Router {
    router(AppState::new(&config))
}

fn read_only() -> Config {
    let mut config = Config::default();
    config.server.read_only = true;
    config
}

async fn post(app: Router, path: &str, body: Value) -> (StatusCode, String) {
    post_raw(app, path, body.to_string()).await
}

async fn post_raw(app: Router, path: &str, body: String) -> (StatusCode, String) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_and_info() {
    let response = app(Config::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(read_only())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let info: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(info["name"], "dbdesk");
    assert_eq!(info["readOnly"], true);
}

#[tokio::test]
async fn test_missing_fields_are_bad_requests() {
    let cases = [
        ("/api/databases", json!({})),
        ("/api/collections", json!({"connStr": CONN})),
        ("/api/find", json!({"connStr": CONN, "db": "shop"})),
        ("/api/count", json!({"db": "shop", "coll": "orders"})),
        ("/api/aggregate", json!({"connStr": CONN, "db": "shop"})),
        ("/api/serverInfo", json!({"connStr": ""})),
        ("/api/plan/execute", json!({"connStr": CONN})),
    ];

    for (path, body) in cases {
        let (status, text) = post(app(Config::default()), path, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert!(text.starts_with("Missing"), "{path}: {text}");
    }
}

#[tokio::test]
async fn test_unparseable_body_is_treated_as_empty() {
    let (status, text) = post_raw(app(Config::default()), "/api/find", "{not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.starts_with("Missing"));
}

#[tokio::test]
async fn test_invalid_shapes_rejected_before_connecting() {
    let (status, text) = post(
        app(Config::default()),
        "/api/aggregate",
        json!({"connStr": CONN, "db": "shop", "collection": "orders", "pipeline": {"$match": {}}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "pipeline must be an array");

    let (status, _) = post(
        app(Config::default()),
        "/api/find",
        json!({"connStr": CONN, "db": "shop", "coll": "orders", "filter": [1, 2]}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, text) = post(
        app(Config::default()),
        "/api/indexes/create",
        json!({"connStr": CONN, "db": "shop", "collection": "orders", "keys": "email"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "keys object required");
}

#[tokio::test]
async fn test_insert_many_over_limit() {
    let docs: Vec<Value> = (0..10_001).map(|i| json!({"i": i})).collect();
    let (status, text) = post(
        app(Config::default()),
        "/api/insertMany",
        json!({"connStr": CONN, "db": "shop", "collection": "orders", "docs": docs}),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(text, "Too many documents (max 10000)");
}

#[tokio::test]
async fn test_read_only_rejects_writes() {
    let body = json!({
        "connStr": CONN,
        "db": "shop",
        "collection": "orders",
        "name": "orders",
        "docs": [{"a": 1}],
        "doc": {"a": 1},
        "filter": {},
        "update": {"$set": {"a": 2}},
        "keys": {"a": 1},
    });

    for path in [
        "/api/databases/drop",
        "/api/collections/create",
        "/api/collections/drop",
        "/api/insertOne",
        "/api/insertMany",
        "/api/updateOne",
        "/api/updateMany",
        "/api/deleteOne",
        "/api/deleteMany",
        "/api/command",
        "/api/indexes/create",
        "/api/indexes/drop",
    ] {
        let (status, _) = post(app(read_only()), path, body.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn test_read_only_plan_reports_each_action() {
    let (status, text) = post(
        app(read_only()),
        "/api/plan/execute",
        json!({
            "connStr": CONN,
            "actions": [
                {"type": "deleteMany", "db": "shop", "collection": "orders",
                 "params": {"filter": {"_id": {"$in": ["a1", "a2"]}}}},
                {"type": "dropEverything", "db": "shop"},
                {"type": "insertMany", "db": "shop", "collection": "orders",
                 "params": {"docs": [{"_id": "n1"}]}},
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r["ok"] == false));
    assert!(results[0]["error"].as_str().unwrap().contains("read-only"));
    assert!(results[1]["error"].as_str().unwrap().starts_with("Invalid action"));
    assert_eq!(results[2]["type"], "insertMany");
    assert_eq!(body["affectedIds"], json!(["a1", "a2", "n1"]));
}

#[tokio::test]
async fn test_ai_without_key_returns_json_error() {
    let mut config = Config::default();
    config.ai.api_key_env = "DBDESK_TEST_UNSET_AI_KEY".to_string();

    let (status, text) = post(app(config), "/api/ai/gemini", json!({"prompt": "hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert!(body["error"].as_str().unwrap().contains("DBDESK_TEST_UNSET_AI_KEY"));
}
