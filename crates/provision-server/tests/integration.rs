use axum::http::StatusCode;
use http_body_util::BodyExt;
use provision_core::model::{Campaign, NewCredential};
use provision_server::state::AppState;
use tempfile::TempDir;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Bootstrap a minimal provision project inside the given temp directory.
fn init_project(dir: &TempDir) -> AppState {
    let mut config = provision_core::config::Config::new("test-project");
    config.driver.login_url = "https://app.example/login".into();
    config.cycle.delay_seconds = 0.0;
    config.save(dir.path()).unwrap();
    std::fs::create_dir_all(dir.path().join("content")).unwrap();
    AppState::open(dir.path().to_path_buf()).unwrap()
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn router(state: &AppState) -> axum::Router {
    provision_server::build_router(state.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_project() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, json) = get(router(&state), "/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["project"], "test-project");
    assert!(json["running_cycle"].is_null());
}

#[tokio::test]
async fn credentials_never_expose_secret() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);
    state
        .db
        .add_credential(NewCredential {
            login: "ops@example.com".into(),
            secret: "hunter2".into(),
            egress: None,
        })
        .unwrap();

    let (status, json) = get(router(&state), "/api/credentials").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["login"], "ops@example.com");
    assert!(json[0].get("secret").is_none());
    assert!(!json.to_string().contains("hunter2"));
}

#[tokio::test]
async fn add_credential_with_unknown_egress_is_400() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, _) = post_json(
        router(&state),
        "/api/credentials",
        serde_json::json!({"login": "a", "secret": "b", "egress": "nowhere"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_campaign_is_409() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);
    let body = serde_json::json!({"id": 5, "name": "Acme", "target_site": "https://acme.example"});

    let (status, _) = post_json(router(&state), "/api/campaigns", body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post_json(router(&state), "/api/campaigns", body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = get(router(&state), "/api/campaigns").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_campaign_is_404() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);
    state
        .db
        .add_campaign(&Campaign {
            id: 7,
            name: "Roofing".into(),
            target_site: "https://roof.example".into(),
        })
        .unwrap();

    let (status, _) = get(router(&state), "/api/campaigns/8").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, json) = get(router(&state), "/api/campaigns/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Roofing");
}

#[tokio::test]
async fn negative_delay_is_rejected() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, json) = post_json(
        router(&state),
        "/api/cycles",
        serde_json::json!({"delay_seconds": -1.0}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("delay"));
    assert!(state.cycles().list().is_empty());
}

#[tokio::test]
async fn second_cycle_while_running_is_409() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);
    state.cycles().try_begin(Some(1), 0.0).unwrap();

    let (status, _) = post_json(router(&state), "/api/cycles", serde_json::json!({})).await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn requested_cap_is_clamped_to_ceiling() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, json) = post_json(
        router(&state),
        "/api/cycles",
        serde_json::json!({"max_total_iterations": 100000}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["status"], "scheduled");
    assert_eq!(json["max_total_iterations"], 50);
}

#[tokio::test]
async fn scheduled_cycle_with_empty_pool_finishes() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, json) = post_json(router(&state), "/api/cycles", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = json["id"].as_str().unwrap().to_string();

    let mut record = serde_json::Value::Null;
    for _ in 0..100 {
        let (_, json) = get(router(&state), &format!("/api/cycles/{id}")).await;
        if json["status"] != "running" {
            record = json;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert_eq!(record["status"], "completed");
    assert_eq!(record["report"]["iterations"], 0);
    assert_eq!(record["report"]["stop_reason"], "pool_exhausted");

    let (_, list) = get(router(&state), "/api/cycles").await;
    assert_eq!(list[0]["id"], id.as_str());
}

#[tokio::test]
async fn unknown_cycle_is_404() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, _) = get(router(&state), "/api/cycles/does-not-exist").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn next_item_follows_cycle_order() {
    let dir = TempDir::new().unwrap();
    let state = init_project(&dir);

    let (status, json) = get(router(&state), "/api/items/next").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    for (campaign, locality) in [("7", "Austin"), ("5", "Denver"), ("5", "Boston")] {
        let campaign_dir = dir.path().join("content").join(campaign);
        std::fs::create_dir_all(&campaign_dir).unwrap();
        std::fs::write(campaign_dir.join(format!("{locality}.txt")), "plumber\n").unwrap();
    }

    let (status, json) = get(router(&state), "/api/items/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["campaign_id"], 5);
    assert_eq!(json["locality"], "Boston");
    assert_eq!(json["phrases"][0], "plumber");
}
