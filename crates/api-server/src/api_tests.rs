use super::*;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use notification_service::{DeliveryId, DryRunGateway, GatewayError};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

/// Gateway whose provider always rejects the message.
struct RejectingGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl NotificationGateway for RejectingGateway {
    async fn send(&self, _destination: &str, _text: &str) -> Result<DeliveryId, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::Provider {
            status: 401,
            message: "Authenticate".into(),
        })
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

async fn test_app(gateway: Arc<dyn NotificationGateway>, policy: WelcomePolicy) -> (Router, AppState) {
    let store = SubscriberStore::open("sqlite::memory:").await.unwrap();
    let state = AppState::new(
        store,
        gateway,
        Arc::new(SyntheticRateSource::with_seed(7)),
        policy,
        "http://localhost:5173",
    );
    let config = ServerConfig::from_lookup(|_| None).unwrap();
    (build_router(state.clone(), &config), state)
}

async fn dry_run_app() -> (Router, AppState) {
    test_app(Arc::new(DryRunGateway::new()), WelcomePolicy::BestEffort).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = dry_run_app().await;
    let (status, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _) = dry_run_app().await;
    let request = Request::builder()
        .uri("/api/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn test_subscribe_list_unsubscribe() {
    let (app, _) = dry_run_app().await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/subscribe",
            r#"{"phoneNumber":"+44 7911 123456","notificationThreshold":1.28}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(&app, get("/api/subscribers")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["phone_number"], "447911123456");
    assert_eq!(list[0]["notification_threshold"], 1.28);
    assert_eq!(list[0]["subscribed"], true);

    let (status, body) = send(
        &app,
        post_json("/api/unsubscribe", r#"{"phoneNumber":"447911123456"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = send(&app, get("/api/subscribers")).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_resubscribe_updates_threshold() {
    let (app, state) = dry_run_app().await;
    for threshold in ["1.28", "1.31"] {
        let body = format!(
            r#"{{"phoneNumber":"447911123456","notificationThreshold":{}}}"#,
            threshold
        );
        let (status, _) = send(&app, post_json("/api/subscribe", &body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let active = state.store.list_active().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].notification_threshold, 1.31);
}

#[tokio::test]
async fn test_unsubscribe_unknown_number_succeeds() {
    let (app, _) = dry_run_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/unsubscribe", r#"{"phoneNumber":"15550001111"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_subscribe_rejects_bad_input() {
    let (app, state) = dry_run_app().await;

    let cases = [
        r#"{"phoneNumber":"447911123456"}"#,
        r#"{"notificationThreshold":1.3}"#,
        r#"{"phoneNumber":"447911123456","notificationThreshold":-1}"#,
        r#"{"phoneNumber":"not a phone","notificationThreshold":1.3}"#,
        r#"{"phoneNumber":"447911123456","notificationThreshold":"high"}"#,
        "{not json",
    ];
    for case in cases {
        let (status, body) = send(&app, post_json("/api/subscribe", case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", case);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    assert_eq!(state.store.count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn test_whatsapp_relay() {
    let (app, _) = dry_run_app().await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/notifications/whatsapp",
            r#"{"to":"447911123456","message":"hello"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["messageId"].as_str().unwrap().starts_with("dry-run-"));
}

#[tokio::test]
async fn test_whatsapp_missing_parameters() {
    let (app, _) = dry_run_app().await;
    let (status, body) = send(
        &app,
        post_json("/api/notifications/whatsapp", r#"{"to":"447911123456"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameters");
}

#[tokio::test]
async fn test_whatsapp_provider_failure_is_generic() {
    let gateway = Arc::new(RejectingGateway {
        calls: AtomicUsize::new(0),
    });
    let (app, _) = test_app(gateway, WelcomePolicy::BestEffort).await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/notifications/whatsapp",
            r#"{"to":"447911123456","message":"hello"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to send notification");
}

#[tokio::test]
async fn test_required_welcome_failure_stores_nothing() {
    let gateway = Arc::new(RejectingGateway {
        calls: AtomicUsize::new(0),
    });
    let (app, state) = test_app(gateway.clone(), WelcomePolicy::Required).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/subscribe",
            r#"{"phoneNumber":"447911123456","notificationThreshold":1.28}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert!(state.store.get("447911123456").await.unwrap().is_none());
}

#[tokio::test]
async fn test_best_effort_welcome_failure_still_subscribes() {
    let gateway = Arc::new(RejectingGateway {
        calls: AtomicUsize::new(0),
    });
    let (app, state) = test_app(gateway.clone(), WelcomePolicy::BestEffort).await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/subscribe",
            r#"{"phoneNumber":"447911123456","notificationThreshold":1.28}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert!(state.store.get("447911123456").await.unwrap().is_some());
}

#[tokio::test]
async fn test_rates_snapshot_starts_empty() {
    let (app, _) = dry_run_app().await;
    let (status, body) = send(&app, get("/api/rates")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["pairs"].as_array().unwrap().is_empty());
    assert!(body["updatedAt"].is_null());
}

#[tokio::test]
async fn test_rate_history() {
    let (app, _) = dry_run_app().await;

    let (status, body) = send(&app, get("/api/rates/GBP-USD/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 31);

    let (status, body) = send(&app, get("/api/rates/gbp-eur/history?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    let points = body.as_array().unwrap();
    assert_eq!(points.len(), 8);
    assert!(points[0]["date"].is_string());
    assert!(points[0]["rate"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_rate_history_errors() {
    let (app, _) = dry_run_app().await;

    let (status, body) = send(&app, get("/api/rates/GBP-AUD/history")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, get("/api/rates/GBP-USD/history?days=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, get("/api/rates/GBPUSD/history")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_history_malformed_query_uses_error_shape() {
    let (app, _) = dry_run_app().await;

    for uri in [
        "/api/rates/GBP-USD/history?days=abc",
        "/api/rates/GBP-USD/history?days=-1",
        "/api/rates/GBP-USD/history?days=366",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

#[test]
fn test_default_tracked_pairs_are_quoted() {
    let config = ServerConfig::from_lookup(|_| None).unwrap();
    assert!(ensure_quoted(&config.tracked_pairs, &SyntheticRateSource::new()).is_ok());
}

#[test]
fn test_unquoted_tracked_pair_is_rejected() {
    let config = ServerConfig::from_lookup(|key| match key {
        "TRACKED_PAIRS" => Some("GBP-AUD,GBP-USD".to_string()),
        _ => None,
    })
    .unwrap();

    let err = ensure_quoted(&config.tracked_pairs, &SyntheticRateSource::new()).unwrap_err();
    assert!(err.to_string().contains("no rate data: GBP-AUD (available:"));
}

fn serve_config(port: u16, database_path: &std::path::Path, pairs: &str) -> ServerConfig {
    let database_url = format!("sqlite:{}", database_path.display());
    let port = port.to_string();
    let pairs = pairs.to_string();
    ServerConfig::from_lookup(move |key| match key {
        "PORT" => Some(port.clone()),
        "DATABASE_URL" => Some(database_url.clone()),
        "TRACKED_PAIRS" => Some(pairs.clone()),
        _ => None,
    })
    .unwrap()
}

fn temp_database() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("fx-alert-{}.db", uuid::Uuid::new_v4()))
}

#[tokio::test]
async fn test_serve_bind_failure_opens_nothing() {
    let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = taken.local_addr().unwrap().port();
    let db_path = temp_database();

    let result = serve(serve_config(port, &db_path, "GBP-USD"), async {}).await;

    assert!(result.unwrap_err().to_string().contains("Failed to bind"));
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_serve_rejects_unquoted_pair_before_opening_store() {
    let db_path = temp_database();

    let result = serve(serve_config(0, &db_path, "GBP-AUD,GBP-USD"), async {}).await;

    assert!(result.unwrap_err().to_string().contains("GBP-AUD"));
    assert!(!db_path.exists());
}

#[tokio::test]
async fn test_serve_starts_and_stops() {
    let db_path = temp_database();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        serve(serve_config(0, &db_path, "GBP-USD,GBP-EUR"), async {}),
    )
    .await
    .expect("server did not shut down");

    assert!(result.is_ok());
    assert!(db_path.exists());
    let _ = std::fs::remove_file(&db_path);
}
