//! Integration tests for the qrtrak-rd HTTP surface
//!
//! Tests cover:
//! - Redirect resolution (302 + Location) with scan accounting
//! - Not-found behavior for unknown, inactive, and malformed ids
//! - Quota enforcement and the 403 upgrade page
//! - Lazy monthly reset across a month boundary
//! - Concurrent scans racing for the last free-plan slot
//! - Health and buildinfo endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

use qrtrak_rd::resolver::{RedirectResolver, ResolveError, ScanRequest};
use qrtrak_rd::{build_router, AppState};

const UPGRADE_URL: &str = "https://qrtrak.test/upgrade";

const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148 Safari/604.1";

/// Test helper: in-memory database with schema applied.
///
/// In-memory SQLite gives every new connection its own database, so
/// the pool is capped at one connection.
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Should open in-memory database");
    qrtrak_common::db::create_schema(&pool)
        .await
        .expect("Should create schema");
    pool
}

/// Test helper: create app router over the given pool
fn setup_app(db: SqlitePool) -> axum::Router {
    let state = AppState::new(db, UPGRADE_URL.to_string());
    build_router(state)
}

/// Test helper: GET request with a user-agent header
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::USER_AGENT, IPHONE_UA)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Test helper: extract text body from response
async fn extract_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    String::from_utf8(bytes.to_vec()).expect("Should be UTF-8")
}

async fn insert_user(pool: &SqlitePool, plan: &str, used: i64, reset: DateTime<Utc>) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO users (email, subscription_plan, monthly_scans_used, scan_reset_date, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(format!("owner-{}@example.com", plan))
    .bind(plan)
    .bind(used)
    .bind(reset)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn insert_code(pool: &SqlitePool, owner_id: i64, dest: &str, active: bool) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO qr_codes (owner_id, destination_url, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(owner_id)
    .bind(dest)
    .bind(active)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn scans_used(pool: &SqlitePool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT monthly_scans_used FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn event_count(pool: &SqlitePool, code_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM scan_events WHERE qr_code_id = ?")
        .bind(code_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

// =============================================================================
// Health / buildinfo endpoints
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "qrtrak-rd");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(get_request("/api/buildinfo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["version"].is_string());
    assert!(body["git_hash"].is_string());
    assert!(body["build_timestamp"].is_string());
    assert!(body["build_profile"].is_string());
}

// =============================================================================
// Redirect resolution
// =============================================================================

#[tokio::test]
async fn test_redirect_success_is_302_with_location() {
    let pool = setup_test_db().await;
    let user = insert_user(&pool, "free", 0, Utc::now()).await;
    let code = insert_code(&pool, user, "https://example.com/menu", true).await;
    let app = setup_app(pool.clone());

    let response = app.oneshot(get_request(&format!("/r/{}", code))).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/menu"
    );

    assert_eq!(scans_used(&pool, user).await, 1);
    assert_eq!(event_count(&pool, code).await, 1);

    // Device classification from the iPhone user-agent header
    let device: String = sqlx::query_scalar("SELECT device_type FROM scan_events WHERE qr_code_id = ?")
        .bind(code)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(device, "mobile");
}

#[tokio::test]
async fn test_unknown_code_is_404() {
    let app = setup_app(setup_test_db().await);

    let response = app.oneshot(get_request("/r/424242")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inactive_code_is_404() {
    let pool = setup_test_db().await;
    let user = insert_user(&pool, "business", 0, Utc::now()).await;
    let code = insert_code(&pool, user, "https://example.com", false).await;
    let app = setup_app(pool.clone());

    let response = app.oneshot(get_request(&format!("/r/{}", code))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Not-found path leaves no trace
    assert_eq!(scans_used(&pool, user).await, 0);
    assert_eq!(event_count(&pool, code).await, 0);
}

#[tokio::test]
async fn test_malformed_ids_are_404() {
    let pool = setup_test_db().await;
    let app = setup_app(pool);

    for id in ["abc", "-3", "0", "1.5"] {
        let response = app
            .clone()
            .oneshot(get_request(&format!("/r/{}", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "id {:?}", id);
    }
}

// =============================================================================
// Quota enforcement
// =============================================================================

#[tokio::test]
async fn test_free_plan_second_scan_gets_upgrade_page() {
    let pool = setup_test_db().await;
    let user = insert_user(&pool, "free", 0, Utc::now()).await;
    let code = insert_code(&pool, user, "https://example.com", true).await;
    let app = setup_app(pool.clone());

    let first = app
        .clone()
        .oneshot(get_request(&format!("/r/{}", code)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::FOUND);

    let second = app.oneshot(get_request(&format!("/r/{}", code))).await.unwrap();
    assert_eq!(second.status(), StatusCode::FORBIDDEN);

    let body = extract_text(second.into_body()).await;
    assert!(body.contains(UPGRADE_URL), "upgrade link missing from page");
    assert!(body.contains("scan limit"), "expected quota page copy");

    // Rejected request changed nothing
    assert_eq!(scans_used(&pool, user).await, 1);
    assert_eq!(event_count(&pool, code).await, 1);
}

#[tokio::test]
async fn test_business_plan_is_unbounded() {
    let pool = setup_test_db().await;
    let user = insert_user(&pool, "business", 0, Utc::now()).await;
    let code = insert_code(&pool, user, "https://example.com", true).await;
    let app = setup_app(pool.clone());

    for _ in 0..4 {
        let response = app
            .clone()
            .oneshot(get_request(&format!("/r/{}", code)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    assert_eq!(scans_used(&pool, user).await, 4);
    assert_eq!(event_count(&pool, code).await, 4);
}

#[tokio::test]
async fn test_month_boundary_reset_allows_scan() {
    let pool = setup_test_db().await;
    // Free user, previously exhausted, idle for 35 days
    let stale_anchor = Utc::now() - Duration::days(35);
    let user = insert_user(&pool, "free", 1, stale_anchor).await;
    let code = insert_code(&pool, user, "https://example.com", true).await;
    let app = setup_app(pool.clone());

    let response = app.oneshot(get_request(&format!("/r/{}", code))).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    // Usage was reset, then this scan claimed the fresh slot
    assert_eq!(scans_used(&pool, user).await, 1);

    let anchor: DateTime<Utc> =
        sqlx::query_scalar("SELECT scan_reset_date FROM users WHERE id = ?")
            .bind(user)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(anchor > Utc::now() - Duration::minutes(1));
}

// =============================================================================
// Concurrency
// =============================================================================

/// Two simultaneous scans against one remaining free-plan slot must
/// produce exactly one success. Uses a file-backed database so the
/// two resolutions really run on separate connections.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_scans_claim_single_slot_once() {
    let tmp = tempfile::tempdir().unwrap();
    let pool = qrtrak_common::db::init_database(&tmp.path().join("qrtrak.db"))
        .await
        .unwrap();

    let user = insert_user(&pool, "free", 0, Utc::now()).await;
    let code = insert_code(&pool, user, "https://example.com", true).await;

    let resolver = RedirectResolver::new(pool.clone());
    let (a, b) = tokio::join!(
        tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve(code, &ScanRequest::default()).await }
        }),
        tokio::spawn({
            let resolver = resolver.clone();
            async move { resolver.resolve(code, &ScanRequest::default()).await }
        }),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let quota_rejections = outcomes
        .iter()
        .filter(|r| matches!(r, Err(ResolveError::QuotaExceeded { .. })))
        .count();

    assert_eq!(successes, 1, "exactly one scan may claim the last slot");
    assert_eq!(quota_rejections, 1, "the loser must see QuotaExceeded");

    assert_eq!(scans_used(&pool, user).await, 1);
    assert_eq!(event_count(&pool, code).await, 1);
}
