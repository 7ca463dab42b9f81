//! Position-report endpoint integration tests.
//!
//! The handler stamps reports with the wall clock, so the accept-after-move
//! cases sleep briefly to keep implied speeds inside the envelope; the
//! reject cases need no timing help (a 660 km jump is implausible at any
//! test-scale delay).

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use ig_test_utils::{read_json, set_cookie_value, TestApp};
use tower::ServiceExt;

const AGENT: &str = "BeaconApp/2.1 (integration)";

const PARIS: (f64, f64) = (48.8566, 2.3522);
const PARIS_NEARBY: (f64, f64) = (48.8567, 2.3523);
const MARSEILLE: (f64, f64) = (43.2965, 5.3698);

async fn establish_session(app: &TestApp) -> String {
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/auth/register")
                .header(header::USER_AGENT, AGENT)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "email": "reporter@example.org",
                        "displayName": "Reporter",
                        "password": "correct horse",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let access_token = set_cookie_value(&response, "access_token").unwrap();
    let sid = set_cookie_value(&response, "sid").unwrap();
    format!("access_token={access_token}; sid={sid}")
}

fn report(cookies: &str, lat: f64, lng: f64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/positions")
        .header(header::USER_AGENT, AGENT)
        .header(header::COOKIE, cookies.to_string())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"lat": lat, "lng": lng}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_first_report_is_accepted() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    let response = app
        .router()
        .oneshot(report(&cookies, PARIS.0, PARIS.1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "accepted");
}

#[tokio::test]
async fn test_small_move_accepted_large_jump_rejected_baseline_held() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    // Seed.
    let response = app
        .router()
        .oneshot(report(&cookies, PARIS.0, PARIS.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // ~13 m after ≥150 ms is well under the speed cap.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let response = app
        .router()
        .oneshot(report(&cookies, PARIS_NEARBY.0, PARIS_NEARBY.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Paris -> Marseille moments later: rejected.
    let response = app
        .router()
        .oneshot(report(&cookies, MARSEILLE.0, MARSEILLE.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");

    // The baseline held: re-reporting the last accepted point is a
    // zero-displacement update and succeeds. Had the rejected jump advanced
    // the baseline to Marseille, this would be another 660 km jump.
    let response = app
        .router()
        .oneshot(report(&cookies, PARIS_NEARBY.0, PARIS_NEARBY.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_report_without_session_is_unauthorized() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    // Strip the sid cookie, keep the credential.
    let access_only = cookies
        .split("; ")
        .find(|c| c.starts_with("access_token="))
        .unwrap()
        .to_string();

    let response = app
        .router()
        .oneshot(report(&access_only, PARIS.0, PARIS.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_report_without_credential_is_unauthorized() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    let sid_only = cookies
        .split("; ")
        .find(|c| c.starts_with("sid="))
        .unwrap()
        .to_string();

    let response = app
        .router()
        .oneshot(report(&sid_only, PARIS.0, PARIS.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_report_with_expired_session_is_unauthorized() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    // Session TTL elapses in the store.
    app.store.advance(Duration::from_secs(3601));

    let response = app
        .router()
        .oneshot(report(&cookies, PARIS.0, PARIS.1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_out_of_range_coordinates_are_bad_request() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    for (lat, lng) in [(91.0, 0.0), (-91.0, 0.0), (0.0, 181.0), (0.0, -181.0)] {
        let response = app.router().oneshot(report(&cookies, lat, lng)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for ({lat}, {lng})"
        );
    }
}

#[tokio::test]
async fn test_store_outage_fails_closed_with_503() {
    let app = TestApp::new();
    let cookies = establish_session(&app).await;

    app.store.set_unavailable(true);

    let response = app
        .router()
        .oneshot(report(&cookies, PARIS.0, PARIS.1))
        .await
        .unwrap();
    // The rate limiter is the first store touch and fails closed.
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
