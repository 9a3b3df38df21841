//! Integration tests for the health check endpoint.

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let (app, _state, _sinks) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "meterline-api");
    assert_eq!(response["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_check_lists_destinations() {
    let (app, _state, _sinks) = test_app();

    let (_status, response) = get(app, "/health").await;
    let destinations = response["destinations"].as_array().unwrap();

    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0], "memory");
}
