// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directions client against a local stub provider.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use ecobin_field::models::{LocationPoint, RouteSource, TravelMode};
use ecobin_field::services::geodesy::{encode_polyline, haversine_distance};
use ecobin_field::services::DirectionsClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const ORIGIN: LocationPoint = LocationPoint::new(14.5995, 120.9842);
const DEST: LocationPoint = LocationPoint::new(14.6095, 120.9942);

#[derive(Clone)]
struct Stub {
    status: StatusCode,
    body: serde_json::Value,
    last_query: Arc<Mutex<Option<HashMap<String, String>>>>,
}

async fn stub_directions(
    State(stub): State<Stub>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    *stub.last_query.lock().unwrap() = Some(params);
    (stub.status, Json(stub.body.clone()))
}

/// Serve `body` from `/directions/json` on an ephemeral port.
async fn start_stub(status: StatusCode, body: serde_json::Value) -> (String, Stub) {
    let stub = Stub {
        status,
        body,
        last_query: Arc::new(Mutex::new(None)),
    };
    let app = Router::new()
        .route("/directions/json", get(stub_directions))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), stub)
}

fn ok_body(points: &[LocationPoint]) -> serde_json::Value {
    serde_json::json!({
        "status": "OK",
        "routes": [{
            "legs": [{
                "distance": { "value": 1834.0, "text": "1.8 km" },
                "duration": { "value": 420.0, "text": "7 mins" }
            }],
            "overview_polyline": { "points": encode_polyline(points).unwrap() }
        }]
    })
}

#[tokio::test]
async fn test_provider_route_used() {
    let path = [ORIGIN, LocationPoint::new(14.6040, 120.9890), DEST];
    let (base_url, stub) = start_stub(StatusCode::OK, ok_body(&path)).await;
    let client = DirectionsClient::new(base_url, "stub-key").unwrap();

    let route = client.get_route(ORIGIN, DEST, TravelMode::Walking).await;

    assert!(route.success);
    assert_eq!(route.source, RouteSource::Directions);
    assert_eq!(route.coordinates.len(), 3);
    assert!((route.coordinates[1].latitude - 14.6040).abs() < 1e-5);
    assert_eq!(route.distance_meters, 1834.0);
    assert_eq!(route.duration_seconds, 420.0);
    assert_eq!(route.duration_label, "7 mins");
    assert!(route.error_reason.is_none());

    let query = stub.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(query["origin"], "14.5995,120.9842");
    assert_eq!(query["destination"], "14.6095,120.9942");
    assert_eq!(query["mode"], "walking");
    assert_eq!(query["key"], "stub-key");
}

#[tokio::test]
async fn test_zero_results_falls_back() {
    let (base_url, _stub) =
        start_stub(StatusCode::OK, serde_json::json!({ "status": "ZERO_RESULTS", "routes": [] }))
            .await;
    let client = DirectionsClient::new(base_url, "stub-key").unwrap();

    let route = client.get_route(ORIGIN, DEST, TravelMode::Driving).await;

    assert!(route.success);
    assert!(route.is_fallback());
    assert_eq!(route.coordinates, vec![ORIGIN, DEST]);
    assert!((route.distance_meters - haversine_distance(ORIGIN, DEST)).abs() < 1e-6);
    assert!(!route.duration_label.is_empty());
    assert!(route.error_reason.unwrap().contains("ZERO_RESULTS"));
}

#[tokio::test]
async fn test_request_denied_falls_back() {
    let (base_url, _stub) = start_stub(
        StatusCode::OK,
        serde_json::json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        }),
    )
    .await;
    let client = DirectionsClient::new(base_url, "bad-key").unwrap();

    let route = client.get_route(ORIGIN, DEST, TravelMode::Driving).await;

    assert!(route.is_fallback());
    let reason = route.error_reason.unwrap();
    assert!(reason.contains("REQUEST_DENIED"));
    assert!(reason.contains("API key is invalid"));
}

#[tokio::test]
async fn test_http_error_falls_back() {
    let (base_url, _stub) =
        start_stub(StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({})).await;
    let client = DirectionsClient::new(base_url, "stub-key").unwrap();

    let route = client.get_route(ORIGIN, DEST, TravelMode::Bicycling).await;

    assert!(route.is_fallback());
    assert_eq!(route.coordinates.len(), 2);
}

#[tokio::test]
async fn test_fetch_route_surfaces_error_without_fallback() {
    let (base_url, _stub) =
        start_stub(StatusCode::OK, serde_json::json!({ "status": "NOT_FOUND" })).await;
    let client = DirectionsClient::new(base_url, "stub-key").unwrap();

    let err = client
        .fetch_route(ORIGIN, DEST, TravelMode::Driving)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("NOT_FOUND"));
}

#[tokio::test]
async fn test_fallback_duration_depends_on_mode() {
    let client = DirectionsClient::new("http://127.0.0.1:9", "stub-key").unwrap();

    let walking = client.get_route(ORIGIN, DEST, TravelMode::Walking).await;
    let driving = client.get_route(ORIGIN, DEST, TravelMode::Driving).await;

    assert!(walking.is_fallback() && driving.is_fallback());
    assert!(walking.duration_seconds > driving.duration_seconds);
}

#[tokio::test]
async fn test_fallback_reason_omits_api_key() {
    let unreachable = DirectionsClient::new("http://127.0.0.1:9", "secret-maps-key").unwrap();
    let route = unreachable
        .get_route(ORIGIN, DEST, TravelMode::Driving)
        .await;
    let reason = route.error_reason.unwrap();
    assert!(reason.starts_with("Request failed"));
    assert!(!reason.contains("secret-maps-key"));

    let (base_url, _stub) = start_stub(StatusCode::OK, serde_json::json!("not a route")).await;
    let malformed = DirectionsClient::new(base_url, "secret-maps-key").unwrap();
    let route = malformed.get_route(ORIGIN, DEST, TravelMode::Driving).await;
    let reason = route.error_reason.unwrap();
    assert!(reason.starts_with("JSON parse error"));
    assert!(!reason.contains("secret-maps-key"));
}
