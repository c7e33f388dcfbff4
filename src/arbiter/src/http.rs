// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The six-endpoint assignment API, a thin HTTP skin over
//! [`ose_assign::AssignmentTable`].
//!
//! Request bodies are parsed by hand rather than through axum's `Json`
//! extractor so that a malformed body and an unknown controller id both
//! surface as a 404, instead of axum's default 400/422 rejection.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use ose_assign::{AssignError, AssignmentTable};
use ose_common::{Fingerprint, RequestId};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub struct AppState {
    pub table: Arc<AssignmentTable>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/heartbeat", post(heartbeat))
        .route("/image/found", post(image_found))
        .route("/image/request", post(image_request))
        .route("/image/:id/processing", post(image_processing))
        .route("/image/:id/done", post(image_done))
        .route("/image/:id/abort", post(image_abort))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn parse_json<T: serde::de::DeserializeOwned>(bytes: &Bytes) -> Result<T, StatusCode> {
    serde_json::from_slice(bytes).map_err(|error| {
        warn!(%error, "malformed request body");
        StatusCode::NOT_FOUND
    })
}

#[derive(Debug, Deserialize)]
struct HeartbeatRequest {
    id: String,
    workers: i64,
}

async fn heartbeat(State(state): State<Arc<AppState>>, bytes: Bytes) -> impl IntoResponse {
    let req: HeartbeatRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status,
    };
    state.table.heartbeat(&req.id, req.workers, Utc::now());
    StatusCode::CREATED
}

#[derive(Debug, Deserialize)]
struct ImageRequest {
    id: String,
    spec: String,
}

#[derive(Debug, Serialize)]
struct AssignmentResponse {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "startScan")]
    start_scan: bool,
    #[serde(rename = "skipScan")]
    skip_scan: bool,
}

async fn image_found(State(state): State<Arc<AppState>>, bytes: Bytes) -> Response {
    let req: ImageRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status.into_response(),
    };
    let fingerprint = Fingerprint::new(req.spec);
    match state.table.found(&req.id, &fingerprint) {
        Ok((request_id, outcome)) => (
            StatusCode::CREATED,
            Json(AssignmentResponse {
                request_id: request_id.to_string(),
                start_scan: outcome.start_scan,
                skip_scan: outcome.skip_scan,
            }),
        )
            .into_response(),
        Err(AssignError::UnknownController(id)) => {
            warn!(controller_id = %id, "found from unregistered controller");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            warn!(%err, "unexpected error handling /image/found");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn image_request(State(state): State<Arc<AppState>>, bytes: Bytes) -> Response {
    let req: ImageRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status.into_response(),
    };
    let fingerprint = Fingerprint::new(req.spec);
    match state.table.request(&req.id, &fingerprint, Utc::now()) {
        Ok((request_id, outcome)) => (
            StatusCode::OK,
            Json(AssignmentResponse {
                request_id: request_id.to_string(),
                start_scan: outcome.start_scan,
                skip_scan: outcome.skip_scan,
            }),
        )
            .into_response(),
        Err(AssignError::UnknownController(id)) => {
            warn!(controller_id = %id, "request from unregistered controller");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(err) => {
            warn!(%err, "unexpected error handling /image/request");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct HolderRequest {
    id: String,
}

async fn image_processing(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> StatusCode {
    let req: HolderRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status,
    };
    let request_id = RequestId::from(id);
    match state.table.processing(&req.id, &request_id, Utc::now()) {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::NOT_FOUND,
    }
}

async fn image_done(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> StatusCode {
    let req: HolderRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status,
    };
    let request_id = RequestId::from(id);
    match state.table.done(&req.id, &request_id) {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::NOT_FOUND,
    }
}

async fn image_abort(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    bytes: Bytes,
) -> StatusCode {
    let req: HolderRequest = match parse_json(&bytes) {
        Ok(req) => req,
        Err(status) => return status,
    };
    let request_id = RequestId::from(id);
    match state.table.abort(&req.id, &request_id) {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use ose_assign::AssignConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(AppState {
            table: Arc::new(AssignmentTable::new(AssignConfig::default())),
        }))
    }

    async fn post(app: &Router, uri: &str, body: serde_json::Value) -> StatusCode {
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn heartbeat_then_found_then_request_round_trip() {
        let app = app();
        assert_eq!(
            post(&app, "/heartbeat", serde_json::json!({"id": "node-1", "workers": 2})).await,
            StatusCode::CREATED
        );

        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/image/found")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({"id": "node-1", "spec": "img@sha256:abc"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        assert_eq!(
            post(
                &app,
                "/image/request",
                serde_json::json!({"id": "node-1", "spec": "img@sha256:abc"})
            )
            .await,
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn unknown_controller_is_404_everywhere() {
        let app = app();
        assert_eq!(
            post(
                &app,
                "/image/found",
                serde_json::json!({"id": "ghost", "spec": "img@sha256:abc"})
            )
            .await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn malformed_heartbeat_body_is_404() {
        let app = app();
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/heartbeat")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
