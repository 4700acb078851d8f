// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative HTTP surface, mounted under `/api/v3` with basic auth.

pub mod http;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use tower_http::cors::CorsLayer;

use crate::broker::manager::Manager;

/// Shared state for the admin handlers.
pub struct AppState {
    pub manager: Arc<Manager>,
    pub auth_user: String,
    pub auth_password: String,
}

/// Build the axum `Router` with all admin routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v3/info", get(http::info))
        .route("/api/v3/gateway/configure/{gateway_id}", get(http::gateway_configure))
        .route("/api/v3/command", post(http::command))
        .layer(middleware::from_fn_with_state(Arc::clone(&state), auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Constant-time string comparison to prevent timing side channels.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate `Authorization: Basic` credentials.
fn validate_basic(headers: &HeaderMap, user: &str, password: &str) -> bool {
    let Some(header) = headers.get("authorization").and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((given_user, given_password)) = decoded.split_once(':') else {
        return false;
    };
    constant_time_eq(given_user, user) && constant_time_eq(given_password, password)
}

/// Axum middleware enforcing basic auth on every admin route.
pub async fn auth_layer(
    State(state): State<Arc<AppState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !validate_basic(req.headers(), &state.auth_user, &state.auth_password) {
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }
    next.run(req).await
}
