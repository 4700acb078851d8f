// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin HTTP handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::message::{IotMessage, SERVICE_NAME, VENDOR_NAME, VERSION};
use crate::rest::AppState;

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub vendor: &'static str,
    pub version: &'static str,
    #[serde(rename = "serviceName")]
    pub service_name: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub gateway_ids: Vec<String>,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub tariff_id: u64,
    #[serde(default)]
    pub money: u64,
    #[serde(default)]
    pub vip: bool,
    #[serde(default, rename = "isLegalEntity")]
    pub is_legal_entity: bool,
}

/// `GET /api/v3/info`
pub async fn info() -> impl IntoResponse {
    Json(InfoResponse { vendor: VENDOR_NAME, version: VERSION, service_name: SERVICE_NAME })
}

/// `GET /api/v3/gateway/configure/{gateway_id}` — forward a configuration
/// RPC to the gateway; 400 on missing gateway or timeout.
pub async fn gateway_configure(
    State(state): State<Arc<AppState>>,
    Path(gateway_id): Path<String>,
) -> Response {
    let request = IotMessage::command(&gateway_id, "", "getConfiguration", "");
    match state.manager.do_gateway_rpc(&gateway_id, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::warn!(gateway_id = %gateway_id, err = %e, "gateway configure failed");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
    }
}

/// `POST /api/v3/command` — apply a command to every known gateway in the
/// list; 404 when none of them has a session.
pub async fn command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Response {
    let mut matched = false;

    for gateway_id in &req.gateway_ids {
        let Some(session) = state.manager.session(gateway_id).await else {
            continue;
        };
        matched = true;

        match req.command.as_str() {
            "push" => {
                let enabled = req.attribute == "on";
                if session.set_push(enabled).await {
                    tracing::info!(gateway_id = %gateway_id, enabled, "push flag toggled");
                } else {
                    tracing::warn!(
                        gateway_id = %gateway_id,
                        "push toggle skipped, business logic not loaded"
                    );
                }
            }
            "switch" => {
                let message =
                    IotMessage::command(gateway_id, &req.device_id, "switch", &req.attribute);
                session.send_message(message);
            }
            "setRecording" => {
                let mut message =
                    IotMessage::command(gateway_id, &req.device_id, "setRecording", &req.attribute);
                message.device_type = "camera".to_owned();
                message.tariff_id = req.tariff_id;
                message.money = req.money;
                message.vip = req.vip;
                message.legal_entity = req.is_legal_entity;
                session.dispatch(message);
            }
            other => {
                return (StatusCode::BAD_REQUEST, format!("unknown command: {other}"))
                    .into_response();
            }
        }
    }

    if matched {
        StatusCode::OK.into_response()
    } else {
        (StatusCode::NOT_FOUND, "no known gateway in list").into_response()
    }
}
