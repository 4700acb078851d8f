// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Side-effect tasks scheduled off the dispatcher.
//!
//! Every task is a stateless one-shot unit over a message copy and the
//! shared dependency bundle. Tasks log their own failures and never
//! propagate errors back to the dispatcher.

pub mod camera_state;
pub mod gateway_message;
pub mod gateway_status;
pub mod preview;
pub mod push;
pub mod record;
pub mod runner;
pub mod sensor_sql;
pub mod sensor_tsdb;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::broker::writer::GatewayWriter;
use crate::config::CloudConfig;
use crate::error::CloudError;
use crate::message::IotMessage;
use crate::tasks::runner::TaskRunner;

// -- Task taxonomy ------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    UpdateGatewayStatus,
    UpdateCameraState,
    UpdateCameraStreaming,
    StorePreview,
    StoreSensorSql,
    StoreSensorTsdb,
    RecordMediaStream,
    SendPush,
    SendGatewayMessage,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateGatewayStatus => "update-gateway-status",
            Self::UpdateCameraState => "update-camera-state",
            Self::UpdateCameraStreaming => "update-camera-streaming",
            Self::StorePreview => "store-preview",
            Self::StoreSensorSql => "store-sensor-relational",
            Self::StoreSensorTsdb => "store-sensor-timeseries",
            Self::RecordMediaStream => "record-media-stream",
            Self::SendPush => "send-push",
            Self::SendGatewayMessage => "send-gateway-message",
        }
    }
}

/// One scheduled side effect: the task kind plus a copy of the message as
/// of dispatch time.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub kind: TaskKind,
    pub message: IotMessage,
}

/// Capability handed to the dispatcher for scheduling side effects.
///
/// Production wires this to the bounded worker pool; tests collect the
/// requests instead.
pub trait TaskSpawner: Send + Sync {
    fn schedule(&self, request: TaskRequest);
}

// -- Dependency bundle --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TsdbConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct WowzaConfig {
    pub username: String,
    pub password: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub host: String,
    pub request_uri: String,
    pub app_id: String,
    pub rest_api_key: String,
}

/// Shared dependencies for all tasks.
pub struct TaskCtx {
    pub db: sqlx::MySqlPool,
    pub http: reqwest::Client,
    pub db_timeout: Duration,
    pub tsdb: TsdbConfig,
    pub wowza: WowzaConfig,
    pub push: PushConfig,
}

impl TaskCtx {
    pub fn new(config: &CloudConfig, db: sqlx::MySqlPool) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            db,
            http,
            db_timeout: config.db_timeout(),
            tsdb: TsdbConfig {
                url: config.tsdb_url(),
                username: config.tsdb_user.clone(),
                password: config.tsdb_password.clone(),
            },
            wowza: WowzaConfig {
                username: config.wowza_user.clone(),
                password: config.wowza_password.clone(),
                port: config.wowza_port,
            },
            push: PushConfig {
                host: config.push_host.clone(),
                request_uri: config.push_request_uri.clone(),
                app_id: config.push_app_id.clone(),
                rest_api_key: config.push_rest_api_key.clone(),
            },
        }
    }
}

/// Bound a relational store operation by the configured timeout.
pub(crate) async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, CloudError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Err(_) => Err(CloudError::ExternalStore("relational store timeout".to_owned())),
        Ok(Err(e)) => Err(CloudError::ExternalStore(e.to_string())),
        Ok(Ok(value)) => Ok(value),
    }
}

// -- Execution ----------------------------------------------------------------

/// Map a task request onto its implementation future.
pub fn execute(
    ctx: Arc<TaskCtx>,
    writer: Arc<GatewayWriter>,
    request: TaskRequest,
) -> BoxFuture<'static, ()> {
    let TaskRequest { kind, message } = request;
    match kind {
        TaskKind::UpdateGatewayStatus => {
            async move { gateway_status::run(&ctx, &message).await }.boxed()
        }
        TaskKind::UpdateCameraState => {
            async move { camera_state::update_state(&ctx, &message).await }.boxed()
        }
        TaskKind::UpdateCameraStreaming => {
            async move { camera_state::update_streaming(&ctx, &message).await }.boxed()
        }
        TaskKind::StorePreview => async move { preview::run(&ctx, &message).await }.boxed(),
        TaskKind::StoreSensorSql => async move { sensor_sql::run(&ctx, &message).await }.boxed(),
        TaskKind::StoreSensorTsdb => async move { sensor_tsdb::run(&ctx, &message).await }.boxed(),
        TaskKind::RecordMediaStream => async move { record::run(&ctx, &message).await }.boxed(),
        TaskKind::SendPush => async move { push::run(&ctx, &message).await }.boxed(),
        TaskKind::SendGatewayMessage => {
            async move { gateway_message::run(&writer, &message).await }.boxed()
        }
    }
}

/// Production [`TaskSpawner`]: feeds the bounded worker pool, binding each
/// request to a session's writer.
pub struct SessionTaskSpawner {
    runner: Arc<TaskRunner>,
    ctx: Arc<TaskCtx>,
    writer: Arc<GatewayWriter>,
}

impl SessionTaskSpawner {
    pub fn new(runner: Arc<TaskRunner>, ctx: Arc<TaskCtx>, writer: Arc<GatewayWriter>) -> Self {
        Self { runner, ctx, writer }
    }
}

impl TaskSpawner for SessionTaskSpawner {
    fn schedule(&self, request: TaskRequest) {
        let name = request.kind.name();
        self.runner.spawn(name, execute(Arc::clone(&self.ctx), Arc::clone(&self.writer), request));
    }
}
