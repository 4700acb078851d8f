// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud-side live context for one connected gateway.
//!
//! A session owns the gateway's channel pair, its business logic (loaded
//! lazily on the first application message), and the RPC correlator. One
//! reader task pulls envelopes; RPC replies go to the correlator, every
//! other message is dispatched on a detached task.

pub mod rpc;

use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broker::reader::{GatewayReader, ReadOutcome};
use crate::broker::writer::GatewayWriter;
use crate::error::CloudError;
use crate::logic::GatewayLogic;
use crate::message::IotMessage;
use crate::session::rpc::RpcCorrelator;
use crate::tasks::runner::TaskRunner;
use crate::tasks::{timed, SessionTaskSpawner, TaskCtx, TaskKind, TaskRequest, TaskSpawner};

pub struct GatewaySession {
    gateway_id: String,
    server_id: String,
    writer: Arc<GatewayWriter>,
    rpc: RpcCorrelator,
    cancel: CancellationToken,
    ctx: Arc<TaskCtx>,
    runner: Arc<TaskRunner>,
    logic: Mutex<Option<Arc<GatewayLogic>>>,
    reader: Mutex<Option<GatewayReader>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl GatewaySession {
    /// Open the gateway's channel pair under a child cancellation token.
    /// Business logic is not created until the gateway's first message.
    pub async fn open(
        conn: &lapin::Connection,
        server_id: &str,
        gateway_id: &str,
        ctx: Arc<TaskCtx>,
        runner: Arc<TaskRunner>,
        parent: &CancellationToken,
        rpc_timeout: Duration,
    ) -> anyhow::Result<Arc<Self>> {
        let cancel = parent.child_token();
        let reader = GatewayReader::open(conn, gateway_id, cancel.clone()).await?;
        let writer = GatewayWriter::open(conn, gateway_id).await?;

        Ok(Arc::new(Self {
            gateway_id: gateway_id.to_owned(),
            server_id: server_id.to_owned(),
            writer: Arc::new(writer),
            rpc: RpcCorrelator::new(rpc_timeout),
            cancel,
            ctx,
            runner,
            logic: Mutex::new(None),
            reader: Mutex::new(Some(reader)),
            reader_task: Mutex::new(None),
        }))
    }

    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    /// Launch the reader task.
    pub async fn start(self: &Arc<Self>) {
        let Some(reader) = self.reader.lock().await.take() else {
            tracing::warn!(gateway_id = %self.gateway_id, "session already started");
            return;
        };
        let session = Arc::clone(self);
        let handle = tokio::spawn(read_loop(session, reader));
        *self.reader_task.lock().await = Some(handle);
        tracing::info!(
            gateway_id = %self.gateway_id,
            server_id = %self.server_id,
            "gateway session started"
        );
    }

    fn task_spawner(&self) -> SessionTaskSpawner {
        SessionTaskSpawner::new(
            Arc::clone(&self.runner),
            Arc::clone(&self.ctx),
            Arc::clone(&self.writer),
        )
    }

    /// Queue a message toward the gateway's input queue.
    pub fn send_message(&self, message: IotMessage) {
        self.task_spawner()
            .schedule(TaskRequest { kind: TaskKind::SendGatewayMessage, message });
    }

    /// Run a message through the dispatcher on a detached task.
    pub fn dispatch(self: &Arc<Self>, message: IotMessage) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.apply_logic(message).await;
        });
    }

    /// Toggle the user's push flag; false when no logic is loaded yet.
    pub async fn set_push(&self, state: bool) -> bool {
        match self.logic.lock().await.as_ref() {
            Some(logic) => {
                logic.set_push(state).await;
                true
            }
            None => false,
        }
    }

    /// Synchronous call toward the gateway: publish with a fresh
    /// correlation id and block until the reply, timeout, or close.
    pub async fn do_rpc(&self, request: &IotMessage) -> Result<IotMessage, CloudError> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let call = self.rpc.register(&correlation_id).await;

        let reply_to = format!("{}.out", self.gateway_id);
        if let Err(e) = self.writer.write_envelope(request, Some(&correlation_id), Some(&reply_to)).await
        {
            self.rpc.unregister(&correlation_id).await;
            return Err(e);
        }

        let result = self.rpc.wait(call, &self.cancel).await;
        self.rpc.unregister(&correlation_id).await;
        result
    }

    /// First-message gate plus dispatch. The gateway must exist in the
    /// relational store before logic is loaded; a failed load leaves the
    /// session unloaded so the next message retries.
    async fn apply_logic(&self, message: IotMessage) {
        let logic = {
            let mut slot = self.logic.lock().await;
            if slot.is_none() {
                match self.gateway_registered().await {
                    Err(e) => {
                        tracing::error!(
                            gateway_id = %self.gateway_id,
                            err = %e,
                            "error checking gateway in database"
                        );
                        return;
                    }
                    Ok(false) => {
                        tracing::warn!(
                            gateway_id = %self.gateway_id,
                            "gateway is not registered in cloud database"
                        );
                        return;
                    }
                    Ok(true) => {}
                }

                let spawner: Arc<dyn TaskSpawner> = Arc::new(self.task_spawner());
                match GatewayLogic::load(
                    &self.ctx.db,
                    self.ctx.db_timeout,
                    &self.gateway_id,
                    spawner,
                )
                .await
                {
                    Ok(logic) => *slot = Some(Arc::new(logic)),
                    Err(e) => {
                        tracing::error!(
                            gateway_id = %self.gateway_id,
                            err = %e,
                            "cannot load business logic params"
                        );
                        return;
                    }
                }
            }
            slot.clone()
        };

        if let Some(logic) = logic {
            if let Err(e) = logic.process(message).await {
                tracing::warn!(gateway_id = %self.gateway_id, err = %e, "error processing message");
            }
        }
    }

    async fn gateway_registered(&self) -> Result<bool, CloudError> {
        let row = timed(
            self.ctx.db_timeout,
            sqlx::query("select count(*) from v3_gateways where gateway_id = ?")
                .bind(&self.gateway_id)
                .fetch_one(&self.ctx.db),
        )
        .await?;
        let count: i64 = row.try_get(0).map_err(|e| CloudError::ExternalStore(e.to_string()))?;
        Ok(count > 0)
    }

    /// Cancel the session, drain pending RPC calls, and write the
    /// gateway's off status. No new task is scheduled after this returns.
    pub async fn stop(&self) {
        self.cancel.cancel();
        self.rpc.close_all().await;
        self.task_spawner().schedule(TaskRequest {
            kind: TaskKind::UpdateGatewayStatus,
            message: IotMessage::status(&self.gateway_id, "off"),
        });
    }

    /// Stop plus await channel release.
    pub async fn close(&self) {
        self.stop().await;
        if let Some(handle) = self.reader_task.lock().await.take() {
            let _ = handle.await;
        }
        if let Err(e) = self.writer.close().await {
            tracing::debug!(gateway_id = %self.gateway_id, err = %e, "error closing gateway input channel");
        }
        tracing::info!(gateway_id = %self.gateway_id, "gateway session closed");
    }
}

async fn read_loop(session: Arc<GatewaySession>, mut reader: GatewayReader) {
    loop {
        match reader.read_envelope().await {
            Ok(ReadOutcome::Closed) => break,
            Err(e) => {
                // Undecodable frames are dropped, the session keeps reading.
                tracing::warn!(gateway_id = %session.gateway_id, err = %e, "error reading channel");
                continue;
            }
            Ok(ReadOutcome::Envelope(envelope)) => {
                if let Some(correlation_id) = envelope.correlation_id {
                    session.rpc.deliver(&correlation_id, envelope.message).await;
                    continue;
                }
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    session.apply_logic(envelope.message).await;
                });
            }
        }
    }

    if let Err(e) = reader.close().await {
        tracing::debug!(gateway_id = %session.gateway_id, err = %e, "error closing gateway output channel");
    }
}
