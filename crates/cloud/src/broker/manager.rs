// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: watches broker queue lifecycle events and brings
//! gateway sessions in and out of existence.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use futures_util::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, Consumer, ExchangeKind};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::broker::{connect, header_string, EVENTS_EXCHANGE, GATEWAYS_EXCHANGE};
use crate::config::CloudConfig;
use crate::error::CloudError;
use crate::message::IotMessage;
use crate::session::GatewaySession;
use crate::tasks::runner::TaskRunner;
use crate::tasks::TaskCtx;

/// Extract the gateway id from a `<gw>.in` queue name; other queues are
/// not session-relevant.
fn gateway_input_queue(queue_name: &str) -> Option<&str> {
    let mut parts = queue_name.split('.');
    let gateway_id = parts.next()?;
    if gateway_id.is_empty() {
        return None;
    }
    (parts.next() == Some("in")).then_some(gateway_id)
}

/// Gateways to nudge at startup, from the broker's full queue listing.
fn restart_targets(names: &[String]) -> Vec<String> {
    names.iter().filter_map(|name| gateway_input_queue(name)).map(str::to_owned).collect()
}

#[derive(Debug, Deserialize)]
struct QueueInfo {
    name: String,
}

pub struct Manager {
    config: CloudConfig,
    ctx: Arc<TaskCtx>,
    runner: Arc<TaskRunner>,
    shutdown: CancellationToken,
    conn: RwLock<Option<Connection>>,
    control: Mutex<Option<Channel>>,
    events: Mutex<Option<Consumer>>,
    event_queue: Mutex<Option<String>>,
    sessions: RwLock<HashMap<String, Arc<GatewaySession>>>,
}

impl Manager {
    pub fn new(
        config: CloudConfig,
        ctx: Arc<TaskCtx>,
        runner: Arc<TaskRunner>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            ctx,
            runner,
            shutdown,
            conn: RwLock::new(None),
            control: Mutex::new(None),
            events: Mutex::new(None),
            event_queue: Mutex::new(None),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Dial the broker and open the control channel.
    pub async fn open(&self) -> anyhow::Result<()> {
        let conn = connect(&self.config.amqp_url()).await?;
        let channel = conn.create_channel().await.context("failed to open control channel")?;
        channel
            .exchange_declare(
                GATEWAYS_EXCHANGE,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..ExchangeDeclareOptions::default() },
                FieldTable::default(),
            )
            .await
            .context("failed to declare the gateways exchange")?;

        *self.control.lock().await = Some(channel);
        *self.conn.write().await = Some(conn);
        tracing::info!(url = %self.config.amqp_host, "broker connection established");
        Ok(())
    }

    /// Declare the event queue (named by server id), bind it to the
    /// broker's internal events exchange, and start consuming.
    pub async fn event_exchange_init(&self) -> anyhow::Result<()> {
        let control = self.control.lock().await;
        let channel = control.as_ref().context("no connection to broker")?;
        let queue = self.config.server_id.clone();

        channel
            .queue_declare(
                &queue,
                QueueDeclareOptions { exclusive: true, ..QueueDeclareOptions::default() },
                FieldTable::default(),
            )
            .await
            .context("failed to declare the event queue")?;

        tracing::debug!(
            queue = %queue,
            exchange = EVENTS_EXCHANGE,
            routing_key = "queue.*",
            "binding queue to exchange"
        );
        channel
            .queue_bind(
                &queue,
                EVENTS_EXCHANGE,
                "queue.*",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("failed to bind the event queue")?;

        let consumer = channel
            .basic_consume(
                &queue,
                "",
                BasicConsumeOptions { no_ack: true, ..BasicConsumeOptions::default() },
                FieldTable::default(),
            )
            .await
            .context("failed to register the event consumer")?;

        *self.events.lock().await = Some(consumer);
        *self.event_queue.lock().await = Some(queue);
        tracing::info!("event exchange manager started");
        Ok(())
    }

    /// Consume queue lifecycle events until shutdown. Individual event
    /// errors are logged and skipped.
    pub async fn process_exchange_events(&self) {
        let Some(mut consumer) = self.events.lock().await.take() else {
            tracing::error!("event consumer not initialized");
            return;
        };

        loop {
            let delivery = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                next = consumer.next() => match next {
                    None => {
                        tracing::warn!("event stream ended");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(err = %e, "error reading exchange event");
                        continue;
                    }
                    Some(Ok(delivery)) => delivery,
                },
            };

            let event_type = delivery.routing_key.as_str().to_owned();
            let Some(queue_name) = header_string(delivery.properties.headers().as_ref(), "name")
            else {
                tracing::error!("error reading queue name from event exchange");
                continue;
            };
            tracing::debug!(event = %event_type, queue = %queue_name, "broker event");
            self.handle_queue_event(&event_type, &queue_name).await;
        }
    }

    pub(crate) async fn handle_queue_event(&self, event_type: &str, queue_name: &str) {
        let Some(gateway_id) = gateway_input_queue(queue_name) else {
            return;
        };

        match event_type {
            "queue.created" => {
                if self.sessions.read().await.contains_key(gateway_id) {
                    tracing::warn!(gateway_id, "session already exists for gateway");
                    return;
                }
                let conn = self.conn.read().await;
                let Some(conn) = conn.as_ref() else {
                    tracing::error!(gateway_id, "no broker connection for new session");
                    return;
                };
                match GatewaySession::open(
                    conn,
                    &self.config.server_id,
                    gateway_id,
                    Arc::clone(&self.ctx),
                    Arc::clone(&self.runner),
                    &self.shutdown,
                    self.config.rpc_timeout(),
                )
                .await
                {
                    Ok(session) => {
                        session.start().await;
                        self.sessions.write().await.insert(gateway_id.to_owned(), session);
                        tracing::info!(gateway_id, "gateway session created");
                    }
                    Err(e) => {
                        tracing::error!(gateway_id, err = %e, "failed creating gateway session");
                    }
                }
            }
            "queue.deleted" => {
                let removed = self.sessions.write().await.remove(gateway_id);
                match removed {
                    Some(session) => {
                        session.close().await;
                        tracing::info!(gateway_id, "gateway session removed");
                    }
                    None => {
                        tracing::error!(gateway_id, "no stored session for gateway");
                    }
                }
            }
            _ => {}
        }
    }

    /// Ask every connected gateway to restart via the management API's
    /// queue listing. Renews device states for gateways that reconnected
    /// while the cloud was down.
    pub async fn restart_gateways(&self) {
        let url = format!("{}/api/queues", self.config.amqp_mgmt_url());
        let response = match self
            .ctx
            .http
            .get(&url)
            .basic_auth(&self.config.amqp_user, Some(&self.config.amqp_password))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(err = %e, "failed listing queues from management api");
                return;
            }
        };
        let queues: Vec<QueueInfo> = match response.error_for_status() {
            Ok(response) => match response.json().await {
                Ok(queues) => queues,
                Err(e) => {
                    tracing::error!(err = %e, "failed decoding management api queue listing");
                    return;
                }
            },
            Err(e) => {
                tracing::error!(err = %e, "management api rejected queue listing");
                return;
            }
        };

        let names: Vec<String> = queues.into_iter().map(|q| q.name).collect();
        for gateway_id in restart_targets(&names) {
            let message = IotMessage::command(&gateway_id, "", "restart", "");
            match self.publish_to_gateway(&gateway_id, &message).await {
                Ok(()) => tracing::info!(gateway_id = %gateway_id, "restart command sent"),
                Err(e) => {
                    tracing::error!(gateway_id = %gateway_id, err = %e, "failed sending restart command");
                }
            }
        }
    }

    async fn publish_to_gateway(
        &self,
        gateway_id: &str,
        message: &IotMessage,
    ) -> Result<(), CloudError> {
        let payload =
            serde_json::to_vec(message).map_err(|e| CloudError::Publish(e.to_string()))?;
        let control = self.control.lock().await;
        let channel = control
            .as_ref()
            .ok_or_else(|| CloudError::Publish("no control channel".to_owned()))?;
        channel
            .basic_publish(
                GATEWAYS_EXCHANGE,
                &format!("gateway.{gateway_id}.in"),
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type(ShortString::from("application/json")),
            )
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))?
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))?;
        Ok(())
    }

    pub async fn session(&self, gateway_id: &str) -> Option<Arc<GatewaySession>> {
        self.sessions.read().await.get(gateway_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Synchronous call toward a gateway through its session.
    pub async fn do_gateway_rpc(
        &self,
        gateway_id: &str,
        request: &IotMessage,
    ) -> Result<IotMessage, CloudError> {
        let session = self
            .session(gateway_id)
            .await
            .ok_or_else(|| CloudError::UnknownGateway(gateway_id.to_owned()))?;
        session.do_rpc(request).await
    }

    /// Close every session, delete the event queue, and release the
    /// control channel and connection.
    pub async fn close(&self) {
        self.shutdown.cancel();

        let sessions: Vec<Arc<GatewaySession>> =
            self.sessions.write().await.drain().map(|(_, session)| session).collect();
        for session in sessions {
            session.close().await;
        }

        if let Some(channel) = self.control.lock().await.take() {
            if let Some(queue) = self.event_queue.lock().await.take() {
                if let Err(e) = channel.queue_delete(&queue, QueueDeleteOptions::default()).await {
                    tracing::error!(queue = %queue, err = %e, "failed deleting event queue");
                }
            }
            let _ = channel.close(200, "closing control channel").await;
        }
        if let Some(conn) = self.conn.write().await.take() {
            let _ = conn.close(200, "shutting down").await;
        }
        tracing::info!("broker manager closed");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
