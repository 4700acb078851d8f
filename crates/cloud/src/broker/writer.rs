// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writing side of a gateway channel pair: publishes to `gateway.<gw>.in`.

use lapin::options::BasicPublishOptions;
use lapin::types::ShortString;
use lapin::{BasicProperties, Channel, Connection};
use tokio::sync::Mutex;

use crate::broker::{channel_with_queue, GATEWAYS_EXCHANGE};
use crate::error::CloudError;
use crate::message::IotMessage;

/// Producer toward a gateway's input queue.
///
/// Publishes are serialized through an internal lock; the writer is shared
/// by the dispatcher's tasks and the RPC path.
pub struct GatewayWriter {
    channel: Channel,
    routing_key: String,
    publish_lock: Mutex<()>,
}

impl GatewayWriter {
    pub async fn open(conn: &Connection, gateway_id: &str) -> anyhow::Result<Self> {
        let channel = channel_with_queue(conn, None).await?;
        Ok(Self {
            channel,
            routing_key: format!("gateway.{gateway_id}.in"),
            publish_lock: Mutex::new(()),
        })
    }

    /// Publish a raw payload to the gateway input queue.
    pub async fn write_bytes(&self, payload: &[u8]) -> Result<(), CloudError> {
        self.publish(payload, BasicProperties::default().with_content_type(json_content_type()))
            .await
    }

    /// Marshal and publish one envelope, attaching RPC metadata when given.
    pub async fn write_envelope(
        &self,
        message: &IotMessage,
        correlation_id: Option<&str>,
        reply_to: Option<&str>,
    ) -> Result<(), CloudError> {
        let payload =
            serde_json::to_vec(message).map_err(|e| CloudError::Publish(e.to_string()))?;

        let mut properties = BasicProperties::default().with_content_type(json_content_type());
        if let Some(id) = correlation_id {
            properties = properties.with_correlation_id(ShortString::from(id));
        }
        if let Some(queue) = reply_to {
            properties = properties.with_reply_to(ShortString::from(queue));
        }

        self.publish(&payload, properties).await
    }

    /// Marshal and publish one plain (non-RPC) envelope.
    pub async fn write_message(&self, message: &IotMessage) -> Result<(), CloudError> {
        self.write_envelope(message, None, None).await
    }

    async fn publish(&self, payload: &[u8], properties: BasicProperties) -> Result<(), CloudError> {
        let _serialized = self.publish_lock.lock().await;
        self.channel
            .basic_publish(
                GATEWAYS_EXCHANGE,
                &self.routing_key,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))?
            .await
            .map_err(|e| CloudError::Publish(e.to_string()))?;
        Ok(())
    }

    /// Release the channel.
    pub async fn close(&self) -> anyhow::Result<()> {
        self.channel.close(200, "closing gateway input channel").await?;
        Ok(())
    }
}

fn json_content_type() -> ShortString {
    ShortString::from("application/json")
}
