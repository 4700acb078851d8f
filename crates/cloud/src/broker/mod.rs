// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AMQP plumbing: per-gateway channel pairs and the session manager.
//!
//! Gateways exchange envelopes through the durable topic exchange
//! [`GATEWAYS_EXCHANGE`]. Each gateway owns a `<gw>.in` queue (consumed by
//! the gateway) and a `<gw>.out` queue (consumed by the cloud); routing
//! keys are `gateway.<gw>.in` / `gateway.<gw>.out`. Queue lifecycle events
//! arrive from the broker's internal [`EVENTS_EXCHANGE`].

pub mod manager;
pub mod reader;
pub mod writer;

use anyhow::Context;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, Connection, ConnectionProperties, ExchangeKind};

use crate::message::IotMessage;

/// Durable topic exchange carrying all gateway traffic.
pub const GATEWAYS_EXCHANGE: &str = "veedo.gateways";

/// Broker-internal exchange publishing queue lifecycle events.
pub const EVENTS_EXCHANGE: &str = "amq.rabbitmq.event";

/// One decoded message plus its RPC correlation metadata.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub message: IotMessage,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

/// Dial the broker.
pub async fn connect(url: &str) -> anyhow::Result<Connection> {
    Connection::connect(url, ConnectionProperties::default())
        .await
        .context("failed connecting to broker")
}

/// Open a channel, declare the gateways exchange idempotently, and when a
/// queue name is given declare it (exclusive, non-durable) and bind it with
/// routing key `gateway.<queue>`.
pub(crate) async fn channel_with_queue(
    conn: &Connection,
    queue_name: Option<&str>,
) -> anyhow::Result<Channel> {
    let channel = conn.create_channel().await.context("failed to open a channel")?;

    channel
        .exchange_declare(
            GATEWAYS_EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions { durable: true, ..ExchangeDeclareOptions::default() },
            FieldTable::default(),
        )
        .await
        .context("failed to declare the gateways exchange")?;

    if let Some(name) = queue_name {
        channel
            .queue_declare(
                name,
                QueueDeclareOptions { exclusive: true, ..QueueDeclareOptions::default() },
                FieldTable::default(),
            )
            .await
            .context("failed to declare a queue")?;

        let routing_key = format!("gateway.{name}");
        tracing::debug!(
            queue = name,
            exchange = GATEWAYS_EXCHANGE,
            routing_key = %routing_key,
            "binding queue to exchange"
        );
        channel
            .queue_bind(
                name,
                GATEWAYS_EXCHANGE,
                &routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .context("failed to bind a queue")?;
    }

    Ok(channel)
}

/// Read a string-valued header from an AMQP field table.
pub(crate) fn header_string(headers: Option<&FieldTable>, key: &str) -> Option<String> {
    let table = headers?;
    match table.inner().get(key)? {
        AMQPValue::LongString(value) => Some(String::from_utf8_lossy(value.as_bytes()).into_owned()),
        AMQPValue::ShortString(value) => Some(value.as_str().to_owned()),
        _ => None,
    }
}
