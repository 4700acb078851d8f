// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reading side of a gateway channel pair: consumes `<gw>.out`.

use futures_util::StreamExt;
use lapin::options::{BasicConsumeOptions, QueueDeleteOptions};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, Consumer};
use tokio_util::sync::CancellationToken;

use crate::broker::{channel_with_queue, Envelope};
use crate::error::CloudError;
use crate::message::IotMessage;

/// One read from the gateway output queue.
#[derive(Debug)]
pub enum ReadOutcome {
    Envelope(Envelope),
    /// The session was cancelled or the consumer stream ended.
    Closed,
}

/// Consumer over a gateway's exclusive `<gw>.out` queue.
pub struct GatewayReader {
    channel: Channel,
    queue: String,
    consumer: Consumer,
    cancel: CancellationToken,
}

impl GatewayReader {
    pub async fn open(
        conn: &Connection,
        gateway_id: &str,
        cancel: CancellationToken,
    ) -> anyhow::Result<Self> {
        let queue = format!("{gateway_id}.out");
        let channel = channel_with_queue(conn, Some(&queue)).await?;
        let consumer = channel
            .basic_consume(
                &queue,
                "",
                BasicConsumeOptions {
                    no_ack: true,
                    exclusive: true,
                    ..BasicConsumeOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { channel, queue, consumer, cancel })
    }

    /// Copy the next raw frame into `buf`; returns the copied length,
    /// or 0 once the session is cancelled.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        tokio::select! {
            _ = self.cancel.cancelled() => 0,
            next = self.consumer.next() => match next {
                Some(Ok(delivery)) => {
                    let n = delivery.data.len().min(buf.len());
                    buf[..n].copy_from_slice(&delivery.data[..n]);
                    n
                }
                _ => 0,
            },
        }
    }

    /// Read and decode one envelope.
    ///
    /// Returns [`ReadOutcome::Closed`] on cancellation or stream end, and
    /// a decode error for frames that are not valid JSON envelopes; the
    /// caller logs those and keeps reading.
    pub async fn read_envelope(&mut self) -> Result<ReadOutcome, CloudError> {
        let delivery = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(ReadOutcome::Closed),
            next = self.consumer.next() => match next {
                None => return Ok(ReadOutcome::Closed),
                Some(Err(e)) => {
                    tracing::warn!(queue = %self.queue, err = %e, "consumer stream error");
                    return Ok(ReadOutcome::Closed);
                }
                Some(Ok(delivery)) => delivery,
            },
        };

        let message: IotMessage = serde_json::from_slice(&delivery.data)
            .map_err(|e| CloudError::Decode(e.to_string()))?;
        let correlation_id =
            delivery.properties.correlation_id().as_ref().map(|s| s.as_str().to_owned());
        let reply_to = delivery.properties.reply_to().as_ref().map(|s| s.as_str().to_owned());

        Ok(ReadOutcome::Envelope(Envelope { message, correlation_id, reply_to }))
    }

    /// Delete the exclusive queue and release the channel.
    pub async fn close(self) -> anyhow::Result<()> {
        let _ = self.channel.queue_delete(&self.queue, QueueDeleteOptions::default()).await;
        self.channel.close(200, "closing gateway output channel").await?;
        Ok(())
    }
}
