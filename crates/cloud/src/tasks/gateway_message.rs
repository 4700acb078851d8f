// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publish an envelope to the owning gateway's input queue.

use crate::broker::writer::GatewayWriter;
use crate::message::IotMessage;

pub async fn run(writer: &GatewayWriter, message: &IotMessage) {
    if message.gateway_id.is_empty() {
        tracing::error!(task = "send-gateway-message", "no gateway defined");
        return;
    }

    if let Err(e) = writer.write_message(message).await {
        tracing::error!(gateway_id = %message.gateway_id, err = %e, "error sending message to broker");
    }
}
