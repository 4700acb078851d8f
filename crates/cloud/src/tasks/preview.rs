// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store a camera preview blob keyed by stream id.

use crate::message::IotMessage;
use crate::tasks::{timed, TaskCtx};

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "store-preview", "no sender defined");
        return;
    }
    if message.preview.is_empty() {
        tracing::error!(device_id = %message.device_id, "no preview in message");
        return;
    }

    let result = timed(
        ctx.db_timeout,
        sqlx::query("update camers set preview = ? where stream_id = ?")
            .bind(&message.preview)
            .bind(&message.device_id)
            .execute(&ctx.db),
    )
    .await;
    if let Err(e) = result {
        tracing::error!(device_id = %message.device_id, err = %e, "error updating preview");
    }
}
