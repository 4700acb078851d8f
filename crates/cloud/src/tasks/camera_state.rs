// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror camera streaming state into the relational store.

use crate::message::IotMessage;
use crate::tasks::{timed, TaskCtx};

fn onair(device_state: &str) -> i32 {
    if device_state == "on" || device_state == "streamingOn" {
        1
    } else {
        0
    }
}

// The cloudStreaming path only ever reports streaming transitions; a bare
// "on" does not put the camera on air there.
fn streaming_onair(device_state: &str) -> i32 {
    i32::from(device_state == "streamingOn")
}

/// `deviceState` handler: streaming transitions also record the media
/// server coordinates, plain state changes touch on-air only.
pub async fn update_state(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "update-camera-state", "no sender defined");
        return;
    }

    let result = if message.device_state.contains("streaming") {
        timed(
            ctx.db_timeout,
            sqlx::query(
                "update camers set onair = ?, ip = ?, server_ip = ?, application = ? \
                 where stream_id = ?",
            )
            .bind(onair(&message.device_state))
            .bind(&message.mediaserver_ip)
            .bind(&message.mediaserver_ip)
            .bind(&message.application_name)
            .bind(&message.device_id)
            .execute(&ctx.db),
        )
        .await
    } else {
        timed(
            ctx.db_timeout,
            sqlx::query("update camers set onair = ? where stream_id = ?")
                .bind(onair(&message.device_state))
                .bind(&message.device_id)
                .execute(&ctx.db),
        )
        .await
    };
    if let Err(e) = result {
        tracing::error!(device_id = %message.device_id, err = %e, "error updating camera state");
    }
}

/// `cloudStreaming` handler: on-air flag only.
pub async fn update_streaming(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "update-camera-streaming", "no sender defined");
        return;
    }

    let result = timed(
        ctx.db_timeout,
        sqlx::query("update camers set onair = ? where stream_id = ?")
            .bind(streaming_onair(&message.device_state))
            .bind(&message.device_id)
            .execute(&ctx.db),
    )
    .await;
    if let Err(e) = result {
        tracing::error!(
            device_id = %message.device_id,
            err = %e,
            "error updating camera streaming state"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{onair, streaming_onair};

    #[test]
    fn device_state_onair_accepts_on_and_streaming_on() {
        assert_eq!(onair("streamingOn"), 1);
        assert_eq!(onair("on"), 1);
        assert_eq!(onair("streamingOff"), 0);
        assert_eq!(onair("off"), 0);
        assert_eq!(onair(""), 0);
    }

    #[test]
    fn cloud_streaming_onair_rejects_bare_on() {
        assert_eq!(streaming_onair("streamingOn"), 1);
        assert_eq!(streaming_onair("on"), 0);
        assert_eq!(streaming_onair("streamingOff"), 0);
        assert_eq!(streaming_onair(""), 0);
    }
}
