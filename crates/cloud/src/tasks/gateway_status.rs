// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mirror a gateway's on/off status into the relational store.

use crate::message::IotMessage;
use crate::tasks::{timed, TaskCtx};

/// Map a wire status to its relational representation.
fn parse_status(status: &str) -> Option<i32> {
    match status {
        "on" => Some(1),
        "off" => Some(0),
        _ => None,
    }
}

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if uuid::Uuid::parse_str(&message.gateway_id).is_err() {
        tracing::error!(gateway_id = %message.gateway_id, "wrong gateway id");
        return;
    }
    let Some(status) = parse_status(&message.status) else {
        tracing::error!(status = %message.status, "wrong gateway status");
        return;
    };

    // Gateway row keeps the wire status string, device rows the numeric state.
    let result = timed(
        ctx.db_timeout,
        sqlx::query("update v3_gateways set status = ? where gateway_id = ?")
            .bind(&message.status)
            .bind(&message.gateway_id)
            .execute(&ctx.db),
    )
    .await;
    match result {
        Ok(_) => tracing::debug!(
            gateway_id = %message.gateway_id,
            status = %message.status,
            "gateway status updated"
        ),
        Err(e) => tracing::error!(
            gateway_id = %message.gateway_id,
            err = %e,
            "error updating gateway status"
        ),
    }

    let result = timed(
        ctx.db_timeout,
        sqlx::query("update v3_devices set state = ? where gateway_id = ?")
            .bind(status)
            .bind(&message.gateway_id)
            .execute(&ctx.db),
    )
    .await;
    if let Err(e) = result {
        tracing::error!(gateway_id = %message.gateway_id, err = %e, "error updating device states");
    }

    // A gateway going dark takes its cameras off air.
    if status == 0 {
        let result = timed(
            ctx.db_timeout,
            sqlx::query("update camers set onair = ? where gateway_id = ?")
                .bind(status)
                .bind(&message.gateway_id)
                .execute(&ctx.db),
        )
        .await;
        if let Err(e) = result {
            tracing::error!(
                gateway_id = %message.gateway_id,
                err = %e,
                "error updating camera off statuses"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_status;

    #[test]
    fn maps_known_statuses() {
        assert_eq!(parse_status("on"), Some(1));
        assert_eq!(parse_status("off"), Some(0));
        assert_eq!(parse_status("rebooting"), None);
        assert_eq!(parse_status(""), None);
    }
}
