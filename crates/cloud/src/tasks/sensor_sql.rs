// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store the latest sensor value in the relational store.

use crate::message::IotMessage;
use crate::tasks::{timed, TaskCtx};

/// Long numeric readings are rounded to two decimals before storage; the
/// sensor value column is narrow.
fn normalize_value(raw: &str) -> String {
    if raw.len() > 10 {
        if let Ok(value) = raw.parse::<f64>() {
            return format!("{value:.2}");
        }
    }
    raw.to_owned()
}

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "store-sensor-relational", "no sender defined");
        return;
    }
    if message.device_type != "sensor" {
        tracing::error!(device_type = %message.device_type, "wrong device type for sensor store");
        return;
    }

    let result = timed(
        ctx.db_timeout,
        sqlx::query(
            "update v3_sensors set value = ?, updated_at = now() \
             where device_id = ? and sensor = ?",
        )
        .bind(normalize_value(&message.sensor_data))
        .bind(message.device_table_id)
        .bind(message.label_key())
        .execute(&ctx.db),
    )
    .await;
    if let Err(e) = result {
        tracing::error!(device_id = %message.device_id, err = %e, "error updating sensors");
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_value;

    #[test]
    fn short_values_pass_through() {
        assert_eq!(normalize_value("23.4"), "23.4");
        assert_eq!(normalize_value("on"), "on");
    }

    #[test]
    fn long_numeric_values_are_rounded() {
        assert_eq!(normalize_value("23.39999999999"), "23.40");
        assert_eq!(normalize_value("-117.4459999999"), "-117.45");
    }

    #[test]
    fn long_non_numeric_values_pass_through() {
        assert_eq!(normalize_value("door is wide open"), "door is wide open");
    }
}
