// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store sensor readings in the time-series store.
//!
//! One database per gateway and device class, one measurement per device;
//! readings that parse as floats land in `value_float`, everything else is
//! stored verbatim in `value`. Written over the HTTP line protocol with
//! millisecond precision.

use crate::message::{epoch_ms, IotMessage};
use crate::tasks::TaskCtx;

fn escape_tag(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

fn escape_field_string(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Database name for a gateway and device class.
fn database_name(message: &IotMessage) -> String {
    format!("gateway_{}_{}s", message.gateway_id.replace('-', "_"), message.device_type)
}

/// Render one line-protocol point for the reading.
fn point_line(message: &IotMessage, timestamp_ms: u64) -> String {
    let measurement = format!("device_{}", message.device_id.replace('-', "_"));

    let mut tags = format!(
        "class={},label={}",
        escape_tag(&message.sensor_class()),
        escape_tag(&message.label_key())
    );
    if !message.units.is_empty() {
        tags.push_str(",units=");
        tags.push_str(&escape_tag(&message.units));
    }

    let field = match message.sensor_data.parse::<f64>() {
        Ok(value) => format!("value_float={value}"),
        Err(_) => format!("value=\"{}\"", escape_field_string(&message.sensor_data)),
    };

    format!("{measurement},{tags} {field} {timestamp_ms}")
}

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "store-sensor-timeseries", "no sender defined");
        return;
    }
    if message.device_type != "sensor" && message.device_type != "camera" {
        tracing::error!(device_type = %message.device_type, "wrong device type for timeseries");
        return;
    }

    let database = database_name(message);
    let timestamp = if message.timestamp > 0 { message.timestamp } else { epoch_ms() };
    let line = point_line(message, timestamp);
    tracing::debug!(database = %database, line = %line, "writing timeseries point");

    let url = format!("{}/write", ctx.tsdb.url);
    let result = ctx
        .http
        .post(&url)
        .query(&[("db", database.as_str()), ("precision", "ms")])
        .basic_auth(&ctx.tsdb.username, Some(&ctx.tsdb.password))
        .body(line)
        .send()
        .await;
    match result {
        Ok(response) => {
            if let Err(e) = response.error_for_status() {
                tracing::error!(database = %database, err = %e, "timeseries store rejected write");
            }
        }
        Err(e) => {
            tracing::error!(database = %database, err = %e, "error writing timeseries point");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{database_name, point_line};
    use crate::message::IotMessage;

    fn camera_reading() -> IotMessage {
        IotMessage {
            gateway_id: "11e8-dead-beef".to_owned(),
            device_id: "cam-1".to_owned(),
            device_type: "camera".to_owned(),
            label: "motionDetector".to_owned(),
            sensor_data: "on".to_owned(),
            ..IotMessage::default()
        }
    }

    #[test]
    fn database_name_per_gateway_and_class() {
        assert_eq!(database_name(&camera_reading()), "gateway_11e8_dead_beef_cameras");
    }

    #[test]
    fn non_numeric_reading_becomes_string_field() {
        let line = point_line(&camera_reading(), 1000);
        assert_eq!(line, "device_cam_1,class=motionDetector,label=motionDetector value=\"on\" 1000");
    }

    #[test]
    fn numeric_reading_becomes_float_field() {
        let mut message = camera_reading();
        message.device_type = "sensor".to_owned();
        message.label = "temp".to_owned();
        message.sensor_data = "23.4".to_owned();
        message.units = "C".to_owned();
        let line = point_line(&message, 42);
        assert_eq!(line, "device_cam_1,class=temp,label=temp,units=C value_float=23.4 42");
    }

    #[test]
    fn tag_values_are_escaped() {
        let mut message = camera_reading();
        message.label = "door sensor".to_owned();
        let line = point_line(&message, 1);
        assert!(line.contains("label=door_sensor"), "label keys are underscore-normalized");
        message.units = "m s".to_owned();
        let line = point_line(&message, 1);
        assert!(line.contains("units=m\\ s"));
    }
}
