// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::IotMessage;

#[test]
fn decodes_sensor_data_envelope() -> anyhow::Result<()> {
    let raw = r#"{
        "timestampMs": 1700000000000,
        "gatewayId": "g1",
        "deviceId": "d1",
        "deviceType": "sensor",
        "messageType": "sensorData",
        "label": "temp",
        "sensorData": "23.4",
        "someFutureField": true
    }"#;

    let message: IotMessage = serde_json::from_str(raw)?;
    assert_eq!(message.timestamp, 1_700_000_000_000);
    assert_eq!(message.gateway_id, "g1");
    assert_eq!(message.device_id, "d1");
    assert_eq!(message.message_type, "sensorData");
    assert_eq!(message.sensor_data, "23.4");
    assert!(message.device_state.is_empty());
    assert_eq!(message.device_table_id, 0);
    Ok(())
}

#[test]
fn device_state_and_table_id_have_distinct_wire_names() -> anyhow::Result<()> {
    let mut message = IotMessage::default();
    message.device_state = "streamingOn".to_owned();
    message.device_table_id = 42;

    let raw = serde_json::to_string(&message)?;
    assert!(raw.contains(r#""deviceState":"streamingOn""#));
    assert!(raw.contains(r#""deviceTableId":42"#));

    let decoded: IotMessage = serde_json::from_str(&raw)?;
    assert_eq!(decoded.device_state, "streamingOn");
    assert_eq!(decoded.device_table_id, 42);
    Ok(())
}

#[test]
fn empty_fields_are_omitted_on_encode() -> anyhow::Result<()> {
    let message = IotMessage {
        gateway_id: "g1".to_owned(),
        message_type: "status".to_owned(),
        status: "on".to_owned(),
        ..IotMessage::default()
    };

    let raw = serde_json::to_string(&message)?;
    assert!(!raw.contains("deviceId"));
    assert!(!raw.contains("preview"));
    assert!(!raw.contains("vip"));
    assert!(!raw.contains("money"));
    assert!(!raw.contains("cameras"));
    Ok(())
}

#[test]
fn status_builder_fills_cloud_fields() {
    let message = IotMessage::status("g1", "off");
    assert_eq!(message.gateway_id, "g1");
    assert_eq!(message.protocol, "amqp");
    assert_eq!(message.message_type, "status");
    assert_eq!(message.status, "off");
    assert_eq!(message.vendor, super::VENDOR_NAME);
    assert!(message.timestamp > 0);
}

#[test]
fn label_key_replaces_spaces() {
    let message = IotMessage { label: "door opening sensor".to_owned(), ..IotMessage::default() };
    assert_eq!(message.label_key(), "door_opening_sensor");
}

#[test]
fn sensor_class_falls_back_to_label() {
    let mut message = IotMessage { label: "motion detector".to_owned(), ..IotMessage::default() };
    assert_eq!(message.sensor_class(), "motion_detector");
    message.sensor_type = "binary switch".to_owned();
    assert_eq!(message.sensor_class(), "binary_switch");
}

#[test]
fn push_builder_carries_routing_keys() {
    let message = IotMessage::push("camera", "Front door", "motion", 7, 3);
    assert_eq!(message.device_type, "camera");
    assert_eq!(message.device_table_id, 7);
    assert_eq!(message.user_id, 3);
    assert_eq!(message.title, "Front door");
}
