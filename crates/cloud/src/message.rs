// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The IoT message envelope exchanged with gateways over the broker.
//!
//! A single flat JSON object carries every message kind in both directions;
//! presence of a field is dictated by `messageType`. Unknown fields are
//! ignored on decode, empty fields are omitted on encode.

use serde::{Deserialize, Serialize};

pub const VENDOR_NAME: &str = "Veedo";
pub const SERVICE_NAME: &str = "iot-cloud-server";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Camera inventory entry reported by a gateway in `configurationData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraInventory {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
}

/// Z-Wave inventory entry reported by a gateway in `configurationData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZwaveInventory {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
}

/// IoT gateway message representation.
///
/// `deviceState` (state string) and `deviceTableId` (relational key) are
/// distinct wire fields; see DESIGN.md for the naming convention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IotMessage {
    #[serde(rename = "timestampMs", skip_serializing_if = "is_zero")]
    pub timestamp: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gateway_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub client_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_state: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub device_table_id: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sensor_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sensor_data: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub preview: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub units: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mediaserver_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub application_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recording: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub attribute: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub tariff_id: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub money: u64,
    #[serde(skip_serializing_if = "is_false")]
    pub vip: bool,
    #[serde(rename = "isLegalEntity", skip_serializing_if = "is_false")]
    pub legal_entity: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub user_id: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cameras: Vec<CameraInventory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zwave_devices: Vec<ZwaveInventory>,
}

impl IotMessage {
    /// Base envelope for a cloud-originated message.
    pub fn cloud(gateway_id: &str, device_id: &str) -> Self {
        Self {
            timestamp: epoch_ms(),
            vendor: VENDOR_NAME.to_owned(),
            version: VERSION.to_owned(),
            client_type: "cloud".to_owned(),
            gateway_id: gateway_id.to_owned(),
            device_id: device_id.to_owned(),
            ..Self::default()
        }
    }

    /// Gateway on/off status message.
    pub fn status(gateway_id: &str, status: &str) -> Self {
        let mut message = Self::cloud(gateway_id, "");
        message.protocol = "amqp".to_owned();
        message.message_type = "status".to_owned();
        message.status = status.to_owned();
        message
    }

    /// Command message directed at a gateway.
    pub fn command(gateway_id: &str, device_id: &str, command: &str, attribute: &str) -> Self {
        let mut message = Self::cloud(gateway_id, device_id);
        message.message_type = "command".to_owned();
        message.command = command.to_owned();
        message.attribute = attribute.to_owned();
        message
    }

    /// Message for the mobile-push fan-out task.
    pub fn push(
        device_type: &str,
        title: &str,
        content: &str,
        device_table_id: u64,
        user_id: u64,
    ) -> Self {
        Self {
            device_type: device_type.to_owned(),
            device_table_id,
            user_id,
            title: title.to_owned(),
            content: content.to_owned(),
            ..Self::default()
        }
    }

    /// Sensor label normalized for map keys and store columns
    /// (spaces replaced with underscores).
    pub fn label_key(&self) -> String {
        self.label.replace(' ', "_")
    }

    /// Sensor class tag for time-series points; falls back to the label
    /// when the gateway did not send a sensor type.
    pub fn sensor_class(&self) -> String {
        if self.sensor_type.is_empty() {
            self.label_key()
        } else {
            self.sensor_type.replace(' ', "_")
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
