// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;

/// Error kinds for the cloud controller core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// An incoming frame did not parse as a JSON envelope.
    Decode(String),
    /// The broker rejected a publish.
    Publish(String),
    /// Loading business-logic params from the relational store failed.
    ParamsLoad(String),
    /// No policy loaded for the device named in the message.
    UnknownDevice(String),
    /// No live session for the gateway.
    UnknownGateway(String),
    /// A `deviceState` message carried an unexpected state value.
    BadDeviceState(String),
    /// No RPC response arrived within the configured timeout.
    RpcTimeout,
    /// The session closed while an RPC call was pending.
    RpcCancelled,
    /// An external store (relational, time-series, HTTP) operation failed.
    ExternalStore(String),
}

impl CloudError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::Publish(_) => "PUBLISH_ERROR",
            Self::ParamsLoad(_) => "PARAMS_LOAD_ERROR",
            Self::UnknownDevice(_) => "UNKNOWN_DEVICE",
            Self::UnknownGateway(_) => "UNKNOWN_GATEWAY",
            Self::BadDeviceState(_) => "BAD_DEVICE_STATE",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcCancelled => "RPC_CANCELLED",
            Self::ExternalStore(_) => "EXTERNAL_STORE_ERROR",
        }
    }

    /// HTTP status the admin surface maps this error to.
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::UnknownGateway(_) => StatusCode::NOT_FOUND,
            Self::RpcTimeout | Self::RpcCancelled | Self::BadDeviceState(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(detail) => write!(f, "failed decoding envelope: {detail}"),
            Self::Publish(detail) => write!(f, "failed publishing to broker: {detail}"),
            Self::ParamsLoad(detail) => write!(f, "failed loading logic params: {detail}"),
            Self::UnknownDevice(device) => write!(f, "no logic params for device {device}"),
            Self::UnknownGateway(gateway) => write!(f, "no session for gateway {gateway}"),
            Self::BadDeviceState(state) => write!(f, "wrong deviceState: {state}"),
            Self::RpcTimeout => f.write_str("timeout elapsed on RPC request"),
            Self::RpcCancelled => f.write_str("session closed while RPC was pending"),
            Self::ExternalStore(detail) => write!(f, "external store error: {detail}"),
        }
    }
}

impl std::error::Error for CloudError {}
