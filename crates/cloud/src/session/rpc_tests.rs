// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::RpcCorrelator;
use crate::error::CloudError;
use crate::message::IotMessage;

fn response(device_id: &str) -> IotMessage {
    IotMessage { device_id: device_id.to_owned(), ..IotMessage::default() }
}

#[tokio::test]
async fn delivers_response_to_waiting_caller() -> anyhow::Result<()> {
    let correlator = RpcCorrelator::new(Duration::from_secs(1));
    let cancel = CancellationToken::new();

    let call = correlator.register("rpc-1").await;
    correlator.deliver("rpc-1", response("d1")).await;

    let message = correlator.wait(call, &cancel).await.map_err(anyhow::Error::from)?;
    assert_eq!(message.device_id, "d1");

    correlator.unregister("rpc-1").await;
    assert_eq!(correlator.pending().await, 0);
    Ok(())
}

#[tokio::test]
async fn times_out_without_response() {
    let correlator = RpcCorrelator::new(Duration::from_millis(20));
    let cancel = CancellationToken::new();

    let call = correlator.register("rpc-1").await;
    let result = correlator.wait(call, &cancel).await;
    assert_eq!(result, Err(CloudError::RpcTimeout));

    correlator.unregister("rpc-1").await;
    assert_eq!(correlator.pending().await, 0, "map is empty after the exit path");
}

#[tokio::test]
async fn response_after_timeout_is_ignored() {
    let correlator = RpcCorrelator::new(Duration::from_millis(20));
    let cancel = CancellationToken::new();

    let call = correlator.register("rpc-1").await;
    let result = correlator.wait(call, &cancel).await;
    assert_eq!(result, Err(CloudError::RpcTimeout));
    correlator.unregister("rpc-1").await;

    // The stray reply finds no entry and must not panic.
    correlator.deliver("rpc-1", response("late")).await;
    assert_eq!(correlator.pending().await, 0);
}

#[tokio::test]
async fn double_delivery_is_harmless() {
    let correlator = RpcCorrelator::new(Duration::from_secs(1));
    correlator.register("rpc-1").await;
    correlator.deliver("rpc-1", response("first")).await;
    correlator.deliver("rpc-1", response("second")).await;
    assert_eq!(correlator.pending().await, 0);
}

#[tokio::test]
async fn close_all_wakes_waiters_with_cancellation() {
    let correlator = RpcCorrelator::new(Duration::from_secs(5));
    let cancel = CancellationToken::new();

    let call = correlator.register("rpc-1").await;
    correlator.close_all().await;

    let result = correlator.wait(call, &cancel).await;
    assert_eq!(result, Err(CloudError::RpcCancelled));
    assert_eq!(correlator.pending().await, 0);
}

#[tokio::test]
async fn session_cancellation_aborts_the_wait() {
    let correlator = RpcCorrelator::new(Duration::from_secs(5));
    let cancel = CancellationToken::new();

    let call = correlator.register("rpc-1").await;
    cancel.cancel();

    let result = correlator.wait(call, &cancel).await;
    assert_eq!(result, Err(CloudError::RpcCancelled));
}
