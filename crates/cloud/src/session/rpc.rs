// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation over the fire-and-forget gateway link.
//!
//! Each pending call is a single-shot rendezvous keyed by correlation id.
//! An entry exists only while its caller is blocked; delivery of an
//! unknown id (e.g. a reply arriving after the timeout) is ignored.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::CloudError;
use crate::message::IotMessage;

pub struct PendingCall {
    receiver: oneshot::Receiver<IotMessage>,
}

pub struct RpcCorrelator {
    calls: Mutex<HashMap<String, oneshot::Sender<IotMessage>>>,
    timeout: Duration,
}

impl RpcCorrelator {
    pub fn new(timeout: Duration) -> Self {
        Self { calls: Mutex::new(HashMap::new()), timeout }
    }

    /// Register a rendezvous under a fresh correlation id.
    pub async fn register(&self, correlation_id: &str) -> PendingCall {
        let (sender, receiver) = oneshot::channel();
        self.calls.lock().await.insert(correlation_id.to_owned(), sender);
        PendingCall { receiver }
    }

    /// Drop a pending entry; called on every exit path of an RPC.
    pub async fn unregister(&self, correlation_id: &str) {
        self.calls.lock().await.remove(correlation_id);
    }

    /// Deliver a response to the waiting caller, if any.
    pub async fn deliver(&self, correlation_id: &str, message: IotMessage) {
        let sender = self.calls.lock().await.remove(correlation_id);
        match sender {
            Some(sender) => {
                // The caller may have just timed out; a dead receiver is fine.
                let _ = sender.send(message);
            }
            None => {
                tracing::debug!(correlation_id, "response for unknown correlation id, ignoring");
            }
        }
    }

    /// Wake every pending caller with cancellation.
    pub async fn close_all(&self) {
        self.calls.lock().await.clear();
    }

    pub async fn pending(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Block on the rendezvous until a response, the configured timeout,
    /// or session cancellation.
    pub async fn wait(
        &self,
        call: PendingCall,
        cancel: &CancellationToken,
    ) -> Result<IotMessage, CloudError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(CloudError::RpcCancelled),
            outcome = tokio::time::timeout(self.timeout, call.receiver) => match outcome {
                Err(_) => Err(CloudError::RpcTimeout),
                Ok(Err(_)) => Err(CloudError::RpcCancelled),
                Ok(Ok(message)) => Ok(message),
            },
        }
    }
}

#[cfg(test)]
#[path = "rpc_tests.rs"]
mod tests;
