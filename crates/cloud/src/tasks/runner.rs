// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool for background tasks.
//!
//! The dispatcher must never block on side effects, so scheduling is a
//! non-blocking `try_send`; when the queue is full the task is dropped and
//! logged. Shutdown stops intake first, drains tasks already accepted into
//! the queue, then joins the workers, so after [`TaskRunner::close`]
//! returns no new task can start and no accepted task is lost.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type Job = (&'static str, BoxFuture<'static, ()>);

pub struct TaskRunner {
    tx: mpsc::Sender<Job>,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskRunner {
    pub fn new(workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Job>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let cancel = CancellationToken::new();

        let handles = (0..workers.max(1))
            .map(|_| {
                let rx = Arc::clone(&rx);
                let cancel = cancel.clone();
                tokio::spawn(worker_loop(rx, cancel))
            })
            .collect();

        Self { tx, cancel, workers: Mutex::new(handles) }
    }

    /// Schedule a task; drops it with a warning when the pool is saturated
    /// or already shut down.
    pub fn spawn(
        &self,
        name: &'static str,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) {
        if self.cancel.is_cancelled() {
            tracing::debug!(task = name, "task runner closed, dropping task");
            return;
        }
        if self.tx.try_send((name, task.boxed())).is_err() {
            tracing::warn!(task = name, "task queue full, dropping task");
        }
    }

    /// Stop intake, drain the queue, and join all workers. In-flight
    /// tasks run to completion (their own I/O timeouts bound them).
    pub async fn close(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().await;
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(rx: Arc<Mutex<mpsc::Receiver<Job>>>, cancel: CancellationToken) {
    loop {
        let job = {
            let mut queue = rx.lock().await;
            tokio::select! {
                biased;
                job = queue.recv() => job,
                _ = cancel.cancelled() => None,
            }
        };
        match job {
            Some((name, task)) => {
                tracing::trace!(task = name, "running task");
                task.await;
            }
            None => break,
        }
    }

    // Cancellation can win the race against jobs already accepted into
    // the queue; drain them before exiting so none is lost.
    loop {
        let job = { rx.lock().await.try_recv().ok() };
        match job {
            Some((name, task)) => {
                tracing::trace!(task = name, "running task");
                task.await;
            }
            None => break,
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
