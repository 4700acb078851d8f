// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::TaskRunner;

#[tokio::test]
async fn runs_scheduled_tasks() {
    let runner = TaskRunner::new(2, 16);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..5 {
        let counter = Arc::clone(&counter);
        runner.spawn("test-task", async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Workers drain the queue shortly after.
    for _ in 0..50 {
        if counter.load(Ordering::SeqCst) == 5 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(counter.load(Ordering::SeqCst), 5);
    runner.close().await;
}

#[tokio::test]
async fn rejects_tasks_after_close() {
    let runner = TaskRunner::new(1, 4);
    runner.close().await;

    let counter = Arc::new(AtomicUsize::new(0));
    let cloned = Arc::clone(&counter);
    runner.spawn("late-task", async move {
        cloned.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0, "no task may start after close");
}

#[tokio::test]
async fn close_drains_tasks_still_in_the_queue() {
    let runner = TaskRunner::new(1, 8);
    let counter = Arc::new(AtomicUsize::new(0));

    // Hold the single worker busy so the following tasks stay buffered
    // in the channel when close fires.
    let cloned = Arc::clone(&counter);
    runner.spawn("busy-task", async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cloned.fetch_add(1, Ordering::SeqCst);
    });
    for _ in 0..3 {
        let cloned = Arc::clone(&counter);
        runner.spawn("buffered-task", async move {
            cloned.fetch_add(1, Ordering::SeqCst);
        });
    }

    runner.close().await;
    assert_eq!(
        counter.load(Ordering::SeqCst),
        4,
        "tasks accepted before close must run before close returns"
    );
}

#[tokio::test]
async fn close_waits_for_in_flight_tasks() {
    let runner = TaskRunner::new(1, 4);
    let counter = Arc::new(AtomicUsize::new(0));

    let cloned = Arc::clone(&counter);
    runner.spawn("slow-task", async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        cloned.fetch_add(1, Ordering::SeqCst);
    });

    // Give the worker a beat to pick the task up, then close.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    runner.close().await;
    assert_eq!(counter.load(Ordering::SeqCst), 1, "in-flight task finishes before close returns");
}
