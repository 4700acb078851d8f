// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Veedo cloud: cloud-side controller for a fleet of IoT gateways.
//!
//! Multiplexes per-gateway broker sessions, routes inbound telemetry
//! through policy-gated business logic, fans side effects out to the
//! relational store, time-series store, media server, and push gateway,
//! and exposes a small administrative HTTP surface.

pub mod broker;
pub mod config;
pub mod error;
pub mod logic;
pub mod message;
pub mod rest;
pub mod session;
pub mod tasks;

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::broker::manager::Manager;
use crate::config::CloudConfig;
use crate::tasks::runner::TaskRunner;
use crate::tasks::TaskCtx;

/// Run the controller until shutdown.
pub async fn run(config: CloudConfig) -> anyhow::Result<()> {
    tracing::info!(
        server_id = %config.server_id,
        version = message::VERSION,
        "starting application"
    );

    let shutdown = CancellationToken::new();

    let db = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(8)
        .connect(&config.db_dsn())
        .await
        .context("error connecting to database")?;

    let runner = Arc::new(TaskRunner::new(config.task_workers, config.task_queue));
    let ctx = Arc::new(TaskCtx::new(&config, db.clone()));
    let manager = Arc::new(Manager::new(
        config.clone(),
        Arc::clone(&ctx),
        Arc::clone(&runner),
        shutdown.clone(),
    ));

    manager.open().await.context("could not open broker")?;

    // Renew device states for gateways that reconnected during the outage.
    manager.restart_gateways().await;

    manager.event_exchange_init().await.context("could not initialize event exchange")?;

    {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager.process_exchange_events().await;
        });
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let state = Arc::new(rest::AppState {
        manager: Arc::clone(&manager),
        auth_user: config.rest_user.clone(),
        auth_password: config.rest_password.clone(),
    });
    let router = rest::build_router(state);
    let addr = format!("0.0.0.0:{}", config.rest_port);
    let listener =
        tokio::net::TcpListener::bind(&addr).await.context("failed binding admin api")?;
    tracing::info!("admin api listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    manager.close().await;
    runner.close().await;
    db.close().await;
    tracing::info!("application exited properly");
    Ok(())
}
