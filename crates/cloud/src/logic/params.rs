// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session business-logic parameters.
//!
//! Typed camera and sensor maps plus the owning user's policy snapshot,
//! loaded once per session from the relational store. Camera records keep
//! their transient state (media server coordinates, motion flag) behind a
//! per-record lock; only the session's dispatcher mutates it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::Row;
use tokio::sync::{Mutex, RwLock};

use crate::error::CloudError;
use crate::message::IotMessage;
use crate::tasks::timed;

/// Lowest paid tier; `online` users only watch live streams.
pub const TARIFF_ONLINE: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingMode {
    #[default]
    Off,
    Continuous,
    Motion,
    Schedule,
}

impl RecordingMode {
    pub fn parse(mode: &str) -> Self {
        match mode {
            "continuous" => Self::Continuous,
            "motion" => Self::Motion,
            "schedule" => Self::Schedule,
            _ => Self::Off,
        }
    }
}

/// User policy snapshot.
#[derive(Debug, Clone, Default)]
pub struct UserParams {
    pub user_id: u64,
    pub tariff_id: u64,
    pub money: u64,
    pub vip: bool,
    pub legal_entity: bool,
    pub blocked: bool,
    pub push: bool,
}

impl UserParams {
    /// Recording gate: a paid tier with credit, or an exempt account.
    pub fn can_record(&self) -> bool {
        (self.tariff_id > TARIFF_ONLINE && self.money > 0) || self.vip || self.legal_entity
    }
}

/// Mutable part of a camera's policy.
#[derive(Debug, Clone, Default)]
pub struct CameraState {
    pub recording_mode: RecordingMode,
    pub schedule: String,
    pub mediaserver_set: bool,
    pub mediaserver_ip: String,
    pub application_name: String,
    pub motion_in_progress: bool,
}

/// Per-camera policy record.
pub struct CameraParams {
    pub device_table_id: u64,
    pub user_id: u64,
    pub gateway_id: String,
    pub device_id: String,
    pub title: String,
    pub state: Mutex<CameraState>,
}

impl CameraParams {
    /// Build the envelope driving the media recorder from policy state.
    pub fn recording_command(&self, state: &CameraState, record_on: bool) -> IotMessage {
        IotMessage {
            gateway_id: self.gateway_id.clone(),
            device_id: self.device_id.clone(),
            device_type: "camera".to_owned(),
            recording: if record_on { "on" } else { "off" }.to_owned(),
            mediaserver_ip: state.mediaserver_ip.clone(),
            application_name: state.application_name.clone(),
            ..IotMessage::default()
        }
    }
}

/// Per-label sensor settings.
#[derive(Debug, Clone, Default)]
pub struct SensorInner {
    pub timeseries: bool,
    pub notify: bool,
    pub description: String,
}

/// Per-sensor policy record.
#[derive(Debug, Clone, Default)]
pub struct SensorParams {
    pub device_table_id: u64,
    pub user_id: u64,
    pub gateway_id: String,
    pub device_id: String,
    pub title: String,
    pub inner: HashMap<String, SensorInner>,
}

// -- Store --------------------------------------------------------------------

/// Guarded typed maps for one session's policy.
pub struct ParamsStore {
    cameras: RwLock<HashMap<String, Arc<CameraParams>>>,
    sensors: RwLock<HashMap<String, Arc<SensorParams>>>,
    user: Mutex<UserParams>,
}

impl ParamsStore {
    pub fn new(user: UserParams) -> Self {
        Self {
            cameras: RwLock::new(HashMap::new()),
            sensors: RwLock::new(HashMap::new()),
            user: Mutex::new(user),
        }
    }

    pub async fn add_camera(&self, camera: CameraParams) {
        self.cameras.write().await.insert(camera.device_id.clone(), Arc::new(camera));
    }

    pub async fn camera(&self, device_id: &str) -> Option<Arc<CameraParams>> {
        self.cameras.read().await.get(device_id).cloned()
    }

    pub async fn remove_camera(&self, device_id: &str) {
        self.cameras.write().await.remove(device_id);
    }

    pub async fn add_sensor(&self, sensor: SensorParams) {
        self.sensors.write().await.insert(sensor.device_id.clone(), Arc::new(sensor));
    }

    pub async fn sensor(&self, device_id: &str) -> Option<Arc<SensorParams>> {
        self.sensors.read().await.get(device_id).cloned()
    }

    pub async fn remove_sensor(&self, device_id: &str) {
        self.sensors.write().await.remove(device_id);
    }

    /// Snapshot of the user policy.
    pub async fn user(&self) -> UserParams {
        self.user.lock().await.clone()
    }

    /// Run a short critical section against the user policy.
    pub async fn with_user<R>(&self, f: impl FnOnce(&mut UserParams) -> R) -> R {
        let mut user = self.user.lock().await;
        f(&mut user)
    }

    /// Load the session's policy with three ordered queries (user, cameras,
    /// sensor devices) plus one inner query per sensor. Any failure leaves
    /// the session unloaded; the next message retries.
    pub async fn load(
        db: &sqlx::MySqlPool,
        db_timeout: Duration,
        gateway_id: &str,
    ) -> Result<Self, CloudError> {
        let load_err = |e: CloudError| CloudError::ParamsLoad(e.to_string());

        let user_row = timed(
            db_timeout,
            sqlx::query(
                "select u.id, u.tarif, u.money, u.vip, u.legal_entity, u.blocked, u.push \
                 from users u inner join v3_gateways g on g.user_id = u.id \
                 where g.gateway_id = ?",
            )
            .bind(gateway_id)
            .fetch_one(db),
        )
        .await
        .map_err(load_err)?;

        let user = UserParams {
            user_id: user_row.try_get::<i64, _>("id").unwrap_or_default().max(0) as u64,
            tariff_id: user_row.try_get::<i64, _>("tarif").unwrap_or_default().max(0) as u64,
            money: user_row.try_get::<i64, _>("money").unwrap_or_default().max(0) as u64,
            vip: user_row.try_get("vip").unwrap_or_default(),
            legal_entity: user_row.try_get("legal_entity").unwrap_or_default(),
            blocked: user_row.try_get("blocked").unwrap_or_default(),
            push: user_row.try_get("push").unwrap_or_default(),
        };
        let user_id = user.user_id;
        let store = Self::new(user);

        let camera_rows = timed(
            db_timeout,
            sqlx::query(
                "select id, stream_id, title, recording_mode, schedule \
                 from camers where gateway_id = ?",
            )
            .bind(gateway_id)
            .fetch_all(db),
        )
        .await
        .map_err(load_err)?;

        for row in camera_rows {
            let device_id: String = row.try_get("stream_id").unwrap_or_default();
            if device_id.is_empty() {
                continue;
            }
            let mode: String = row.try_get("recording_mode").unwrap_or_default();
            let schedule: Option<String> = row.try_get("schedule").unwrap_or_default();
            store
                .add_camera(CameraParams {
                    device_table_id: row.try_get::<i64, _>("id").unwrap_or_default().max(0) as u64,
                    user_id,
                    gateway_id: gateway_id.to_owned(),
                    device_id,
                    title: row.try_get("title").unwrap_or_default(),
                    state: Mutex::new(CameraState {
                        recording_mode: RecordingMode::parse(&mode),
                        schedule: schedule.unwrap_or_default(),
                        ..CameraState::default()
                    }),
                })
                .await;
        }

        let sensor_rows = timed(
            db_timeout,
            sqlx::query(
                "select id, device_id, title \
                 from v3_devices where gateway_id = ? and type = 'sensor'",
            )
            .bind(gateway_id)
            .fetch_all(db),
        )
        .await
        .map_err(load_err)?;

        for row in sensor_rows {
            let device_id: String = row.try_get("device_id").unwrap_or_default();
            if device_id.is_empty() {
                continue;
            }
            let device_table_id = row.try_get::<i64, _>("id").unwrap_or_default().max(0) as u64;

            let inner_rows = timed(
                db_timeout,
                sqlx::query(
                    "select sensor, influx, notify, description \
                     from v3_sensors where device_id = ?",
                )
                .bind(device_table_id)
                .fetch_all(db),
            )
            .await
            .map_err(load_err)?;

            let mut inner = HashMap::new();
            for inner_row in inner_rows {
                let label: String = inner_row.try_get("sensor").unwrap_or_default();
                let description: Option<String> =
                    inner_row.try_get("description").unwrap_or_default();
                inner.insert(
                    label,
                    SensorInner {
                        timeseries: inner_row.try_get("influx").unwrap_or_default(),
                        notify: inner_row.try_get("notify").unwrap_or_default(),
                        description: description.unwrap_or_default(),
                    },
                );
            }

            store
                .add_sensor(SensorParams {
                    device_table_id,
                    user_id,
                    gateway_id: gateway_id.to_owned(),
                    device_id,
                    title: row.try_get("title").unwrap_or_default(),
                    inner,
                })
                .await;
        }

        Ok(store)
    }
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
