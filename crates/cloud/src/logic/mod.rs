// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Business-logic dispatcher for one gateway session.
//!
//! Classifies each inbound message, gates it by user/device policy, and
//! emits side-effect tasks. Policy is mutated only here; every task
//! receives a copy of the message as of dispatch time.

pub mod params;

use std::sync::Arc;
use std::time::Duration;

use crate::error::CloudError;
use crate::logic::params::{ParamsStore, RecordingMode, TARIFF_ONLINE};
use crate::message::IotMessage;
use crate::tasks::{TaskKind, TaskRequest, TaskSpawner};

/// Push content for motion events, in the deployment language.
const MOTION_DETECTED: &str = "Обнаружено движение";

pub struct GatewayLogic {
    gateway_id: String,
    params: ParamsStore,
    tasks: Arc<dyn TaskSpawner>,
}

impl GatewayLogic {
    pub fn new(gateway_id: &str, params: ParamsStore, tasks: Arc<dyn TaskSpawner>) -> Self {
        Self { gateway_id: gateway_id.to_owned(), params, tasks }
    }

    /// Load the gateway's policy from the relational store and build the
    /// dispatcher over it.
    pub async fn load(
        db: &sqlx::MySqlPool,
        db_timeout: Duration,
        gateway_id: &str,
        tasks: Arc<dyn TaskSpawner>,
    ) -> Result<Self, CloudError> {
        let params = ParamsStore::load(db, db_timeout, gateway_id).await?;
        Ok(Self::new(gateway_id, params, tasks))
    }

    /// Toggle the user's push flag (admin `push` command).
    pub async fn set_push(&self, state: bool) {
        self.params.with_user(|user| user.push = state).await;
        tracing::debug!(gateway_id = %self.gateway_id, push = state, "push flag updated");
    }

    fn schedule(&self, kind: TaskKind, message: IotMessage) {
        self.tasks.schedule(TaskRequest { kind, message });
    }

    /// Route one classified application message.
    ///
    /// Unknown message types are ignored; lookup misses and unexpected
    /// device states surface to the session, which logs and continues.
    pub async fn process(&self, message: IotMessage) -> Result<(), CloudError> {
        if self.params.user().await.blocked {
            return Ok(());
        }

        match message.message_type.as_str() {
            "status" => {
                self.schedule(TaskKind::UpdateGatewayStatus, message);
                Ok(())
            }
            "sensorData" => match message.device_type.as_str() {
                "camera" => self.process_camera_data(message).await,
                "sensor" => self.process_sensor_data(message).await,
                _ => Ok(()),
            },
            "preview" => {
                self.schedule(TaskKind::StorePreview, message);
                Ok(())
            }
            "command" => self.process_camera_command(message).await,
            "deviceState" => match message.device_type.as_str() {
                "camera" => self.process_camera_state(message).await,
                _ => Ok(()),
            },
            "cloudStreaming" => {
                if message.device_type == "camera" {
                    self.schedule(TaskKind::UpdateCameraStreaming, message);
                }
                Ok(())
            }
            // Reserved: gateway inventory sync is not acted upon yet.
            "configurationData" => Ok(()),
            _ => Ok(()),
        }
    }

    async fn process_camera_state(&self, mut message: IotMessage) -> Result<(), CloudError> {
        let camera = self
            .params
            .camera(&message.device_id)
            .await
            .ok_or_else(|| CloudError::UnknownDevice(message.device_id.clone()))?;

        // Mirror the state into the relational store before any gating.
        self.schedule(TaskKind::UpdateCameraState, message.clone());

        let can_record = self.params.user().await.can_record();
        let mut state = camera.state.lock().await;
        match message.device_state.as_str() {
            "streamingOn" => {
                if !can_record {
                    return Ok(());
                }
                message.recording = "on".to_owned();
                state.mediaserver_ip = message.mediaserver_ip.clone();
                state.application_name = message.application_name.clone();
                state.mediaserver_set = true;
            }
            "streamingOff" => {
                message.recording = "off".to_owned();
                state.mediaserver_ip.clear();
                state.application_name.clear();
                state.mediaserver_set = false;
            }
            other => return Err(CloudError::BadDeviceState(other.to_owned())),
        }

        match state.recording_mode {
            RecordingMode::Continuous => self.schedule(TaskKind::RecordMediaStream, message),
            RecordingMode::Motion if state.motion_in_progress => {
                self.schedule(TaskKind::RecordMediaStream, message);
            }
            _ => {}
        }
        Ok(())
    }

    async fn process_camera_data(&self, mut message: IotMessage) -> Result<(), CloudError> {
        let camera = self
            .params
            .camera(&message.device_id)
            .await
            .ok_or_else(|| CloudError::UnknownDevice(message.device_id.clone()))?;
        let user = self.params.user().await;

        {
            let mut state = camera.state.lock().await;
            if message.label == "motionDetector" && state.recording_mode == RecordingMode::Motion {
                state.motion_in_progress = message.sensor_data == "on";
                if state.mediaserver_set {
                    message.recording = message.sensor_data.clone();
                    message.mediaserver_ip = state.mediaserver_ip.clone();
                    message.application_name = state.application_name.clone();
                    self.schedule(TaskKind::RecordMediaStream, message.clone());
                }
            }
        }

        // Camera sensor events always land in the time-series store.
        self.schedule(TaskKind::StoreSensorTsdb, message.clone());

        if message.label == "motionDetector" && message.sensor_data == "on" && user.push {
            let push = IotMessage::push(
                "camera",
                &camera.title,
                MOTION_DETECTED,
                camera.device_table_id,
                camera.user_id,
            );
            self.schedule(TaskKind::SendPush, push);
        }
        Ok(())
    }

    async fn process_camera_command(&self, message: IotMessage) -> Result<(), CloudError> {
        if message.command != "setRecording" {
            return Ok(());
        }
        let camera = self
            .params
            .camera(&message.device_id)
            .await
            .ok_or_else(|| CloudError::UnknownDevice(message.device_id.clone()))?;

        let new_mode = RecordingMode::parse(&message.attribute);

        // Snapshot the previous tariff and update the user policy in one
        // critical section; the recording decision uses the new snapshot.
        let (prev_tariff, can_record) = self
            .params
            .with_user(|user| {
                let prev_tariff = user.tariff_id;
                user.tariff_id = message.tariff_id;
                user.money = message.money;
                user.vip = message.vip;
                user.legal_entity = message.legal_entity;
                (prev_tariff, user.can_record())
            })
            .await;

        let state = camera.state.lock().await;
        let current_mode = state.recording_mode;

        if current_mode == RecordingMode::Motion && new_mode == RecordingMode::Continuous {
            if can_record {
                let command = camera.recording_command(&state, true);
                self.schedule(TaskKind::RecordMediaStream, command);
            }
        } else if current_mode == RecordingMode::Continuous && new_mode == RecordingMode::Motion {
            let command = camera.recording_command(&state, false);
            self.schedule(TaskKind::RecordMediaStream, command);
        } else if current_mode == new_mode {
            // Unchanged mode: recording follows tariff transitions across
            // the online-tier boundary.
            if prev_tariff == TARIFF_ONLINE && can_record {
                let command = camera.recording_command(&state, true);
                self.schedule(TaskKind::RecordMediaStream, command);
            }
            if prev_tariff > TARIFF_ONLINE && message.tariff_id == TARIFF_ONLINE {
                let command = camera.recording_command(&state, false);
                self.schedule(TaskKind::RecordMediaStream, command);
            }
        }
        Ok(())
    }

    async fn process_sensor_data(&self, mut message: IotMessage) -> Result<(), CloudError> {
        let sensor = self
            .params
            .sensor(&message.device_id)
            .await
            .ok_or_else(|| CloudError::UnknownDevice(message.device_id.clone()))?;

        let label = message.label_key();
        let inner = sensor
            .inner
            .get(&label)
            .ok_or_else(|| CloudError::UnknownDevice(format!("{}/{label}", message.device_id)))?
            .clone();

        message.device_table_id = sensor.device_table_id;
        self.schedule(TaskKind::StoreSensorSql, message.clone());

        if inner.timeseries {
            self.schedule(TaskKind::StoreSensorTsdb, message.clone());
        }

        if message.sensor_data == "on" && inner.notify && self.params.user().await.push {
            let push = IotMessage::push(
                "sensor",
                &sensor.title,
                &inner.description,
                sensor.device_table_id,
                sensor.user_id,
            );
            self.schedule(TaskKind::SendPush, push);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "logic_tests.rs"]
mod tests;
