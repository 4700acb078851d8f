// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use tokio::sync::Mutex;

use super::{CameraParams, CameraState, ParamsStore, RecordingMode, UserParams, TARIFF_ONLINE};

#[test]
fn recording_mode_parses_known_modes() {
    assert_eq!(RecordingMode::parse("continuous"), RecordingMode::Continuous);
    assert_eq!(RecordingMode::parse("motion"), RecordingMode::Motion);
    assert_eq!(RecordingMode::parse("schedule"), RecordingMode::Schedule);
    assert_eq!(RecordingMode::parse("off"), RecordingMode::Off);
    assert_eq!(RecordingMode::parse("anything else"), RecordingMode::Off);
}

#[test]
fn can_record_requires_paid_tier_with_credit() {
    let mut user = UserParams { tariff_id: TARIFF_ONLINE + 1, money: 100, ..UserParams::default() };
    assert!(user.can_record());

    user.money = 0;
    assert!(!user.can_record(), "paid tier without credit cannot record");

    user.tariff_id = TARIFF_ONLINE;
    user.money = 100;
    assert!(!user.can_record(), "online tier cannot record");
}

#[test]
fn can_record_is_monotone_in_money() {
    for money in [1u64, 10, 1_000_000] {
        let user = UserParams { tariff_id: 2, money, ..UserParams::default() };
        assert!(user.can_record());
    }
}

#[test]
fn vip_and_legal_entity_bypass_the_tariff_gate() {
    let vip = UserParams { vip: true, ..UserParams::default() };
    assert!(vip.can_record());
    let legal = UserParams { legal_entity: true, ..UserParams::default() };
    assert!(legal.can_record());
}

#[tokio::test]
async fn store_roundtrips_camera_records() {
    let store = ParamsStore::new(UserParams::default());
    store
        .add_camera(CameraParams {
            device_table_id: 7,
            user_id: 1,
            gateway_id: "g1".to_owned(),
            device_id: "cam-1".to_owned(),
            title: "Front door".to_owned(),
            state: Mutex::new(CameraState::default()),
        })
        .await;

    let camera = store.camera("cam-1").await;
    assert!(camera.is_some());
    assert!(store.camera("cam-2").await.is_none());

    store.remove_camera("cam-1").await;
    assert!(store.camera("cam-1").await.is_none());
}

#[tokio::test]
async fn user_critical_section_updates_the_snapshot() {
    let store = ParamsStore::new(UserParams { tariff_id: 1, ..UserParams::default() });
    let previous = store.with_user(|user| {
        let previous = user.tariff_id;
        user.tariff_id = 3;
        user.money = 50;
        previous
    })
    .await;
    assert_eq!(previous, 1);
    let snapshot = store.user().await;
    assert_eq!(snapshot.tariff_id, 3);
    assert_eq!(snapshot.money, 50);
}

#[test]
fn recording_command_copies_policy_coordinates() {
    let camera = CameraParams {
        device_table_id: 7,
        user_id: 1,
        gateway_id: "g1".to_owned(),
        device_id: "cam-1".to_owned(),
        title: "Front door".to_owned(),
        state: Mutex::new(CameraState::default()),
    };
    let state = CameraState {
        mediaserver_ip: "10.0.0.5".to_owned(),
        application_name: "veedo-live".to_owned(),
        mediaserver_set: true,
        ..CameraState::default()
    };

    let on = camera.recording_command(&state, true);
    assert_eq!(on.recording, "on");
    assert_eq!(on.mediaserver_ip, "10.0.0.5");
    assert_eq!(on.application_name, "veedo-live");
    assert_eq!(on.device_type, "camera");

    let off = camera.recording_command(&state, false);
    assert_eq!(off.recording, "off");
}
