// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Start or stop a media-server stream recorder.

use crate::message::IotMessage;
use crate::tasks::{TaskCtx, WowzaConfig};

/// Recorder endpoint for a camera stream; record-off targets the
/// `stopRecording` action on the same recorder.
fn recorder_uri(wowza: &WowzaConfig, message: &IotMessage, record_on: bool) -> String {
    let mut uri = format!(
        "http://{}:{}/v2/servers/_defaultServer_/vhosts/_defaultVHost_/applications/{}/instances/_definst_/streamrecorders/{}",
        message.mediaserver_ip, wowza.port, message.application_name, message.device_id
    );
    if !record_on {
        uri.push_str("/actions/stopRecording");
    }
    uri
}

/// Recorder descriptor: segmented MP4, 30-minute segments.
fn recorder_body(message: &IotMessage) -> serde_json::Value {
    serde_json::json!({
        "instanceName": "_definst_",
        "fileVersionDelegateName": "ru.veedo.v3.VeedoFileVersionDelegate",
        "serverName": "",
        "recorderName": message.device_id,
        "segmentSchedule": "",
        "outputPath": "",
        "currentFile": "",
        "applicationName": message.application_name,
        "fileTemplate": "",
        "segmentationType": "SegmentByDuration",
        "fileFormat": "MP4",
        "recorderState": "",
        "option": "",
        "currentSize": 0,
        "segmentSize": 0,
        "segmentDuration": 1_800_000,
        "backBufferTime": 0,
        "currentDuration": 0,
        "startOnKeyFrame": true,
        "recordData": false,
        "moveFirstVideoFrameToZero": true,
        "defaultRecorder": false,
        "splitOnTcDiscontinuity": false,
    })
}

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if message.gateway_id.is_empty() || message.device_id.is_empty() {
        tracing::error!(task = "record-media-stream", "no sender defined");
        return;
    }
    if message.mediaserver_ip.is_empty() {
        tracing::error!(device_id = %message.device_id, "no media server coordinates in message");
        return;
    }

    let record_on = message.recording == "on";
    let uri = recorder_uri(&ctx.wowza, message, record_on);
    tracing::debug!(uri = %uri, record_on, "sending media server recording command");

    let request = if record_on {
        ctx.http.post(&uri).json(&recorder_body(message))
    } else {
        ctx.http.put(&uri)
    };
    let result = request
        .basic_auth(&ctx.wowza.username, Some(&ctx.wowza.password))
        .header("Accept", "application/json; charset=utf-8")
        .send()
        .await;

    match result {
        Ok(response) => match response.text().await {
            Ok(body) => tracing::debug!(response = %body, "media server response"),
            Err(e) => tracing::error!(err = %e, "failed reading media server response"),
        },
        Err(e) => {
            tracing::error!(uri = %uri, err = %e, "error sending media server recording command");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{recorder_body, recorder_uri};
    use crate::message::IotMessage;
    use crate::tasks::WowzaConfig;

    fn wowza() -> WowzaConfig {
        WowzaConfig { username: "api".to_owned(), password: "secret".to_owned(), port: 8087 }
    }

    fn recording_command(recording: &str) -> IotMessage {
        IotMessage {
            gateway_id: "g1".to_owned(),
            device_id: "cam-7".to_owned(),
            mediaserver_ip: "10.0.0.5".to_owned(),
            application_name: "veedo-live".to_owned(),
            recording: recording.to_owned(),
            ..IotMessage::default()
        }
    }

    #[test]
    fn record_on_targets_the_recorder() {
        let uri = recorder_uri(&wowza(), &recording_command("on"), true);
        assert_eq!(
            uri,
            "http://10.0.0.5:8087/v2/servers/_defaultServer_/vhosts/_defaultVHost_/applications/veedo-live/instances/_definst_/streamrecorders/cam-7"
        );
    }

    #[test]
    fn record_off_targets_the_stop_action() {
        let uri = recorder_uri(&wowza(), &recording_command("off"), false);
        assert!(uri.ends_with("/streamrecorders/cam-7/actions/stopRecording"));
    }

    #[test]
    fn recorder_descriptor_is_segmented_mp4() {
        let body = recorder_body(&recording_command("on"));
        assert_eq!(body["recorderName"], "cam-7");
        assert_eq!(body["fileFormat"], "MP4");
        assert_eq!(body["segmentationType"], "SegmentByDuration");
        assert_eq!(body["segmentDuration"], 1_800_000);
    }
}
