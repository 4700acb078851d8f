// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan a device event out to the user's mobile devices.

use serde::Serialize;
use sqlx::Row;

use crate::message::IotMessage;
use crate::tasks::{timed, TaskCtx};

#[derive(Debug, Serialize)]
struct Localized {
    en: String,
    ru: String,
}

impl Localized {
    fn both(text: &str) -> Self {
        Self { en: text.to_owned(), ru: text.to_owned() }
    }
}

#[derive(Debug, Serialize)]
struct NotificationData {
    #[serde(rename = "deviceType")]
    device_type: String,
    #[serde(rename = "deviceId")]
    device_id: u64,
}

/// Create-notification payload.
/// https://documentation.onesignal.com/reference#create-notification
#[derive(Debug, Serialize)]
struct Notification {
    app_id: String,
    include_player_ids: Vec<String>,
    headings: Localized,
    contents: Localized,
    data: NotificationData,
}

/// Select the players to notify. A player row with an empty `device_ids`
/// column receives everything; a non-empty column is a JSON inclusion set
/// per device type.
fn eligible_players(
    rows: &[(String, String)],
    device_type: &str,
    device_table_id: u64,
) -> Vec<String> {
    rows.iter()
        .filter_map(|(player_id, device_ids)| {
            if device_ids.is_empty() {
                return Some(player_id.clone());
            }
            let inclusion: serde_json::Value = serde_json::from_str(device_ids).ok()?;
            let ids = inclusion.get(device_type)?.as_array()?;
            if ids.iter().any(|id| id.as_u64() == Some(device_table_id)) {
                Some(player_id.clone())
            } else {
                None
            }
        })
        .collect()
}

/// Prefix the content with local wall-clock time.
fn timed_content(content: &str) -> String {
    format!("{}   {}", chrono::Local::now().format("%H:%M:%S"), content)
}

pub async fn run(ctx: &TaskCtx, message: &IotMessage) {
    if message.device_table_id == 0 {
        tracing::error!(task = "send-push", "no sender defined");
        return;
    }
    if message.device_type != "camera" && message.device_type != "sensor" {
        tracing::error!(device_type = %message.device_type, "wrong device type for push");
        return;
    }

    let rows = match timed(
        ctx.db_timeout,
        sqlx::query("select player_id, device_ids from v3_playerids where user_id = ?")
            .bind(message.user_id)
            .fetch_all(&ctx.db),
    )
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(user_id = message.user_id, err = %e, "error selecting player ids");
            return;
        }
    };

    let players: Vec<(String, String)> = rows
        .iter()
        .filter_map(|row| {
            let player_id: String = row.try_get("player_id").ok()?;
            let device_ids: Option<String> = row.try_get("device_ids").ok()?;
            Some((player_id, device_ids.unwrap_or_default()))
        })
        .collect();

    let include_player_ids =
        eligible_players(&players, &message.device_type, message.device_table_id);
    if include_player_ids.is_empty() {
        tracing::debug!(user_id = message.user_id, "no player ids for user, skipping push");
        return;
    }

    let notification = Notification {
        app_id: ctx.push.app_id.clone(),
        include_player_ids,
        headings: Localized::both(&message.title),
        contents: Localized::both(&timed_content(&message.content)),
        data: NotificationData {
            device_type: message.device_type.clone(),
            device_id: message.device_table_id,
        },
    };

    let url = format!("{}{}", ctx.push.host, ctx.push.request_uri);
    let result = ctx
        .http
        .post(&url)
        .header("Authorization", format!("Basic {}", ctx.push.rest_api_key))
        .json(&notification)
        .send()
        .await;
    match result {
        Ok(response) => {
            tracing::debug!(status = %response.status(), "push gateway response");
        }
        Err(e) => {
            tracing::error!(user_id = message.user_id, err = %e, "error sending push notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::eligible_players;

    #[test]
    fn empty_inclusion_set_receives_everything() {
        let rows = vec![("p1".to_owned(), String::new()), ("p2".to_owned(), String::new())];
        assert_eq!(eligible_players(&rows, "sensor", 7), vec!["p1", "p2"]);
    }

    #[test]
    fn inclusion_set_filters_by_device_table_id() {
        let rows = vec![
            ("p1".to_owned(), r#"{"camera":[7,9]}"#.to_owned()),
            ("p2".to_owned(), r#"{"camera":[9]}"#.to_owned()),
            ("p3".to_owned(), String::new()),
        ];
        assert_eq!(eligible_players(&rows, "camera", 7), vec!["p1", "p3"]);
    }

    #[test]
    fn inclusion_set_is_per_device_type() {
        let rows = vec![("p1".to_owned(), r#"{"sensor":[7]}"#.to_owned())];
        assert!(eligible_players(&rows, "camera", 7).is_empty());
    }

    #[test]
    fn malformed_inclusion_set_drops_the_player() {
        let rows = vec![("p1".to_owned(), "not json".to_owned())];
        assert!(eligible_players(&rows, "sensor", 7).is_empty());
    }
}
