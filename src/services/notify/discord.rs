use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Notification, Notifier};

/// Discord limits embed field values to 1024 characters.
const MAX_FIELD_LEN: usize = 1024;

pub struct DiscordWebhook {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }
}

fn payload(notification: &Notification) -> serde_json::Value {
    let fields: Vec<_> = notification
        .fields
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "value": truncate(&f.value, MAX_FIELD_LEN),
                "inline": true,
            })
        })
        .collect();

    let mut embed = json!({
        "title": notification.title,
        "fields": fields,
    });
    if let Some(body) = &notification.body {
        embed["description"] = json!(truncate(body, 4096));
    }

    json!({
        "content": notification.title,
        "embeds": [embed],
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.client
            .post(&self.webhook_url)
            .json(&payload(notification))
            .send()
            .await
            .context("failed to call Discord webhook")?
            .error_for_status()
            .context("Discord webhook returned error")?;

        Ok(())
    }
}
