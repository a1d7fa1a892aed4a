use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

use super::{Notification, Notifier};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Transactional email through the Resend API.
pub struct ResendEmail {
    api_key: String,
    from: String,
    to: String,
    client: reqwest::Client,
}

impl ResendEmail {
    pub fn new(api_key: String, from: String, to: String) -> Self {
        Self {
            api_key,
            from,
            to,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for ResendEmail {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let body = json!({
            "from": self.from,
            "to": [self.to],
            "subject": notification.title,
            "text": notification.to_text(),
        });

        let resp = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("failed to call Resend API")?;

        let status = resp.status();
        if !status.is_success() {
            let data = resp.text().await.unwrap_or_default();
            anyhow::bail!("Resend API error ({status}): {data}");
        }

        Ok(())
    }
}
