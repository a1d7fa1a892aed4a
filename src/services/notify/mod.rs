pub mod discord;
pub mod resend;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Booking, ContactMessage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
}

/// A staff alert, rendered by each notifier in its own format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub fields: Vec<NotificationField>,
    pub body: Option<String>,
}

impl Notification {
    pub fn new_booking(booking: &Booking) -> Self {
        Self {
            title: "New consultation booking".to_string(),
            fields: vec![
                field("Name", Some(booking.client_name.as_str())),
                field("Company", booking.company_name.as_deref()),
                field("Email", Some(booking.client_email.as_str())),
                field("Phone", booking.client_phone.as_deref()),
                field(
                    "Date/time",
                    Some(
                        booking
                            .preferred_date
                            .format("%Y-%m-%d %H:%M (UTC%:z)")
                            .to_string()
                            .as_str(),
                    ),
                ),
            ],
            body: booking.message.clone(),
        }
    }

    pub fn new_contact(message: &ContactMessage) -> Self {
        Self {
            title: "New contact form message".to_string(),
            fields: vec![
                field("Name", Some(message.name.as_str())),
                field("Company", message.company.as_deref()),
                field("Email", Some(message.email.as_str())),
                field("Phone", message.phone.as_deref()),
            ],
            body: Some(message.message.clone()),
        }
    }

    pub fn to_text(&self) -> String {
        let mut text = self.title.clone();
        for f in &self.fields {
            text.push_str(&format!("\n{}: {}", f.name, f.value));
        }
        if let Some(body) = &self.body {
            text.push_str("\n\n");
            text.push_str(body);
        }
        text
    }
}

fn field(name: &str, value: Option<&str>) -> NotificationField {
    NotificationField {
        name: name.to_string(),
        value: value
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("not provided")
            .to_string(),
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Used when no webhook or email credentials are configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        tracing::debug!(title = %notification.title, "no notifier configured, skipping");
        Ok(())
    }
}

/// Sends to every inner notifier. All are attempted; the first error is
/// returned after the rest have run.
pub struct FanoutNotifier {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(notification).await {
                tracing::error!(error = %e, "notifier failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
