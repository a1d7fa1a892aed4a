use std::env;

use chrono::{FixedOffset, Offset, Utc};

#[derive(Clone, Debug, PartialEq)]
pub enum StoreBackend {
    Sqlite,
    Supabase,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub discord_webhook_url: String,
    pub resend_api_key: String,
    pub contact_email_from: String,
    pub contact_email_to: String,
    pub auth_secret: String,
    pub admin_email: String,
    pub admin_password: String,
    pub upload_dir: String,
    pub public_base_url: String,
    pub timezone_offset_minutes: i32,
    pub session_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            port,
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "consultsite.db".to_string()),
            store_backend: match env::var("STORE_BACKEND").as_deref() {
                Ok("supabase") => StoreBackend::Supabase,
                _ => StoreBackend::Sqlite,
            },
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY").unwrap_or_default(),
            discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            contact_email_from: env::var("CONTACT_EMAIL_FROM")
                .unwrap_or_else(|_| "onboarding@resend.dev".to_string()),
            contact_email_to: env::var("CONTACT_EMAIL_TO").unwrap_or_default(),
            auth_secret: env::var("AUTH_SECRET").unwrap_or_default(),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_default(),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{port}")),
            timezone_offset_minutes: env::var("TIMEZONE_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            session_ttl_minutes: env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Offset used for "today" and for the booking timestamp. Out-of-range
    /// values fall back to UTC.
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset_minutes * 60).unwrap_or(Utc.fix())
    }
}
