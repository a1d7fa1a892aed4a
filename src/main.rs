use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use consultsite::config::{AppConfig, StoreBackend};
use consultsite::db::{self, queries};
use consultsite::models::{User, UserRole};
use consultsite::services::auth::AuthProvider;
use consultsite::services::notify::discord::DiscordWebhook;
use consultsite::services::notify::resend::ResendEmail;
use consultsite::services::notify::{FanoutNotifier, NoopNotifier, Notifier};
use consultsite::services::storage::LocalStorage;
use consultsite::services::store::sqlite::SqliteStore;
use consultsite::services::store::supabase::SupabaseStore;
use consultsite::services::store::BookingStore;
use consultsite::state::AppState;

const ADMIN_SESSION_HOURS: i64 = 12;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        !config.auth_secret.is_empty(),
        "AUTH_SECRET must be set, it signs admin session tokens"
    );

    let conn = db::init_db(&config.database_url)?;
    let auth = AuthProvider::new(&config.auth_secret, chrono::Duration::hours(ADMIN_SESSION_HOURS))?;
    seed_admin(&conn, &auth, &config)?;
    let db = Arc::new(Mutex::new(conn));

    let store: Box<dyn BookingStore> = match config.store_backend {
        StoreBackend::Supabase => {
            anyhow::ensure!(
                !config.supabase_url.is_empty() && !config.supabase_anon_key.is_empty(),
                "SUPABASE_URL and SUPABASE_ANON_KEY must be set when STORE_BACKEND=supabase"
            );
            tracing::info!("using Supabase booking store (url: {})", config.supabase_url);
            Box::new(SupabaseStore::new(
                config.supabase_url.clone(),
                config.supabase_anon_key.clone(),
            ))
        }
        StoreBackend::Sqlite => {
            tracing::info!("using SQLite booking store ({})", config.database_url);
            Box::new(SqliteStore::new(Arc::clone(&db)))
        }
    };

    let storage = LocalStorage::new(&config.upload_dir, &config.public_base_url);

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        booking_notifier: booking_notifier(&config),
        contact_notifier: contact_notifier(&config),
        store,
        storage: Box::new(storage),
        auth,
        config: config.clone(),
    });

    // Background task: drop expired wizard sessions every 5 minutes
    let cleanup_db = Arc::clone(&db);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let result = db::lock(&cleanup_db).and_then(|conn| queries::expire_old_wizard_sessions(&conn));
            match result {
                Ok(0) => {}
                Ok(n) => tracing::debug!(count = n, "expired booking sessions"),
                Err(e) => tracing::error!(error = %e, "failed to expire booking sessions"),
            }
        }
    });

    let app = consultsite::build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn discord(config: &AppConfig) -> Option<Box<dyn Notifier>> {
    if config.discord_webhook_url.is_empty() {
        return None;
    }
    Some(Box::new(DiscordWebhook::new(config.discord_webhook_url.clone())))
}

fn booking_notifier(config: &AppConfig) -> Box<dyn Notifier> {
    match discord(config) {
        Some(notifier) => notifier,
        None => {
            tracing::warn!("DISCORD_WEBHOOK_URL not set, booking notifications disabled");
            Box::new(NoopNotifier)
        }
    }
}

fn contact_notifier(config: &AppConfig) -> Box<dyn Notifier> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    notifiers.extend(discord(config));

    if config.resend_api_key.is_empty() || config.contact_email_to.is_empty() {
        tracing::warn!("RESEND_API_KEY or CONTACT_EMAIL_TO not set, contact emails disabled");
    } else {
        notifiers.push(Box::new(ResendEmail::new(
            config.resend_api_key.clone(),
            config.contact_email_from.clone(),
            config.contact_email_to.clone(),
        )));
    }

    if notifiers.is_empty() {
        return Box::new(NoopNotifier);
    }
    Box::new(FanoutNotifier::new(notifiers))
}

/// Creates the admin account from `ADMIN_EMAIL`/`ADMIN_PASSWORD` if it does
/// not exist yet.
fn seed_admin(conn: &Connection, auth: &AuthProvider, config: &AppConfig) -> anyhow::Result<()> {
    if config.admin_email.is_empty() || config.admin_password.is_empty() {
        tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded");
        return Ok(());
    }
    if queries::get_user_by_email(conn, &config.admin_email)?.is_some() {
        return Ok(());
    }

    queries::create_user(
        conn,
        &User {
            id: uuid::Uuid::new_v4().to_string(),
            email: config.admin_email.clone(),
            full_name: None,
            role: UserRole::Admin,
            password_hash: auth.hash_password(&config.admin_password)?,
            created_at: queries::timestamp(),
        },
    )?;
    tracing::info!(email = %config.admin_email, "seeded admin account");
    Ok(())
}
