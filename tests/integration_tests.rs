use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rusqlite::Connection;
use serde_json::{json, Value};
use tokio::sync::Notify;
use tower::ServiceExt;

use consultsite::build_router;
use consultsite::config::{AppConfig, StoreBackend};
use consultsite::db::{self, queries};
use consultsite::models::{Booking, ConsultantSettings, NewBooking, User, UserRole};
use consultsite::services::auth::AuthProvider;
use consultsite::services::notify::{Notification, Notifier};
use consultsite::services::slots::local_today;
use consultsite::services::storage::ObjectStorage;
use consultsite::services::store::sqlite::SqliteStore;
use consultsite::services::store::BookingStore;
use consultsite::state::AppState;

const ADMIN_EMAIL: &str = "admin@example.com";
const EDITOR_EMAIL: &str = "editor@example.com";
const PASSWORD: &str = "correct-horse";

// ── Mock Providers ──

/// Records every write. Optionally fails, or parks inside the write until
/// released so a second request can race it.
#[derive(Default)]
struct MockStore {
    writes: Arc<Mutex<Vec<NewBooking>>>,
    fail: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

#[async_trait]
impl BookingStore for MockStore {
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<Booking> {
        self.writes.lock().unwrap().push(booking.clone());
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.fail {
            anyhow::bail!("connection reset by peer");
        }
        Ok(Booking {
            id: "booking-1".to_string(),
            request_id: Some(booking.request_id.to_string()),
            client_name: booking.client_name.clone(),
            client_email: booking.client_email.clone(),
            client_phone: booking.client_phone.clone(),
            company_name: booking.company_name.clone(),
            preferred_date: booking.preferred_date,
            message: booking.message.clone(),
            status: booking.status,
            created_at: Utc::now(),
        })
    }

    async fn consultant_settings(&self) -> anyhow::Result<Option<ConsultantSettings>> {
        Ok(None)
    }
}

struct MockNotifier {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, _notification: &Notification) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("webhook returned 500");
        }
        Ok(())
    }
}

struct MockStorage {
    uploads: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload(&self, bucket: &str, file_name: &str, bytes: &[u8]) -> anyhow::Result<String> {
        self.uploads
            .lock()
            .unwrap()
            .push((bucket.to_string(), file_name.to_string(), bytes.to_vec()));
        Ok(format!("http://localhost:3000/uploads/{bucket}/{file_name}"))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        store_backend: StoreBackend::Sqlite,
        supabase_url: String::new(),
        supabase_anon_key: String::new(),
        discord_webhook_url: String::new(),
        resend_api_key: String::new(),
        contact_email_from: String::new(),
        contact_email_to: String::new(),
        auth_secret: "test-secret".to_string(),
        admin_email: String::new(),
        admin_password: String::new(),
        upload_dir: std::env::temp_dir().display().to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        timezone_offset_minutes: 120,
        session_ttl_minutes: 30,
    }
}

fn offset() -> FixedOffset {
    test_config().local_offset()
}

struct Harness {
    app: Router,
    db: Arc<Mutex<Connection>>,
    booking_notifications: Arc<AtomicUsize>,
    contact_notifications: Arc<AtomicUsize>,
    uploads: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
}

struct Options {
    store: Option<MockStore>,
    notify_fails: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            store: Some(MockStore::default()),
            notify_fails: false,
        }
    }
}

/// `store: None` uses the real SQLite store on the same database.
fn harness(options: Options) -> Harness {
    let conn = db::init_db(":memory:").unwrap();
    let auth = AuthProvider::new("test-secret", Duration::hours(1)).unwrap();
    for (id, email, role) in [
        ("admin-1", ADMIN_EMAIL, UserRole::Admin),
        ("editor-1", EDITOR_EMAIL, UserRole::Editor),
    ] {
        queries::create_user(
            &conn,
            &User {
                id: id.to_string(),
                email: email.to_string(),
                full_name: None,
                role,
                password_hash: auth.hash_password(PASSWORD).unwrap(),
                created_at: queries::timestamp(),
            },
        )
        .unwrap();
    }
    let db = Arc::new(Mutex::new(conn));

    let store: Box<dyn BookingStore> = match options.store {
        Some(mock) => Box::new(mock),
        None => Box::new(SqliteStore::new(Arc::clone(&db))),
    };
    let booking_notifications = Arc::new(AtomicUsize::new(0));
    let contact_notifications = Arc::new(AtomicUsize::new(0));
    let uploads = Arc::new(Mutex::new(vec![]));

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        config: test_config(),
        store,
        booking_notifier: Box::new(MockNotifier {
            calls: Arc::clone(&booking_notifications),
            fail: options.notify_fails,
        }),
        contact_notifier: Box::new(MockNotifier {
            calls: Arc::clone(&contact_notifications),
            fail: options.notify_fails,
        }),
        storage: Box::new(MockStorage {
            uploads: Arc::clone(&uploads),
        }),
        auth,
    });

    Harness {
        app: build_router(state),
        db,
        booking_notifications,
        contact_notifications,
        uploads,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn sign_in(app: &Router, email: &str) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/api/auth/sign-in",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["token"].as_str().unwrap().to_string()
}

fn tomorrow() -> String {
    (local_today(offset()) + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

/// Walks a fresh session to the contact step with a valid contact filled in.
async fn session_ready_to_submit(app: &Router) -> String {
    let (status, json) = send(app, "POST", "/api/booking/sessions", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["id"].as_str().unwrap().to_string();
    let base = format!("/api/booking/sessions/{id}");

    let (status, _) = send(app, "POST", &format!("{base}/date"), None, Some(json!({ "date": tomorrow() }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(app, "POST", &format!("{base}/time"), None, Some(json!({ "time": "10:30" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = send(app, "POST", &format!("{base}/proceed"), None, None).await;
    assert_eq!(json["step"], "entering_contact_info");

    let (status, json) = send(
        app,
        "PUT",
        &format!("{base}/contact"),
        None,
        Some(json!({
            "client_name": "Maria Lopez",
            "client_email": "maria@example.com",
            "company_name": "Lopez Logistics",
            "message": "We want to automate invoicing."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["can_submit"], true);
    id
}

// ── Public API ──

#[tokio::test]
async fn test_health() {
    let h = harness(Options::default());
    let (status, json) = send(&h.app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_slots_use_default_working_hours() {
    let h = harness(Options::default());
    let (status, json) = send(&h.app, "GET", "/api/booking/slots", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let slots = json["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    assert_eq!(slots[0], "09:00");
    assert_eq!(slots[15], "16:30");
}

#[tokio::test]
async fn test_calendar_month() {
    let h = harness(Options::default());

    let (status, json) = send(&h.app, "GET", "/api/booking/calendar?year=2025&month=5", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["days_in_month"], 30);
    assert_eq!(json["first_day_of_week"], 0);
    assert_eq!(json["days"].as_array().unwrap().len(), 30);

    let (status, _) = send(&h.app, "GET", "/api/booking/calendar?year=2025&month=12", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Booking Wizard ──

#[tokio::test]
async fn test_booking_happy_path() {
    let store = MockStore::default();
    let writes = Arc::clone(&store.writes);
    let h = harness(Options {
        store: Some(store),
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let (status, json) = send(&h.app, "POST", &format!("/api/booking/sessions/{id}/submit"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].status.as_str(), "pending");
    assert_eq!(writes[0].client_name, "Maria Lopez");

    let day = local_today(offset()) + Duration::days(1);
    let expected = offset()
        .from_local_datetime(&day.and_hms_opt(10, 30, 0).unwrap())
        .unwrap();
    assert_eq!(writes[0].preferred_date, expected);
    let returned = DateTime::parse_from_rfc3339(json["booking"]["preferred_date"].as_str().unwrap()).unwrap();
    assert_eq!(returned, expected);

    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 1);

    // Wizard is back at the start with nothing selected
    let session = &json["session"];
    assert_eq!(session["step"], "selecting_date_time");
    assert_eq!(session["date"], Value::Null);
    assert_eq!(session["time"], Value::Null);
    assert_eq!(session["contact"]["client_name"], "");
}

#[tokio::test]
async fn test_write_failure_keeps_contact_step() {
    let h = harness(Options {
        store: Some(MockStore {
            fail: true,
            ..Default::default()
        }),
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let (status, json) = send(&h.app, "POST", &format!("/api/booking/sessions/{id}/submit"), None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("couldn't submit"));
    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 0);

    let (_, session) = send(&h.app, "GET", &format!("/api/booking/sessions/{id}"), None, None).await;
    assert_eq!(session["step"], "entering_contact_info");
    assert_eq!(session["date"], tomorrow());
    assert_eq!(session["time"], "10:30");
    assert_eq!(session["contact"]["client_email"], "maria@example.com");
    assert_eq!(session["contact"]["company_name"], "Lopez Logistics");
    assert!(session["last_error"].is_string());
}

#[tokio::test]
async fn test_notification_failure_then_retry_does_not_duplicate() {
    let h = harness(Options {
        store: None,
        notify_fails: true,
    });

    let id = session_ready_to_submit(&h.app).await;
    let submit = format!("/api/booking/sessions/{id}/submit");

    let (status, _) = send(&h.app, "POST", &submit, None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let (status, _) = send(&h.app, "POST", &submit, None, None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 2);
    let conn = h.db.lock().unwrap();
    let stored = queries::list_bookings(&conn, None, 10).unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_missing_email_blocks_submission() {
    let store = MockStore::default();
    let writes = Arc::clone(&store.writes);
    let h = harness(Options {
        store: Some(store),
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let base = format!("/api/booking/sessions/{id}");
    let (_, json) = send(&h.app, "PUT", &format!("{base}/contact"), None, Some(json!({ "client_email": "  " }))).await;
    assert_eq!(json["can_submit"], false);

    let (status, json) = send(&h.app, "POST", &format!("{base}/submit"), None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "client_email is required");
    assert!(writes.lock().unwrap().is_empty());
    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_submit_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let store = MockStore {
        gate: Some((Arc::clone(&entered), Arc::clone(&release))),
        ..Default::default()
    };
    let writes = Arc::clone(&store.writes);
    let h = harness(Options {
        store: Some(store),
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let submit = format!("/api/booking/sessions/{id}/submit");

    let first = tokio::spawn({
        let app = h.app.clone();
        let submit = submit.clone();
        async move { send(&app, "POST", &submit, None, None).await }
    });
    entered.notified().await;

    let (status, _) = send(&h.app, "POST", &submit, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    release.notify_one();
    let (status, _) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(writes.lock().unwrap().len(), 1);
    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_abandoned_submit_reopens_session() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let store = MockStore {
        gate: Some((Arc::clone(&entered), Arc::clone(&release))),
        ..Default::default()
    };
    let writes = Arc::clone(&store.writes);
    let h = harness(Options {
        store: Some(store),
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let base = format!("/api/booking/sessions/{id}");

    let first = tokio::spawn({
        let app = h.app.clone();
        let submit = format!("{base}/submit");
        async move { send(&app, "POST", &submit, None, None).await }
    });
    entered.notified().await;
    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let (status, json) = send(&h.app, "GET", &base, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["step"], "entering_contact_info");
    assert!(json["last_error"].is_string());
    assert_eq!(json["contact"]["client_name"], "Maria Lopez");

    release.notify_one();
    let (status, json) = send(&h.app, "POST", &format!("{base}/submit"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["step"], "selecting_date_time");

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].request_id, writes[1].request_id);
}

#[tokio::test]
async fn test_get_session_does_not_extend_expiry() {
    let h = harness(Options::default());
    let (_, json) = send(&h.app, "POST", "/api/booking/sessions", None, None).await;
    let id = json["id"].as_str().unwrap().to_string();

    let expires_at = "2999-01-01 00:00:00";
    h.db.lock()
        .unwrap()
        .execute(
            "UPDATE wizard_sessions SET expires_at = ?1 WHERE id = ?2",
            rusqlite::params![expires_at, id],
        )
        .unwrap();

    let (status, _) = send(&h.app, "GET", &format!("/api/booking/sessions/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);

    let stored: String = h
        .db
        .lock()
        .unwrap()
        .query_row(
            "SELECT expires_at FROM wizard_sessions WHERE id = ?1",
            [&id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, expires_at);
}

#[tokio::test]
async fn test_proceed_requires_date_and_time() {
    let h = harness(Options::default());
    let (_, json) = send(&h.app, "POST", "/api/booking/sessions", None, None).await;
    let base = format!("/api/booking/sessions/{}", json["id"].as_str().unwrap());

    let (status, json) = send(&h.app, "POST", &format!("{base}/proceed"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["step"], "selecting_date_time");

    send(&h.app, "POST", &format!("{base}/date"), None, Some(json!({ "date": tomorrow() }))).await;
    let (_, json) = send(&h.app, "POST", &format!("{base}/proceed"), None, None).await;
    assert_eq!(json["step"], "selecting_date_time");
}

#[tokio::test]
async fn test_back_and_proceed_preserve_selection() {
    let h = harness(Options::default());
    let id = session_ready_to_submit(&h.app).await;
    let base = format!("/api/booking/sessions/{id}");

    let (_, json) = send(&h.app, "POST", &format!("{base}/back"), None, None).await;
    assert_eq!(json["step"], "selecting_date_time");
    assert_eq!(json["date"], tomorrow());
    assert_eq!(json["time"], "10:30");

    let (_, json) = send(&h.app, "POST", &format!("{base}/proceed"), None, None).await;
    assert_eq!(json["step"], "entering_contact_info");
    assert_eq!(json["date"], tomorrow());
    assert_eq!(json["time"], "10:30");
    assert_eq!(json["contact"]["client_name"], "Maria Lopez");
}

#[tokio::test]
async fn test_invalid_selections_rejected() {
    let h = harness(Options::default());
    let (_, json) = send(&h.app, "POST", "/api/booking/sessions", None, None).await;
    let base = format!("/api/booking/sessions/{}", json["id"].as_str().unwrap());

    let yesterday = (local_today(offset()) - Duration::days(1)).format("%Y-%m-%d").to_string();
    let (status, _) = send(&h.app, "POST", &format!("{base}/date"), None, Some(json!({ "date": yesterday }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&h.app, "POST", &format!("{base}/time"), None, Some(json!({ "time": "18:00" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Contact details belong to the second step
    let (status, _) = send(&h.app, "PUT", &format!("{base}/contact"), None, Some(json!({ "client_name": "x" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_session() {
    let h = harness(Options::default());
    let (status, _) = send(&h.app, "GET", "/api/booking/sessions/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Contact Form ──

#[tokio::test]
async fn test_contact_form_stores_and_notifies() {
    let h = harness(Options::default());

    let (status, json) = send(
        &h.app,
        "POST",
        "/api/contact",
        None,
        Some(json!({
            "name": "Tom",
            "email": "tom@example.com",
            "phone": "",
            "message": "Can you help with our CRM sync?"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["phone"], Value::Null);
    assert_eq!(h.contact_notifications.load(Ordering::SeqCst), 1);
    assert_eq!(h.booking_notifications.load(Ordering::SeqCst), 0);

    let token = sign_in(&h.app, ADMIN_EMAIL).await;
    let (status, json) = send(&h.app, "GET", "/api/admin/contact-messages", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["email"], "tom@example.com");
}

#[tokio::test]
async fn test_contact_form_survives_notification_failure() {
    let h = harness(Options {
        notify_fails: true,
        ..Default::default()
    });

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/contact",
        None,
        Some(json!({ "name": "Tom", "email": "tom@example.com", "message": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(h.contact_notifications.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_contact_form_validation() {
    let h = harness(Options::default());
    let (status, _) = send(
        &h.app,
        "POST",
        "/api/contact",
        None,
        Some(json!({ "name": "Tom", "email": "not-an-email", "message": "Hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.contact_notifications.load(Ordering::SeqCst), 0);
}

// ── Auth ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let h = harness(Options::default());

    let (status, _) = send(&h.app, "GET", "/api/admin/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&h.app, "GET", "/api/admin/bookings", Some("forged.123.sig"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = sign_in(&h.app, EDITOR_EMAIL).await;
    let (status, _) = send(&h.app, "GET", "/api/admin/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_sign_in_session_and_sign_out() {
    let h = harness(Options::default());

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/auth/sign-in",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, json) = send(&h.app, "GET", "/api/auth/session", None, None).await;
    assert_eq!(json["user"], Value::Null);
    assert_eq!(json["loading"], false);

    let token = sign_in(&h.app, ADMIN_EMAIL).await;
    let (_, json) = send(&h.app, "GET", "/api/auth/session", Some(&token), None).await;
    assert_eq!(json["user"]["email"], ADMIN_EMAIL);
    assert_eq!(json["user"]["role"], "admin");

    send(&h.app, "POST", "/api/auth/sign-out", Some(&token), None).await;
    let (_, json) = send(&h.app, "GET", "/api/auth/session", Some(&token), None).await;
    assert_eq!(json["user"], Value::Null);
    assert_eq!(json["error"], "signed out");

    let (status, _) = send(&h.app, "GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Admin CRUD ──

#[tokio::test]
async fn test_blog_publishing() {
    let h = harness(Options::default());
    let token = sign_in(&h.app, ADMIN_EMAIL).await;

    let (status, draft) = send(
        &h.app,
        "POST",
        "/api/admin/blog",
        Some(&token),
        Some(json!({ "title": "Automating Invoices with n8n", "content": "..." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(draft["slug"], "automating-invoices-with-n8n");
    assert_eq!(draft["published_at"], Value::Null);

    let (_, public) = send(&h.app, "GET", "/api/blog", None, None).await;
    assert!(public.as_array().unwrap().is_empty());
    let (status, _) = send(&h.app, "GET", "/api/blog/automating-invoices-with-n8n", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = draft["id"].as_str().unwrap();
    let (status, published) = send(
        &h.app,
        "PUT",
        &format!("/api/admin/blog/{id}"),
        Some(&token),
        Some(json!({ "title": "Automating Invoices with n8n", "content": "Full text", "published": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(published["published_at"].is_string());

    let (status, post) = send(&h.app, "GET", "/api/blog/automating-invoices-with-n8n", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["content"], "Full text");

    // Same title, same slug
    let (status, _) = send(
        &h.app,
        "POST",
        "/api/admin/blog",
        Some(&token),
        Some(json!({ "title": "Automating invoices with n8n!", "content": "dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&h.app, "DELETE", &format!("/api/admin/blog/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&h.app, "DELETE", &format!("/api/admin/blog/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_management() {
    let h = harness(Options::default());
    let token = sign_in(&h.app, ADMIN_EMAIL).await;

    let (status, user) = send(
        &h.app,
        "POST",
        "/api/admin/users",
        Some(&token),
        Some(json!({ "email": "writer@example.com", "password": "long-enough-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "editor");
    assert!(user.get("password_hash").is_none());

    let id = user["id"].as_str().unwrap();
    let (_, user) = send(
        &h.app,
        "PUT",
        &format!("/api/admin/users/{id}"),
        Some(&token),
        Some(json!({ "role": "admin", "full_name": "Wendy Writer" })),
    )
    .await;
    assert_eq!(user["role"], "admin");
    assert_eq!(user["full_name"], "Wendy Writer");

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/admin/users",
        Some(&token),
        Some(json!({ "email": "WRITER@example.com", "password": "long-enough-pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&h.app, "DELETE", "/api/admin/users/admin-1", Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&h.app, "DELETE", &format!("/api/admin/users/{id}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, users) = send(&h.app, "GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_portfolio_filtering() {
    let h = harness(Options::default());
    let token = sign_in(&h.app, ADMIN_EMAIL).await;

    let (_, category) = send(
        &h.app,
        "POST",
        "/api/admin/project-categories",
        Some(&token),
        Some(json!({ "name": "CRM Integrations" })),
    )
    .await;
    assert_eq!(category["slug"], "crm-integrations");
    let category_id = category["id"].as_str().unwrap();

    send(
        &h.app,
        "POST",
        "/api/admin/projects",
        Some(&token),
        Some(json!({ "title": "HubSpot sync", "category_id": category_id, "featured": true })),
    )
    .await;
    send(
        &h.app,
        "POST",
        "/api/admin/projects",
        Some(&token),
        Some(json!({ "title": "Slack bot" })),
    )
    .await;

    let (_, all) = send(&h.app, "GET", "/api/projects", None, None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["title"], "HubSpot sync");

    let (_, crm) = send(&h.app, "GET", "/api/projects?category=crm-integrations", None, None).await;
    assert_eq!(crm.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/admin/projects",
        Some(&token),
        Some(json!({ "title": "Orphan", "category_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, clients) = send(
        &h.app,
        "POST",
        "/api/admin/clients",
        Some(&token),
        Some(json!({ "name": "Acme", "website": "https://acme.test" })),
    )
    .await;
    assert_eq!(clients["name"], "Acme");
    let (_, listed) = send(&h.app, "GET", "/api/clients", None, None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_booking_admin_flow() {
    let h = harness(Options {
        store: None,
        ..Default::default()
    });

    let id = session_ready_to_submit(&h.app).await;
    let (status, json) = send(&h.app, "POST", &format!("/api/booking/sessions/{id}/submit"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let booking_id = json["booking"]["id"].as_str().unwrap().to_string();

    let token = sign_in(&h.app, ADMIN_EMAIL).await;
    let (_, pending) = send(&h.app, "GET", "/api/admin/bookings?status=pending", Some(&token), None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &h.app,
        "PUT",
        &format!("/api/admin/bookings/{booking_id}/status"),
        Some(&token),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "confirmed");

    let (_, pending) = send(&h.app, "GET", "/api/admin/bookings?status=pending", Some(&token), None).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (status, _) = send(
        &h.app,
        "PUT",
        &format!("/api/admin/bookings/{booking_id}/status"),
        Some(&token),
        Some(json!({ "status": "archived" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_consultant_settings_update() {
    let h = harness(Options {
        store: None,
        ..Default::default()
    });

    let (_, json) = send(&h.app, "GET", "/api/consultant", None, None).await;
    assert_eq!(json["consultant_name"], "Consultant");

    let token = sign_in(&h.app, ADMIN_EMAIL).await;
    let (status, _) = send(
        &h.app,
        "PUT",
        "/api/admin/consultant",
        Some(&token),
        Some(json!({
            "consultant_name": "Ana",
            "working_hours": { "start": "10:00", "end": "12:00", "days": [1, 3] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&h.app, "GET", "/api/consultant", None, None).await;
    assert_eq!(json["consultant_name"], "Ana");
    let (_, json) = send(&h.app, "GET", "/api/booking/slots", None, None).await;
    assert_eq!(json["slots"], json!(["10:00", "10:30", "11:00", "11:30"]));

    let (status, _) = send(
        &h.app,
        "PUT",
        "/api/admin/consultant",
        Some(&token),
        Some(json!({
            "consultant_name": "Ana",
            "working_hours": { "start": "12:00", "end": "12:00" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload() {
    let h = harness(Options::default());
    let token = sign_in(&h.app, ADMIN_EMAIL).await;

    let (status, json) = send(
        &h.app,
        "POST",
        "/api/admin/uploads",
        Some(&token),
        Some(json!({ "bucket": "logos", "file_name": "acme.png", "content_base64": "aGVsbG8=" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["public_url"], "http://localhost:3000/uploads/logos/acme.png");
    assert_eq!(h.uploads.lock().unwrap()[0].2, b"hello");

    let (status, _) = send(
        &h.app,
        "POST",
        "/api/admin/uploads",
        Some(&token),
        Some(json!({ "bucket": "logos", "file_name": "x.png", "content_base64": "%%%" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(h.uploads.lock().unwrap().len(), 1);
}
