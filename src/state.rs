use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::auth::AuthProvider;
use crate::services::notify::Notifier;
use crate::services::storage::ObjectStorage;
use crate::services::store::BookingStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub store: Box<dyn BookingStore>,
    pub booking_notifier: Box<dyn Notifier>,
    pub contact_notifier: Box<dyn Notifier>,
    pub storage: Box<dyn ObjectStorage>,
    pub auth: AuthProvider,
}
