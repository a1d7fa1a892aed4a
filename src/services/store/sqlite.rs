use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use super::BookingStore;
use crate::db::{self, queries};
use crate::models::{Booking, ConsultantSettings, NewBooking};

pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<Booking> {
        let conn = db::lock(&self.db)?;
        queries::insert_booking(&conn, booking)
    }

    async fn consultant_settings(&self) -> anyhow::Result<Option<ConsultantSettings>> {
        let conn = db::lock(&self.db)?;
        queries::get_consultant_settings(&conn)
    }
}
