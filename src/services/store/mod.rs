pub mod sqlite;
pub mod supabase;

use async_trait::async_trait;

use crate::models::{Booking, ConsultantSettings, NewBooking};

/// The row store bookings are written to and consultant settings read from.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Writes one booking. Implementations deduplicate on `request_id`.
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<Booking>;

    /// `Ok(None)` when no settings row exists.
    async fn consultant_settings(&self) -> anyhow::Result<Option<ConsultantSettings>>;
}
