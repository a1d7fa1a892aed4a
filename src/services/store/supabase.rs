use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use uuid::Uuid;

use super::BookingStore;
use crate::models::{Booking, ConsultantSettings, NewBooking};

/// PostgREST error code for "single row requested, none found".
const NO_ROWS: &str = "PGRST116";

pub struct SupabaseStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

impl SupabaseStore {
    pub fn new(base_url: String, anon_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn booking_by_request_id(&self, request_id: Uuid) -> anyhow::Result<Option<Booking>> {
        let filter = format!("eq.{request_id}");
        let resp = self
            .request(Method::GET, "bookings")
            .query(&[("select", "*"), ("request_id", filter.as_str())])
            .send()
            .await
            .context("failed to query Supabase bookings")?
            .error_for_status()
            .context("Supabase returned error for booking lookup")?;

        let mut rows: Vec<Booking> = resp
            .json()
            .await
            .context("failed to parse Supabase booking lookup")?;
        Ok(rows.pop())
    }
}

#[async_trait]
impl BookingStore for SupabaseStore {
    async fn insert_booking(&self, booking: &NewBooking) -> anyhow::Result<Booking> {
        let resp = self
            .request(Method::POST, "bookings")
            .query(&[("on_conflict", "request_id")])
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .json(&[booking])
            .send()
            .await
            .context("failed to send booking to Supabase")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Supabase insert failed ({status}): {}", describe_error(&body));
        }

        let mut rows: Vec<Booking> = resp
            .json()
            .await
            .context("failed to parse Supabase insert response")?;
        if let Some(row) = rows.pop() {
            return Ok(row);
        }

        // An ignored duplicate comes back as an empty array.
        tracing::info!(request_id = %booking.request_id, "booking already stored, reading it back");
        self.booking_by_request_id(booking.request_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no booking stored for request {}", booking.request_id))
    }

    async fn consultant_settings(&self) -> anyhow::Result<Option<ConsultantSettings>> {
        let resp = self
            .request(Method::GET, "consultant_settings")
            .query(&[("select", "consultant_name,photo_url,working_hours"), ("limit", "1")])
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .context("failed to fetch consultant settings")?;

        let status = resp.status();
        if status.is_success() {
            let settings = resp
                .json()
                .await
                .context("failed to parse consultant settings")?;
            return Ok(Some(settings));
        }

        let body = resp.text().await.unwrap_or_default();
        if is_no_rows(&body) {
            return Ok(None);
        }
        anyhow::bail!("consultant settings request failed ({status}): {}", describe_error(&body))
    }
}

fn is_no_rows(body: &str) -> bool {
    serde_json::from_str::<PostgrestError>(body)
        .map(|e| e.code.as_deref() == Some(NO_ROWS))
        .unwrap_or(false)
}

fn describe_error(body: &str) -> String {
    serde_json::from_str::<PostgrestError>(body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string())
}
