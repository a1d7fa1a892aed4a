use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::db::{self, queries};
use crate::errors::AppError;
use crate::models::{
    Booking, BookingContact, BookingWizard, ConsultantSettings, ContactPatch, WizardStep,
    WorkingHours,
};
use crate::services::booking::{self, SubmitError, SUBMIT_FAILED_MESSAGE};
use crate::services::slots::{self, CalendarDay, MonthView};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    id: String,
    step: WizardStep,
    date: Option<NaiveDate>,
    time: Option<String>,
    contact: BookingContact,
    can_submit: bool,
    last_error: Option<String>,
}

impl SessionResponse {
    fn new(id: &str, wizard: &BookingWizard) -> Self {
        Self {
            id: id.to_string(),
            step: wizard.step(),
            date: wizard.date(),
            time: wizard.time().map(str::to_string),
            contact: wizard.contact().clone(),
            can_submit: wizard.can_submit(),
            last_error: wizard.last_error().map(str::to_string),
        }
    }
}

fn load_session(conn: &rusqlite::Connection, id: &str) -> Result<BookingWizard, AppError> {
    queries::get_wizard_session(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking session {id}")))
}

/// Loads a session, applies `f`, and saves it back with a fresh expiry.
fn update_session<F>(state: &AppState, id: &str, f: F) -> Result<Json<SessionResponse>, AppError>
where
    F: FnOnce(&mut BookingWizard) -> Result<(), AppError>,
{
    let conn = db::lock(&state.db)?;
    let mut wizard = load_session(&conn, id)?;
    f(&mut wizard)?;
    queries::save_wizard_session(&conn, id, &wizard, state.config.session_ttl_minutes)?;
    Ok(Json(SessionResponse::new(id, &wizard)))
}

// GET /api/consultant
pub async fn get_consultant(State(state): State<Arc<AppState>>) -> Json<ConsultantSettings> {
    Json(booking::load_consultant_settings(state.store.as_ref()).await)
}

// GET /api/booking/slots
#[derive(Serialize)]
pub struct SlotsResponse {
    working_hours: WorkingHours,
    slots: Vec<String>,
}

pub async fn get_slots(State(state): State<Arc<AppState>>) -> Json<SlotsResponse> {
    let settings = booking::load_consultant_settings(state.store.as_ref()).await;
    Json(SlotsResponse {
        slots: slots::generate_time_slots(Some(&settings.working_hours)),
        working_hours: settings.working_hours,
    })
}

// GET /api/booking/calendar?year=&month=
#[derive(Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    /// Zero-based, 0 = January.
    pub month: Option<u32>,
}

#[derive(Serialize)]
pub struct CalendarResponse {
    year: i32,
    month: u32,
    days_in_month: u32,
    first_day_of_week: u32,
    days: Vec<CalendarDay>,
}

pub async fn get_calendar(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let today = slots::local_today(state.config.local_offset());
    let view = MonthView::new(
        query.year.unwrap_or(today.year()),
        query.month.unwrap_or(today.month0()),
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let settings = booking::load_consultant_settings(state.store.as_ref()).await;

    Ok(Json(CalendarResponse {
        year: view.year,
        month: view.month0,
        days_in_month: view.days_in_month(),
        first_day_of_week: view.first_day_of_week(),
        days: view.days(today, &settings.working_hours),
    }))
}

// POST /api/booking/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let id = uuid::Uuid::new_v4().to_string();
    let wizard = BookingWizard::new();
    {
        let conn = db::lock(&state.db)?;
        queries::save_wizard_session(&conn, &id, &wizard, state.config.session_ttl_minutes)?;
    }
    tracing::debug!(session_id = %id, "booking session started");
    Ok((StatusCode::CREATED, Json(SessionResponse::new(&id, &wizard))))
}

// GET /api/booking/sessions/:id
// Read-only: polling does not extend the session.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let conn = db::lock(&state.db)?;
    let wizard = load_session(&conn, &id)?;
    Ok(Json(SessionResponse::new(&id, &wizard)))
}

// POST /api/booking/sessions/:id/date
#[derive(Deserialize)]
pub struct SelectDateRequest {
    pub date: NaiveDate,
}

pub async fn select_date(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SelectDateRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let today = slots::local_today(state.config.local_offset());
    update_session(&state, &id, |w| Ok(w.select_date(body.date, today)?))
}

// POST /api/booking/sessions/:id/time
#[derive(Deserialize)]
pub struct SelectTimeRequest {
    pub time: String,
}

pub async fn select_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SelectTimeRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let settings = booking::load_consultant_settings(state.store.as_ref()).await;
    let available = slots::generate_time_slots(Some(&settings.working_hours));
    update_session(&state, &id, |w| Ok(w.select_time(&body.time, &available)?))
}

// POST /api/booking/sessions/:id/proceed
pub async fn proceed(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    update_session(&state, &id, |w| {
        w.proceed();
        Ok(())
    })
}

// POST /api/booking/sessions/:id/back
pub async fn back(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    update_session(&state, &id, |w| {
        w.back();
        Ok(())
    })
}

// PUT /api/booking/sessions/:id/contact
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ContactPatch>,
) -> Result<Json<SessionResponse>, AppError> {
    update_session(&state, &id, |w| Ok(w.update_contact(patch)?))
}

/// Returns the session to the contact step if the submit request is dropped
/// (client gone, request aborted) while delivery is still running.
struct InFlightSubmit<'a> {
    state: &'a AppState,
    id: &'a str,
    wizard: Option<BookingWizard>,
}

impl<'a> InFlightSubmit<'a> {
    fn new(state: &'a AppState, id: &'a str, wizard: &BookingWizard) -> Self {
        Self {
            state,
            id,
            wizard: Some(wizard.clone()),
        }
    }

    fn settled(mut self) {
        self.wizard = None;
    }
}

impl Drop for InFlightSubmit<'_> {
    fn drop(&mut self) {
        let Some(mut wizard) = self.wizard.take() else {
            return;
        };
        wizard.fail_submit(SUBMIT_FAILED_MESSAGE);
        let ttl = self.state.config.session_ttl_minutes;
        let result = db::lock(&self.state.db)
            .and_then(|conn| queries::save_wizard_session(&conn, self.id, &wizard, ttl));
        match result {
            Ok(()) => tracing::warn!(session_id = %self.id, "submit abandoned mid-flight, session reopened"),
            Err(e) => tracing::error!(session_id = %self.id, error = %e, "failed to reopen abandoned submit"),
        }
    }
}

// POST /api/booking/sessions/:id/submit
#[derive(Serialize)]
pub struct SubmitResponse {
    booking: Booking,
    session: SessionResponse,
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, AppError> {
    let ttl = state.config.session_ttl_minutes;

    // Saved as `Submitting` before any network call so a second submit on the
    // same session is rejected while this one is in flight.
    let (mut wizard, draft) = {
        let conn = db::lock(&state.db)?;
        let mut wizard = load_session(&conn, &id)?;
        let draft = wizard.begin_submit(state.config.local_offset())?;
        queries::save_wizard_session(&conn, &id, &wizard, ttl)?;
        (wizard, draft)
    };

    let in_flight = InFlightSubmit::new(&state, &id, &wizard);
    let result = booking::deliver_booking(
        &draft,
        state.store.as_ref(),
        state.booking_notifier.as_ref(),
    )
    .await;
    in_flight.settled();
    booking::finish_submit(&mut wizard, &result);

    {
        let conn = db::lock(&state.db)?;
        queries::save_wizard_session(&conn, &id, &wizard, ttl)?;
    }

    match result {
        Ok(booking) => Ok(Json(SubmitResponse {
            booking,
            session: SessionResponse::new(&id, &wizard),
        })),
        Err(SubmitError::Invalid(e)) => Err(e.into()),
        Err(_) => Err(AppError::Upstream(SUBMIT_FAILED_MESSAGE.to_string())),
    }
}
