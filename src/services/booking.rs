use chrono::FixedOffset;

use crate::models::{Booking, BookingWizard, ConsultantSettings, NewBooking, WizardError};
use crate::services::notify::{Notification, Notifier};
use crate::services::store::BookingStore;

/// Shown to the visitor for any write or notification failure.
pub const SUBMIT_FAILED_MESSAGE: &str =
    "We couldn't submit your booking. Please try again in a moment.";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] WizardError),

    #[error("failed to store booking: {0}")]
    Write(anyhow::Error),

    /// The booking row exists but staff were not notified.
    #[error("booking stored but notification failed: {source}")]
    Notify {
        booking: Box<Booking>,
        source: anyhow::Error,
    },
}

/// Loads consultant settings. A missing row or a failed read both yield the
/// defaults; the failure is only logged.
pub async fn load_consultant_settings(store: &dyn BookingStore) -> ConsultantSettings {
    match store.consultant_settings().await {
        Ok(Some(settings)) => settings,
        Ok(None) => ConsultantSettings::default(),
        Err(e) => {
            tracing::error!(error = %e, "failed to load consultant settings, using defaults");
            ConsultantSettings::default()
        }
    }
}

/// Writes the booking, then notifies staff. The notification is only sent
/// after a successful write, and a failed notification does not undo it.
pub async fn deliver_booking(
    draft: &NewBooking,
    store: &dyn BookingStore,
    notifier: &dyn Notifier,
) -> Result<Booking, SubmitError> {
    let booking = store
        .insert_booking(draft)
        .await
        .map_err(SubmitError::Write)?;

    tracing::info!(
        booking_id = %booking.id,
        request_id = %draft.request_id,
        preferred_date = %booking.preferred_date,
        "booking stored"
    );

    if let Err(e) = notifier.notify(&Notification::new_booking(&booking)).await {
        tracing::error!(error = %e, booking_id = %booking.id, "booking notification failed");
        return Err(SubmitError::Notify {
            booking: Box::new(booking),
            source: e,
        });
    }

    Ok(booking)
}

/// Runs a full submission against an in-memory wizard: validation, write,
/// notification, and the resulting state transition.
pub async fn submit_booking(
    wizard: &mut BookingWizard,
    store: &dyn BookingStore,
    notifier: &dyn Notifier,
    offset: FixedOffset,
) -> Result<Booking, SubmitError> {
    let draft = wizard.begin_submit(offset)?;
    let result = deliver_booking(&draft, store, notifier).await;
    finish_submit(wizard, &result);
    result
}

/// Applies a delivery result to a wizard in `Submitting`.
pub fn finish_submit(wizard: &mut BookingWizard, result: &Result<Booking, SubmitError>) {
    match result {
        Ok(_) => wizard.complete_submit(),
        Err(_) => wizard.fail_submit(SUBMIT_FAILED_MESSAGE),
    }
}
