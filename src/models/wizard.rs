use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::booking::{BookingStatus, NewBooking};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    SelectingDateTime,
    EnteringContactInfo,
    Submitting,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::SelectingDateTime => "selecting_date_time",
            WizardStep::EnteringContactInfo => "entering_contact_info",
            WizardStep::Submitting => "submitting",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingContact {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub company_name: Option<String>,
    pub message: Option<String>,
}

/// Partial update of the contact step. Absent fields are left untouched; an
/// optional field set to an empty string is cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPatch {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub company_name: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("{0} is in the past")]
    DateInPast(NaiveDate),

    #[error("{0} is not an available time slot")]
    UnknownSlot(String),

    #[error("not allowed while {0}")]
    WrongStep(&'static str),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("a date and a time must be selected first")]
    IncompleteSelection,

    #[error("a submission is already in progress")]
    AlreadySubmitting,
}

/// Two-step booking flow: pick a date and slot, then enter contact details.
///
/// `step` is the only state flag. `Submitting` replaces the separate in-flight
/// boolean, so a submission can never be in progress on the first step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingWizard {
    step: WizardStep,
    date: Option<NaiveDate>,
    time: Option<String>,
    contact: BookingContact,
    request_id: Option<Uuid>,
    last_error: Option<String>,
}

impl BookingWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<&str> {
        self.time.as_deref()
    }

    pub fn contact(&self) -> &BookingContact {
        &self.contact
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request_id
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<(), WizardError> {
        self.require(WizardStep::SelectingDateTime)?;
        if date < today {
            return Err(WizardError::DateInPast(date));
        }
        self.date = Some(date);
        Ok(())
    }

    pub fn select_time(&mut self, slot: &str, available: &[String]) -> Result<(), WizardError> {
        self.require(WizardStep::SelectingDateTime)?;
        if !available.iter().any(|s| s == slot) {
            return Err(WizardError::UnknownSlot(slot.to_string()));
        }
        self.time = Some(slot.to_string());
        Ok(())
    }

    /// Moves to the contact step. Returns `false` and changes nothing unless
    /// both a date and a time are selected.
    pub fn proceed(&mut self) -> bool {
        if self.step != WizardStep::SelectingDateTime || self.date.is_none() || self.time.is_none() {
            return false;
        }
        self.step = WizardStep::EnteringContactInfo;
        true
    }

    /// Returns to date selection, keeping the chosen date and time.
    pub fn back(&mut self) -> bool {
        if self.step != WizardStep::EnteringContactInfo {
            return false;
        }
        self.step = WizardStep::SelectingDateTime;
        true
    }

    pub fn update_contact(&mut self, patch: ContactPatch) -> Result<(), WizardError> {
        self.require(WizardStep::EnteringContactInfo)?;
        if let Some(name) = patch.client_name {
            self.contact.client_name = name;
        }
        if let Some(email) = patch.client_email {
            self.contact.client_email = email;
        }
        if let Some(phone) = patch.client_phone {
            self.contact.client_phone = non_empty(phone);
        }
        if let Some(company) = patch.company_name {
            self.contact.company_name = non_empty(company);
        }
        if let Some(message) = patch.message {
            self.contact.message = non_empty(message);
        }
        Ok(())
    }

    pub fn validate_contact(&self) -> Result<(), WizardError> {
        if self.contact.client_name.trim().is_empty() {
            return Err(WizardError::MissingField("client_name"));
        }
        let email = self.contact.client_email.trim();
        if email.is_empty() {
            return Err(WizardError::MissingField("client_email"));
        }
        if !is_plausible_email(email) {
            return Err(WizardError::InvalidEmail);
        }
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.step == WizardStep::EnteringContactInfo && self.validate_contact().is_ok()
    }

    /// Validates the contact step and enters `Submitting`, returning the record
    /// to write. The request id is created once and reused on every retry.
    pub fn begin_submit(&mut self, offset: FixedOffset) -> Result<NewBooking, WizardError> {
        match self.step {
            WizardStep::Submitting => return Err(WizardError::AlreadySubmitting),
            WizardStep::SelectingDateTime => {
                return Err(WizardError::WrongStep(self.step.as_str()))
            }
            WizardStep::EnteringContactInfo => {}
        }
        self.validate_contact()?;

        let (Some(date), Some(time)) = (self.date, self.time.as_deref()) else {
            return Err(WizardError::IncompleteSelection);
        };
        let time = NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| WizardError::UnknownSlot(time.to_string()))?;
        let preferred_date = offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or(WizardError::IncompleteSelection)?;

        let request_id = *self.request_id.get_or_insert_with(Uuid::new_v4);
        self.step = WizardStep::Submitting;
        self.last_error = None;

        Ok(NewBooking {
            request_id,
            client_name: self.contact.client_name.trim().to_string(),
            client_email: self.contact.client_email.trim().to_string(),
            client_phone: self.contact.client_phone.clone(),
            company_name: self.contact.company_name.clone(),
            preferred_date,
            message: self.contact.message.clone(),
            status: BookingStatus::Pending,
        })
    }

    /// Successful submission: every field is cleared and the flow restarts.
    pub fn complete_submit(&mut self) {
        if self.step == WizardStep::Submitting {
            *self = Self::default();
        }
    }

    /// Failed submission: back on the contact step with all input intact.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        if self.step == WizardStep::Submitting {
            self.step = WizardStep::EnteringContactInfo;
            self.last_error = Some(message.into());
        }
    }

    fn require(&self, step: WizardStep) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::WrongStep(self.step.as_str()))
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !email.contains(' ')
        }
        None => false,
    }
}
