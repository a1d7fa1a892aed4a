use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::models::WorkingHours;

/// Half-hour slots for one day of `hours`: `"HH:00"` and `"HH:30"` for every
/// whole hour in `[start, end)`. The minute part of `start` and `end` is
/// ignored, so `09:30`-`17:00` still starts at `09:00`.
pub fn generate_time_slots(hours: Option<&WorkingHours>) -> Vec<String> {
    let Some(hours) = hours else {
        return Vec::new();
    };
    let (Some(start), Some(end)) = (parse_hour(&hours.start), parse_hour(&hours.end)) else {
        tracing::warn!(start = %hours.start, end = %hours.end, "unparseable working hours");
        return Vec::new();
    };

    (start..end)
        .flat_map(|h| [format!("{h:02}:00"), format!("{h:02}:30")])
        .collect()
}

fn parse_hour(s: &str) -> Option<u32> {
    let (hour, _) = s.split_once(':')?;
    hour.trim().parse().ok().filter(|h| *h <= 24)
}

pub fn local_today(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

/// Time of day is not considered: today is always selectable.
pub fn is_date_disabled(date: NaiveDate, today: NaiveDate) -> bool {
    date < today
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("invalid month: {year}-{month0}")]
pub struct InvalidMonth {
    pub year: i32,
    pub month0: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub disabled: bool,
    pub working_day: bool,
}

/// One calendar month. `month0` is zero-based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthView {
    pub year: i32,
    pub month0: u32,
    first: NaiveDate,
}

impl MonthView {
    pub fn new(year: i32, month0: u32) -> Result<Self, InvalidMonth> {
        let first = NaiveDate::from_ymd_opt(year, month0.saturating_add(1), 1).ok_or(InvalidMonth { year, month0 })?;
        Ok(Self { year, month0, first })
    }

    pub fn days_in_month(&self) -> u32 {
        let next = if self.month0 == 11 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month0 + 2, 1)
        };
        next.map(|n| n.signed_duration_since(self.first).num_days() as u32)
            .unwrap_or(31)
    }

    /// Weekday of the 1st, 0 = Sunday.
    pub fn first_day_of_week(&self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    pub fn days(&self, today: NaiveDate, hours: &WorkingHours) -> Vec<CalendarDay> {
        self.first
            .iter_days()
            .take(self.days_in_month() as usize)
            .map(|date| CalendarDay {
                date,
                disabled: is_date_disabled(date, today),
                working_day: hours.is_working_day(date.weekday().num_days_from_sunday()),
            })
            .collect()
    }
}
