use serde::{Deserialize, Serialize};

/// Daily working window, "HH:MM" 24-hour strings. `days` uses 0 = Sunday;
/// an empty list means every day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub days: Vec<u8>,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "17:00".to_string(),
            days: vec![1, 2, 3, 4, 5],
        }
    }
}

impl WorkingHours {
    pub fn is_working_day(&self, weekday_from_sunday: u32) -> bool {
        self.days.is_empty() || self.days.iter().any(|d| u32::from(*d) == weekday_from_sunday)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsultantSettings {
    pub consultant_name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub working_hours: WorkingHours,
}

impl Default for ConsultantSettings {
    fn default() -> Self {
        Self {
            consultant_name: "Consultant".to_string(),
            photo_url: None,
            working_hours: WorkingHours::default(),
        }
    }
}
