use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{AvailabilityQuery, CustomTimeRequest, TimeSlot};

pub const NO_SLOTS_MESSAGE: &str = "No time slots available for this date. Please try another date.";
pub const SLOTS_FALLBACK_ERROR: &str = "Failed to load available slots";
pub const CUSTOM_TIME_FALLBACK_ERROR: &str = "This time is not available";

/// Slot list for the current (specialist, service, date) triple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum SlotsState {
    /// Triple incomplete; nothing to show.
    #[default]
    Idle,
    Loading,
    /// The backend has no slots for that day.
    Empty,
    /// The fetch failed; carries the user-facing reason.
    Failed(String),
    Loaded(Vec<TimeSlot>),
}

impl SlotsState {
    pub fn slots(&self) -> &[TimeSlot] {
        match self {
            SlotsState::Loaded(slots) => slots,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SlotsState::Loading)
    }

    /// The single non-fatal banner shown for both "nothing" and "failed".
    pub fn banner(&self) -> Option<&str> {
        match self {
            SlotsState::Empty => Some(NO_SLOTS_MESSAGE),
            SlotsState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn from_slots(slots: Vec<TimeSlot>) -> Self {
        if slots.is_empty() {
            SlotsState::Empty
        } else {
            SlotsState::Loaded(slots)
        }
    }
}

/// The (specialist, service, date) triple everything on step 3 is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotKey {
    pub specialist_id: String,
    pub service_id: String,
    pub date: NaiveDate,
}

/// A slot fetch tagged with the selection generation it was issued for.
/// Results from older generations are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    pub generation: u64,
    pub key: SlotKey,
}

impl SlotRequest {
    pub fn query(&self) -> AvailabilityQuery {
        AvailabilityQuery {
            specialist_id: self.key.specialist_id.clone(),
            service_id: self.key.service_id.clone(),
            date: self.key.date,
        }
    }
}

/// A custom-time check, tagged like [`SlotRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCheck {
    pub generation: u64,
    pub key: SlotKey,
    pub start_time: String,
}

impl TimeCheck {
    pub fn request(&self) -> CustomTimeRequest {
        CustomTimeRequest {
            specialist_id: self.key.specialist_id.clone(),
            service_id: self.key.service_id.clone(),
            booking_date: self.key.date,
            custom_start_time: self.start_time.clone(),
        }
    }
}
