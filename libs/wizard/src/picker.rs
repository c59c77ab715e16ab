//! Hour/minute scroll pickers for custom times.
//!
//! Each field holds either nothing or a value in `0..len`, and stepping past
//! either end wraps around instead of clamping.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerField {
    len: u8,
    value: Option<u8>,
}

impl PickerField {
    pub const fn hours() -> Self {
        Self {
            len: 24,
            value: None,
        }
    }

    pub const fn minutes() -> Self {
        Self {
            len: 60,
            value: None,
        }
    }

    pub fn value(&self) -> Option<u8> {
        self.value
    }

    pub fn positions(&self) -> u8 {
        self.len
    }

    /// Move by `delta` positions. An empty field counts as 0.
    pub fn step(&mut self, delta: i8) {
        let len = i16::from(self.len);
        let current = i16::from(self.value.unwrap_or(0));
        let next = (current + i16::from(delta)).rem_euclid(len);
        self.value = u8::try_from(next).ok();
    }

    /// Jump straight to `v`. Out-of-range values are refused.
    pub fn set(&mut self, v: u8) -> bool {
        if v < self.len {
            self.value = Some(v);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Two-digit zero-padded text, or empty when unset.
    pub fn padded(&self) -> String {
        self.value.map(|v| format!("{v:02}")).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePicker {
    pub hour: PickerField,
    pub minute: PickerField,
}

impl Default for TimePicker {
    fn default() -> Self {
        Self {
            hour: PickerField::hours(),
            minute: PickerField::minutes(),
        }
    }
}

impl TimePicker {
    /// Copy "HH:MM" into both fields; leaves the picker untouched if it does not parse.
    pub fn seed_from(&mut self, time: &str) -> bool {
        let Some((h, m)) = time.split_once(':') else {
            return false;
        };
        let (Ok(h), Ok(m)) = (h.trim().parse::<u8>(), m.trim().parse::<u8>()) else {
            return false;
        };
        let mut next = *self;
        if next.hour.set(h) && next.minute.set(m) {
            *self = next;
            true
        } else {
            false
        }
    }

    /// "HH:MM" once both fields are chosen.
    pub fn time(&self) -> Option<String> {
        match (self.hour.value(), self.minute.value()) {
            (Some(h), Some(m)) => Some(format!("{h:02}:{m:02}")),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.hour.clear();
        self.minute.clear();
    }

    pub fn snapshot(&self) -> PickerSnapshot {
        PickerSnapshot {
            hour: self.hour.padded(),
            minute: self.minute.padded(),
            display: self.time().unwrap_or_else(|| "--:--".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerSnapshot {
    pub hour: String,
    pub minute: String,
    pub display: String,
}
