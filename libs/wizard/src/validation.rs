use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::CustomerInfo;

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Per-field messages for the contact form; `None` means the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl InfoErrors {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// Check the contact fields locally before any code is sent.
pub fn validate_customer(info: &CustomerInfo) -> InfoErrors {
    let mut errors = InfoErrors::default();
    if info.full_name.trim().is_empty() {
        errors.full_name = Some("Full name is required".into());
    }
    if !is_valid_email(&info.email) {
        errors.email = Some("Enter a valid email address".into());
    }
    if !is_valid_phone(&info.phone) {
        errors.phone = Some(format!(
            "Enter a valid phone number ({PHONE_MIN_DIGITS}-{PHONE_MAX_DIGITS} digits)"
        ));
    }
    errors
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 8 to 15 digits once everything else is stripped.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits)
}

/// Normalise typed input to `+<digits>`. Empty input stays empty.
pub fn format_phone(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    format!("+{digits}")
}

/// Keep digits only, at most `max_len` of them.
pub fn sanitize_code(input: &str, max_len: usize) -> String {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .take(max_len)
        .collect()
}

/// First word is the first name; the rest (or the first word again) is the last name.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = words.collect();
    let last = if rest.is_empty() {
        first.clone()
    } else {
        rest.join(" ")
    };
    (first, last)
}
