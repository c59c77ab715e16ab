use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::BackendError;
use crate::validation::sanitize_code;

pub const CODE_LENGTH: usize = 4;
pub const DEMO_CODE: &str = "0000";
pub const SEND_FALLBACK_ERROR: &str = "Failed to send verification code";

const INCOMPLETE_CODE: &str = "Please enter the 4-digit code.";
const WRONG_CODE: &str = "Invalid code. Please try again.";

/// Issues confirmation codes to a phone number.
#[async_trait]
pub trait CodeSender: Send + Sync {
    /// Returns the code that was issued.
    async fn send_code(&self, phone: &str) -> Result<String, BackendError>;
}

/// Stand-in for SMS delivery: waits a moment, then hands out a fixed code.
#[derive(Debug, Clone)]
pub struct DemoCodeSender {
    code: String,
    delay: Duration,
}

impl DemoCodeSender {
    pub fn new(code: impl Into<String>, delay: Duration) -> Self {
        Self {
            code: code.into(),
            delay,
        }
    }
}

impl Default for DemoCodeSender {
    fn default() -> Self {
        Self::new(DEMO_CODE, Duration::from_millis(1500))
    }
}

#[async_trait]
impl CodeSender for DemoCodeSender {
    async fn send_code(&self, phone: &str) -> Result<String, BackendError> {
        tokio::time::sleep(self.delay).await;
        tracing::info!("Demo verification code issued for {}", mask_phone(phone));
        Ok(self.code.clone())
    }
}

/// `+155***4567`-style masking for logs.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() <= 8 {
        return "***".into();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

/// Phone confirmation state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verification {
    sent_code: Option<String>,
    entered_code: String,
    error: Option<String>,
}

impl Verification {
    pub fn is_issued(&self) -> bool {
        self.sent_code.is_some()
    }

    pub fn entered_code(&self) -> &str {
        &self.entered_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn issue(&mut self, code: String) {
        self.sent_code = Some(code);
        self.entered_code.clear();
        self.error = None;
    }

    /// "Resend": forget the issued code and everything typed against it.
    pub fn discard(&mut self) {
        *self = Self::default();
    }

    pub fn enter(&mut self, raw: &str) {
        self.entered_code = sanitize_code(raw, CODE_LENGTH);
        self.error = None;
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Compare the typed code with the issued one. On mismatch the typed code is cleared.
    pub fn check(&mut self) -> bool {
        if self.entered_code.len() != CODE_LENGTH {
            self.error = Some(INCOMPLETE_CODE.into());
            return false;
        }
        match &self.sent_code {
            Some(sent) if *sent == self.entered_code => {
                self.error = None;
                true
            }
            _ => {
                self.entered_code.clear();
                self.error = Some(WRONG_CODE.into());
                false
            }
        }
    }

    pub fn snapshot(&self) -> VerificationSnapshot {
        VerificationSnapshot {
            code_sent: self.is_issued(),
            entered_code: self.entered_code.clone(),
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSnapshot {
    pub code_sent: bool,
    pub entered_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
