use chrono::NaiveDate;
use thiserror::Error;

use crate::step::Step;

/// Failure talking to one of the backend collaborators.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    /// The backend answered, but said no (e.g. a custom time outside working hours).
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Human-readable text for the user: the backend's own message when it sent one.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BackendError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            BackendError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// An action the wizard refused. Hosts should not have offered it.
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("step {0} is not reachable yet")]
    StepLocked(Step),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("unknown specialist: {0}")]
    UnknownSpecialist(String),

    #[error("specialist {0} does not offer the selected service")]
    SpecialistNotOffered(String),

    #[error("select a service first")]
    ServiceRequired,

    #[error("{0} is not a bookable date")]
    DateUnavailable(NaiveDate),

    #[error("no slot starts at {0}")]
    UnknownSlot(String),

    #[error("this business does not accept custom times")]
    CustomTimesDisabled,

    #[error("booking selection is incomplete")]
    IncompleteSelection,

    #[error("the booking has already been confirmed")]
    Finished,

    #[error("wait for the current request to finish")]
    Busy,

    #[error(transparent)]
    Backend(#[from] BackendError),
}
