//! Drives a [`WizardSession`] against real collaborators.
//!
//! Hosts that serialise access to a session can just call
//! [`BookingWizard::dispatch`]. Hosts that want to release their lock while a
//! request is in flight split it into `apply` → [`EffectRunner::run`] →
//! [`WizardSession::complete`]; results that arrive for an outdated selection
//! are dropped by `complete`.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::backend::{BookingBackend, BusinessDirectory};
use crate::error::{BackendError, WizardError};
use crate::models::{Booking, Confirmation, TimeSlot, ValidatedTime};
use crate::session::{Action, Effect, Submission, WizardSession};
use crate::verification::{mask_phone, CodeSender};
use crate::view::WizardView;

/// What came back from running an [`Effect`].
#[derive(Debug)]
pub enum Outcome {
    Slots {
        generation: u64,
        result: Result<Vec<TimeSlot>, BackendError>,
    },
    Time {
        generation: u64,
        result: Result<ValidatedTime, BackendError>,
    },
    Code(Result<String, BackendError>),
    Booking {
        submission: Box<Submission>,
        result: Result<Booking, BackendError>,
    },
}

/// Executes effects; cheap to clone and holds no session state.
#[derive(Clone)]
pub struct EffectRunner {
    backend: Arc<dyn BookingBackend>,
    codes: Arc<dyn CodeSender>,
}

impl EffectRunner {
    pub fn new(backend: Arc<dyn BookingBackend>, codes: Arc<dyn CodeSender>) -> Self {
        Self { backend, codes }
    }

    pub async fn run(&self, effect: Effect) -> Outcome {
        match effect {
            Effect::FetchSlots(req) => {
                let query = req.query();
                debug!(
                    "Fetching slots for specialist={} service={} date={}",
                    query.specialist_id, query.service_id, query.date
                );
                let result = self.backend.available_slots(&query).await;
                if let Err(e) = &result {
                    warn!("Slot fetch failed: {}", e);
                }
                Outcome::Slots {
                    generation: req.generation,
                    result,
                }
            }
            Effect::ValidateTime(check) => {
                let result = self.backend.validate_custom_time(&check.request()).await;
                if let Err(e) = &result {
                    debug!("Custom time {} refused: {}", check.start_time, e);
                }
                Outcome::Time {
                    generation: check.generation,
                    result,
                }
            }
            Effect::SendCode { phone } => {
                let result = self.codes.send_code(&phone).await;
                if let Err(e) = &result {
                    warn!("Sending code to {} failed: {}", mask_phone(&phone), e);
                }
                Outcome::Code(result)
            }
            Effect::Submit(submission) => {
                let result = self.backend.create_booking(&submission.request).await;
                if let Err(e) = &result {
                    error!("Booking submit failed: {}", e);
                }
                Outcome::Booking { submission, result }
            }
        }
    }
}

impl WizardSession {
    /// Feed an [`Outcome`] back into the session. Returns `false` if it was stale.
    pub fn complete(&mut self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Slots { generation, result } => self.slots_loaded(generation, result),
            Outcome::Time { generation, result } => self.time_checked(generation, result),
            Outcome::Code(result) => {
                self.code_sent(result);
                true
            }
            Outcome::Booking { submission, result } => {
                if let Some(confirmation) = self.booking_submitted(*submission, result) {
                    info!(
                        "Booking {} confirmed for {} at {}",
                        confirmation.booking.id, confirmation.date, confirmation.time.start_time
                    );
                }
                true
            }
        }
    }
}

pub struct BookingWizard {
    session: WizardSession,
    runner: EffectRunner,
}

impl BookingWizard {
    pub fn new(session: WizardSession, runner: EffectRunner) -> Self {
        Self { session, runner }
    }

    /// Look up the business behind `booking_link` and the signed-in user, then start a session.
    pub async fn open(
        directory: &dyn BusinessDirectory,
        booking_link: &str,
        today: NaiveDate,
        runner: EffectRunner,
    ) -> Result<Self, BackendError> {
        let business = directory.business_by_link(booking_link).await?;
        let profile = directory.current_user().await?;
        info!(
            "Wizard opened for {} ({})",
            business.business_name,
            if profile.is_some() { "signed in" } else { "guest" }
        );
        Ok(Self::new(WizardSession::new(business, profile, today), runner))
    }

    pub fn session(&self) -> &WizardSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut WizardSession {
        &mut self.session
    }

    pub fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    pub fn view(&self) -> WizardView {
        WizardView::from(&self.session)
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.session.confirmation()
    }

    /// Apply `action` and wait for whatever remote work it started.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), WizardError> {
        debug!("Wizard action: {:?}", action);
        if let Some(effect) = self.session.apply(action)? {
            let outcome = self.runner.run(effect).await;
            self.session.complete(outcome);
        }
        Ok(())
    }
}
