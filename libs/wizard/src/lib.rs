//! Multi-step appointment booking wizard.
//!
//! The flow runs service & specialist → date & time → contact info → phone
//! verification, and ends with one booking request to the backend. All rules
//! live in [`WizardSession`]; hosts feed it [`Action`]s and render [`WizardView`]s.

pub mod alerts;
pub mod api;
pub mod availability;
pub mod backend;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod picker;
pub mod session;
pub mod step;
pub mod validation;
pub mod verification;
pub mod view;
pub mod wizard;

pub use api::ApiClient;
pub use backend::{
    AvailabilityProvider, BookingBackend, BookingSubmitter, BusinessDirectory, TimeValidator,
};
pub use config::ApiConfig;
pub use error::{BackendError, WizardError};
pub use session::{Action, CustomerField, Effect, WizardSession};
pub use step::Step;
pub use verification::{CodeSender, DemoCodeSender};
pub use view::WizardView;
pub use wizard::{BookingWizard, EffectRunner, Outcome};
