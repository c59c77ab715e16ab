//! Read-only snapshot of a session, shaped for rendering.

use chrono::NaiveDate;
use serde::Serialize;

use crate::availability::SlotsState;
use crate::calendar::{calendar_view, working_hours_label, CalendarView};
use crate::catalog::{visible_specialists, NO_SPECIALISTS_MESSAGE};
use crate::models::{Confirmation, CustomerInfo, Price, TimeSlot};
use crate::picker::PickerSnapshot;
use crate::session::{Busy, WizardSession};
use crate::step::Step;
use crate::validation::InfoErrors;
use crate::verification::VerificationSnapshot;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub step: Step,
    pub steps: Vec<StepTab>,
    pub business: BusinessSummary,

    pub services: Vec<ServiceCard>,
    pub specialists: Vec<SpecialistCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialists_message: Option<String>,

    pub calendar: CalendarView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<String>,
    pub slots: SlotsState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots_banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_time: Option<TimeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_time: Option<CustomTimeView>,

    pub customer: CustomerInfo,
    pub info_errors: InfoErrors,
    pub verification: VerificationSnapshot,

    pub can_next: bool,
    pub can_back: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub busy: Option<Busy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<Confirmation>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepTab {
    pub number: u8,
    pub label: &'static str,
    pub short_label: &'static str,
    pub active: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCard {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistCard {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTimeView {
    pub picker: PickerSnapshot,
    pub can_set: bool,
    pub validating: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&WizardSession> for WizardView {
    fn from(s: &WizardSession) -> Self {
        let business = s.business();
        let service = s.service();
        let specialist_id = s.specialist().map(|sp| sp.id.as_str());
        let hours = business.working_hours.as_deref();

        let steps = Step::ALL
            .into_iter()
            .map(|step| StepTab {
                number: step.number(),
                label: step.label(),
                short_label: step.short_label(),
                active: step == s.step(),
                enabled: s.can_enter(step),
            })
            .collect();

        let services = business
            .services
            .iter()
            .map(|svc| ServiceCard {
                id: svc.id.clone(),
                name: svc.name.clone(),
                description: svc.description.clone(),
                duration: svc.duration,
                price: svc.price.clone(),
                selected: service.is_some_and(|sel| sel.id == svc.id),
            })
            .collect();

        let visible = visible_specialists(&business.specialists, service);
        let specialists_message = (service.is_some() && visible.is_empty())
            .then(|| NO_SPECIALISTS_MESSAGE.to_string());
        let specialists = visible
            .into_iter()
            .map(|sp| SpecialistCard {
                id: sp.id.clone(),
                name: sp.name.clone(),
                title: sp.title.clone(),
                selected: specialist_id == Some(sp.id.as_str()),
            })
            .collect();

        let working_hours = match (s.date(), hours) {
            (Some(date), Some(hours)) => Some(working_hours_label(date, hours)),
            _ => None,
        };

        let busy = s.busy();
        let custom_time = s.allows_custom_times().then(|| CustomTimeView {
            picker: s.picker().snapshot(),
            can_set: s.picker().time().is_some() && s.date().is_some() && !s.slots().is_loading(),
            validating: busy == Some(Busy::ValidatingTime),
            error: s.custom_time_error().map(str::to_string),
        });

        WizardView {
            step: s.step(),
            steps,
            business: BusinessSummary {
                name: business.business_name.clone(),
                address: business.address_line(),
                phone: business.phone.clone(),
            },
            services,
            specialists,
            specialists_message,
            calendar: calendar_view(s.calendar(), s.today(), hours, s.date()),
            selected_date: s.date(),
            working_hours,
            slots: s.slots().clone(),
            slots_banner: s.slots().banner().map(str::to_string),
            selected_time: s.time().cloned(),
            custom_time,
            customer: s.customer().clone(),
            info_errors: s.info_errors().clone(),
            verification: s.verification().snapshot(),
            can_next: s.can_advance(),
            can_back: s.step().prev().is_some(),
            busy,
            submit_error: s.submit_error().map(str::to_string),
            confirmation: s.confirmation().cloned(),
        }
    }
}
