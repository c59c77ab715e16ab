//! Wizard state and the reducer that moves it.
//!
//! `WizardSession::apply` never performs I/O. An action that needs the backend
//! returns an [`Effect`]; whoever runs the effect feeds the answer back through
//! the matching `*_loaded` / `*_checked` / `*_sent` / `*_submitted` method.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::availability::{
    SlotKey, SlotRequest, SlotsState, TimeCheck, CUSTOM_TIME_FALLBACK_ERROR, SLOTS_FALLBACK_ERROR,
};
use crate::calendar::{is_bookable_date, MonthCursor};
use crate::catalog::offers;
use crate::error::{BackendError, WizardError};
use crate::models::{
    Booking, BookingCustomer, Business, Confirmation, CreateBookingRequest, CustomerInfo, Service,
    Specialist, TimeSlot, UserProfile, ValidatedTime,
};
use crate::picker::TimePicker;
use crate::step::{can_enter, GateInput, Step};
use crate::validation::{format_phone, split_full_name, validate_customer, InfoErrors};
use crate::verification::{Verification, SEND_FALLBACK_ERROR};

pub const SUBMIT_FALLBACK_ERROR: &str = "Failed to create booking. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerField {
    FullName,
    Email,
    Phone,
    Notes,
}

/// Everything a user can do inside the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Action {
    GoTo { step: Step },
    Next,
    Back,
    SelectService { service_id: String },
    SelectSpecialist { specialist_id: String },
    ShowMonth { delta: i32 },
    SelectDate { date: NaiveDate },
    RetrySlots,
    SelectSlot { start_time: String },
    StepHour { delta: i8 },
    StepMinute { delta: i8 },
    SetHour { hour: u8 },
    SetMinute { minute: u8 },
    SetCustomTime,
    EditCustomer { field: CustomerField, value: String },
    SendCode,
    EnterCode { code: String },
    Confirm,
    Resend,
}

/// Remote work requested by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSlots(SlotRequest),
    ValidateTime(TimeCheck),
    SendCode { phone: String },
    Submit(Box<Submission>),
}

/// A booking request together with the selection it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub request: CreateBookingRequest,
    pub service: Service,
    pub specialist: Specialist,
    pub date: NaiveDate,
    pub time: TimeSlot,
    pub customer_info: CustomerInfo,
}

/// The remote operation currently in flight, if any (slot loading lives in [`SlotsState`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Busy {
    ValidatingTime,
    SendingCode,
    Submitting,
}

#[derive(Debug, Clone)]
pub struct WizardSession {
    business: Business,
    profile: Option<UserProfile>,
    today: NaiveDate,
    step: Step,

    service: Option<Service>,
    specialist: Option<Specialist>,
    date: Option<NaiveDate>,
    time: Option<TimeSlot>,

    slots: SlotsState,
    /// Bumped whenever the (specialist, service, date) triple changes.
    generation: u64,
    calendar: MonthCursor,
    picker: TimePicker,
    custom_time_error: Option<String>,

    customer: CustomerInfo,
    info_errors: InfoErrors,
    verification: Verification,

    busy: Option<Busy>,
    submit_error: Option<String>,
    confirmation: Option<Confirmation>,
}

impl WizardSession {
    /// Fresh session on the service step, contact details seeded from `profile`.
    pub fn new(business: Business, profile: Option<UserProfile>, today: NaiveDate) -> Self {
        let customer = profile
            .as_ref()
            .map(|p| CustomerInfo {
                full_name: p.full_name(),
                email: p.email.clone(),
                phone: p.phone.clone().unwrap_or_default(),
                notes: String::new(),
            })
            .unwrap_or_default();

        Self {
            business,
            profile,
            today,
            step: Step::ServiceAndSpecialist,
            service: None,
            specialist: None,
            date: None,
            time: None,
            slots: SlotsState::Idle,
            generation: 0,
            calendar: MonthCursor::containing(today),
            picker: TimePicker::default(),
            custom_time_error: None,
            customer,
            info_errors: InfoErrors::default(),
            verification: Verification::default(),
            busy: None,
            submit_error: None,
            confirmation: None,
        }
    }

    // ── Accessors ──

    pub fn business(&self) -> &Business {
        &self.business
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn specialist(&self) -> Option<&Specialist> {
        self.specialist.as_ref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn time(&self) -> Option<&TimeSlot> {
        self.time.as_ref()
    }

    pub fn slots(&self) -> &SlotsState {
        &self.slots
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn calendar(&self) -> MonthCursor {
        self.calendar
    }

    pub fn picker(&self) -> &TimePicker {
        &self.picker
    }

    pub fn custom_time_error(&self) -> Option<&str> {
        self.custom_time_error.as_deref()
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn info_errors(&self) -> &InfoErrors {
        &self.info_errors
    }

    pub fn verification(&self) -> &Verification {
        &self.verification
    }

    pub fn busy(&self) -> Option<Busy> {
        self.busy
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn allows_custom_times(&self) -> bool {
        self.business.settings.allow_specific_times
    }

    // ── Gate ──

    pub fn gate_input(&self) -> GateInput {
        GateInput {
            has_service: self.service.is_some(),
            has_specialist: self.specialist.is_some(),
            has_date: self.date.is_some(),
            has_time: self.time.is_some(),
            code_issued: self.verification.is_issued(),
        }
    }

    pub fn can_enter(&self, step: Step) -> bool {
        can_enter(step, self.gate_input())
    }

    /// Whether "Next" is enabled on the current step.
    pub fn can_advance(&self) -> bool {
        self.step.next().is_some_and(|next| self.can_enter(next))
    }

    fn go_to(&mut self, step: Step) -> Result<(), WizardError> {
        if !self.can_enter(step) {
            return Err(WizardError::StepLocked(step));
        }
        self.step = step;
        Ok(())
    }

    // ── Reducer ──

    pub fn apply(&mut self, action: Action) -> Result<Option<Effect>, WizardError> {
        if self.confirmation.is_some() {
            return Err(WizardError::Finished);
        }
        // The code send and the submit resolve against the selection they started with.
        let remote_pending = matches!(self.busy, Some(Busy::SendingCode | Busy::Submitting));
        let harmless = matches!(action, Action::EnterCode { .. } | Action::ShowMonth { .. });
        if remote_pending && !harmless {
            return Err(WizardError::Busy);
        }

        match action {
            Action::GoTo { step } => {
                self.go_to(step)?;
                Ok(None)
            }
            Action::Next => {
                if let Some(next) = self.step.next() {
                    self.go_to(next)?;
                }
                Ok(None)
            }
            Action::Back => {
                if let Some(prev) = self.step.prev() {
                    self.go_to(prev)?;
                }
                Ok(None)
            }
            Action::SelectService { service_id } => self.select_service(&service_id),
            Action::SelectSpecialist { specialist_id } => self.select_specialist(&specialist_id),
            Action::ShowMonth { delta } => {
                self.calendar.shift(delta);
                Ok(None)
            }
            Action::SelectDate { date } => self.select_date(date),
            Action::RetrySlots => Ok(self.selection_changed()),
            Action::SelectSlot { start_time } => self.select_slot(&start_time),
            Action::StepHour { delta } => {
                self.require_custom_times()?;
                self.picker.hour.step(delta);
                Ok(None)
            }
            Action::StepMinute { delta } => {
                self.require_custom_times()?;
                self.picker.minute.step(delta);
                Ok(None)
            }
            Action::SetHour { hour } => {
                self.require_custom_times()?;
                self.picker.hour.set(hour);
                Ok(None)
            }
            Action::SetMinute { minute } => {
                self.require_custom_times()?;
                self.picker.minute.set(minute);
                Ok(None)
            }
            Action::SetCustomTime => self.set_custom_time(),
            Action::EditCustomer { field, value } => {
                self.edit_customer(field, value);
                Ok(None)
            }
            Action::SendCode => self.send_code(),
            Action::EnterCode { code } => {
                self.verification.enter(&code);
                Ok(None)
            }
            Action::Confirm => self.confirm(),
            Action::Resend => {
                if self.step != Step::PhoneVerify && !self.verification.is_issued() {
                    return Err(WizardError::StepLocked(Step::PhoneVerify));
                }
                self.go_to(Step::ContactInfo)?;
                self.verification.discard();
                Ok(None)
            }
        }
    }

    fn select_service(&mut self, service_id: &str) -> Result<Option<Effect>, WizardError> {
        let service = self
            .business
            .service(service_id)
            .cloned()
            .ok_or_else(|| WizardError::UnknownService(service_id.to_string()))?;
        self.service = Some(service);
        self.specialist = None;
        Ok(self.selection_changed())
    }

    fn select_specialist(&mut self, specialist_id: &str) -> Result<Option<Effect>, WizardError> {
        let service_id = self
            .service
            .as_ref()
            .map(|s| s.id.clone())
            .ok_or(WizardError::ServiceRequired)?;
        let specialist = self
            .business
            .specialist(specialist_id)
            .cloned()
            .ok_or_else(|| WizardError::UnknownSpecialist(specialist_id.to_string()))?;
        if !offers(&specialist, &service_id) {
            return Err(WizardError::SpecialistNotOffered(specialist.id));
        }
        self.specialist = Some(specialist);
        // the one automatic transition
        self.step = Step::DateAndTime;
        Ok(self.selection_changed())
    }

    fn select_date(&mut self, date: NaiveDate) -> Result<Option<Effect>, WizardError> {
        let hours = self.business.working_hours.as_deref();
        if !is_bookable_date(date, self.today, hours) {
            return Err(WizardError::DateUnavailable(date));
        }
        self.date = Some(date);
        self.calendar = MonthCursor::containing(date);
        self.picker.clear();
        Ok(self.selection_changed())
    }

    fn slot_key(&self) -> Option<SlotKey> {
        Some(SlotKey {
            specialist_id: self.specialist.as_ref()?.id.clone(),
            service_id: self.service.as_ref()?.id.clone(),
            date: self.date?,
        })
    }

    /// The triple moved: drop everything scoped to the old one and fetch for the new one.
    fn selection_changed(&mut self) -> Option<Effect> {
        self.generation += 1;
        self.time = None;
        self.custom_time_error = None;
        if self.busy == Some(Busy::ValidatingTime) {
            self.busy = None;
        }
        match self.slot_key() {
            Some(key) => {
                self.slots = SlotsState::Loading;
                Some(Effect::FetchSlots(SlotRequest {
                    generation: self.generation,
                    key,
                }))
            }
            None => {
                self.slots = SlotsState::Idle;
                None
            }
        }
    }

    fn select_slot(&mut self, start_time: &str) -> Result<Option<Effect>, WizardError> {
        if self.slots.is_loading() {
            return Ok(None);
        }
        let slot = self
            .slots
            .slots()
            .iter()
            .find(|s| s.start_time == start_time)
            .cloned()
            .ok_or_else(|| WizardError::UnknownSlot(start_time.to_string()))?;
        if !slot.is_available {
            return Ok(None);
        }

        let same_plain_slot = self
            .time
            .as_ref()
            .is_some_and(|t| t.start_time == slot.start_time && !t.is_custom_time);
        if same_plain_slot {
            self.time = None;
        } else {
            self.picker.seed_from(&slot.start_time);
            self.time = Some(TimeSlot {
                is_custom_time: false,
                ..slot
            });
        }
        self.custom_time_error = None;
        Ok(None)
    }

    fn require_custom_times(&self) -> Result<(), WizardError> {
        if self.allows_custom_times() {
            Ok(())
        } else {
            Err(WizardError::CustomTimesDisabled)
        }
    }

    fn set_custom_time(&mut self) -> Result<Option<Effect>, WizardError> {
        self.require_custom_times()?;
        if self.busy == Some(Busy::ValidatingTime) {
            return Ok(None);
        }
        let (Some(key), Some(start_time)) = (self.slot_key(), self.picker.time()) else {
            return Ok(None);
        };
        self.custom_time_error = None;
        self.busy = Some(Busy::ValidatingTime);
        Ok(Some(Effect::ValidateTime(TimeCheck {
            generation: self.generation,
            key,
            start_time,
        })))
    }

    fn edit_customer(&mut self, field: CustomerField, value: String) {
        match field {
            CustomerField::FullName => {
                self.customer.full_name = value;
                self.info_errors.full_name = None;
            }
            CustomerField::Email => {
                self.customer.email = value;
                self.info_errors.email = None;
            }
            CustomerField::Phone => {
                let phone = format_phone(&value);
                if phone != self.customer.phone && self.verification.is_issued() {
                    // the issued code belongs to the old number
                    self.verification.discard();
                    if self.step == Step::PhoneVerify {
                        self.step = Step::ContactInfo;
                    }
                }
                self.customer.phone = phone;
                self.info_errors.phone = None;
            }
            CustomerField::Notes => self.customer.notes = value,
        }
    }

    fn send_code(&mut self) -> Result<Option<Effect>, WizardError> {
        if !self.can_enter(Step::ContactInfo) {
            return Err(WizardError::StepLocked(Step::ContactInfo));
        }
        if self.verification.is_issued() || self.busy == Some(Busy::SendingCode) {
            return Ok(None);
        }
        let errors = validate_customer(&self.customer);
        if !errors.is_empty() {
            self.info_errors = errors;
            return Ok(None);
        }
        self.info_errors = InfoErrors::default();
        self.busy = Some(Busy::SendingCode);
        Ok(Some(Effect::SendCode {
            phone: self.customer.phone.clone(),
        }))
    }

    fn confirm(&mut self) -> Result<Option<Effect>, WizardError> {
        if !self.verification.is_issued() {
            return Err(WizardError::StepLocked(Step::PhoneVerify));
        }
        if self.busy == Some(Busy::Submitting) {
            return Ok(None);
        }
        if !self.verification.check() {
            return Ok(None);
        }
        let submission = self.submission()?;
        self.submit_error = None;
        self.busy = Some(Busy::Submitting);
        Ok(Some(Effect::Submit(Box::new(submission))))
    }

    fn submission(&self) -> Result<Submission, WizardError> {
        let (Some(service), Some(specialist), Some(date), Some(time)) = (
            self.service.as_ref(),
            self.specialist.as_ref(),
            self.date,
            self.time.as_ref(),
        ) else {
            return Err(WizardError::IncompleteSelection);
        };

        let (first_name, last_name) = split_full_name(&self.customer.full_name);
        let request = CreateBookingRequest {
            business_id: self.business.id.clone(),
            service_id: service.id.clone(),
            specialist_id: specialist.id.clone(),
            booking_date: date,
            start_time: time.start_time.clone(),
            customer_info: BookingCustomer {
                first_name,
                last_name,
                email: self.customer.email.clone(),
                phone: self.customer.phone.clone(),
            },
            notes: self.customer.notes.clone(),
            is_guest_booking: self.profile.is_none(),
        };

        Ok(Submission {
            request,
            service: service.clone(),
            specialist: specialist.clone(),
            date,
            time: time.clone(),
            customer_info: self.customer.clone(),
        })
    }

    // ── Remote results ──

    /// Apply a slot fetch result. Returns `false` when it belonged to an older selection.
    pub fn slots_loaded(
        &mut self,
        generation: u64,
        result: Result<Vec<TimeSlot>, BackendError>,
    ) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Dropping stale slots (generation {} < {})",
                generation,
                self.generation
            );
            return false;
        }
        self.slots = match result {
            Ok(slots) => SlotsState::from_slots(slots),
            Err(e) => SlotsState::Failed(e.user_message(SLOTS_FALLBACK_ERROR)),
        };
        true
    }

    /// Apply a custom-time check. A rejection clears the selected time.
    pub fn time_checked(
        &mut self,
        generation: u64,
        result: Result<ValidatedTime, BackendError>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.busy = None;
        match result {
            Ok(validated) => {
                self.time = Some(validated.into());
                self.custom_time_error = None;
            }
            Err(e) => {
                self.custom_time_error = Some(e.user_message(CUSTOM_TIME_FALLBACK_ERROR));
                self.time = None;
            }
        }
        true
    }

    pub fn code_sent(&mut self, result: Result<String, BackendError>) {
        self.busy = None;
        match result {
            Ok(code) => {
                self.verification.issue(code);
                if self.can_enter(Step::ContactInfo) {
                    self.step = Step::PhoneVerify;
                }
            }
            Err(e) => self.verification.fail(e.user_message(SEND_FALLBACK_ERROR)),
        }
    }

    /// Record the submit outcome. On failure the verified state is kept so "Confirm" can be retried.
    pub fn booking_submitted(
        &mut self,
        submission: Submission,
        result: Result<Booking, BackendError>,
    ) -> Option<&Confirmation> {
        self.busy = None;
        match result {
            Ok(booking) => {
                self.submit_error = None;
                self.confirmation = Some(Confirmation {
                    booking,
                    service: submission.service,
                    specialist: submission.specialist,
                    date: submission.date,
                    time: submission.time,
                    customer_info: submission.customer_info,
                });
                self.confirmation.as_ref()
            }
            Err(e) => {
                self.submit_error = Some(e.user_message(SUBMIT_FALLBACK_ERROR));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessSettings, Price};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn today() -> NaiveDate {
        d(2026, 3, 1)
    }

    fn service(id: &str, name: &str) -> Service {
        Service {
            id: id.into(),
            name: name.into(),
            description: None,
            duration: Some(30),
            price: Some(Price {
                amount: 25.0,
                currency: None,
            }),
        }
    }

    fn specialist(id: &str, services: &[&str]) -> Specialist {
        Specialist {
            id: id.into(),
            name: format!("Specialist {id}"),
            title: None,
            services: services.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn business(allow_specific_times: bool) -> Business {
        Business {
            id: "biz1".into(),
            business_name: "Smile Clinic".into(),
            address: None,
            phone: None,
            services: vec![service("svc1", "Haircut"), service("svc2", "Coloring")],
            specialists: vec![
                specialist("sp1", &[]),
                specialist("sp2", &["svc2"]),
            ],
            settings: BusinessSettings {
                allow_specific_times,
            },
            working_hours: None,
        }
    }

    fn slot(start: &str, available: bool) -> TimeSlot {
        TimeSlot {
            start_time: start.into(),
            end_time: None,
            is_available: available,
            is_custom_time: false,
            duration: None,
        }
    }

    fn session() -> WizardSession {
        WizardSession::new(business(true), None, today())
    }

    /// Service + specialist + date chosen, slots loaded.
    fn on_date_step(slots: Vec<TimeSlot>) -> WizardSession {
        let mut s = session();
        s.apply(Action::SelectService {
            service_id: "svc1".into(),
        })
        .unwrap();
        s.apply(Action::SelectSpecialist {
            specialist_id: "sp1".into(),
        })
        .unwrap();
        let effect = s
            .apply(Action::SelectDate {
                date: d(2026, 3, 10),
            })
            .unwrap();
        let Some(Effect::FetchSlots(req)) = effect else {
            panic!("expected a slot fetch, got {effect:?}");
        };
        assert!(s.slots_loaded(req.generation, Ok(slots)));
        s
    }

    fn with_valid_contact(mut s: WizardSession) -> WizardSession {
        for (field, value) in [
            (CustomerField::FullName, "Jane Doe"),
            (CustomerField::Email, "jane@example.com"),
            (CustomerField::Phone, "+1 555 123 4567"),
        ] {
            s.apply(Action::EditCustomer {
                field,
                value: value.into(),
            })
            .unwrap();
        }
        s
    }

    fn verified_session() -> WizardSession {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::Next).unwrap();
        let mut s = with_valid_contact(s);
        let effect = s.apply(Action::SendCode).unwrap();
        assert!(matches!(effect, Some(Effect::SendCode { .. })));
        s.code_sent(Ok("0000".into()));
        s
    }

    // ── lifecycle ──

    #[test]
    fn test_starts_on_service_step() {
        let s = session();
        assert_eq!(s.step(), Step::ServiceAndSpecialist);
        assert_eq!(s.slots(), &SlotsState::Idle);
        assert_eq!(s.customer(), &CustomerInfo::default());
    }

    #[test]
    fn test_profile_prefills_contact() {
        let profile = UserProfile {
            id: "u1".into(),
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            phone: Some("+15551234567".into()),
        };
        let s = WizardSession::new(business(false), Some(profile), today());
        assert_eq!(s.customer().full_name, "Jane Doe");
        assert_eq!(s.customer().phone, "+15551234567");
    }

    // ── gating ──

    #[test]
    fn test_tab_jump_ahead_refused() {
        let mut s = session();
        let err = s.apply(Action::GoTo {
            step: Step::ContactInfo,
        });
        assert!(matches!(err, Err(WizardError::StepLocked(Step::ContactInfo))));
        assert_eq!(s.step(), Step::ServiceAndSpecialist);
    }

    #[test]
    fn test_next_refused_without_specialist() {
        let mut s = session();
        s.apply(Action::SelectService {
            service_id: "svc1".into(),
        })
        .unwrap();
        assert!(!s.can_advance());
        assert!(matches!(
            s.apply(Action::Next),
            Err(WizardError::StepLocked(Step::DateAndTime))
        ));
    }

    #[test]
    fn test_back_to_branch_always_allowed() {
        let mut s = session();
        s.apply(Action::Back).unwrap();
        assert_eq!(s.step(), Step::Branch);
        s.apply(Action::Next).unwrap();
        assert_eq!(s.step(), Step::ServiceAndSpecialist);
    }

    #[test]
    fn test_tab_jump_back_from_date_step() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::GoTo {
            step: Step::ServiceAndSpecialist,
        })
        .unwrap();
        assert_eq!(s.step(), Step::ServiceAndSpecialist);
        s.apply(Action::GoTo {
            step: Step::DateAndTime,
        })
        .unwrap();
        assert_eq!(s.step(), Step::DateAndTime);
    }

    // ── service / specialist ──

    #[test]
    fn test_specialist_auto_advances() {
        let mut s = session();
        s.apply(Action::SelectService {
            service_id: "svc1".into(),
        })
        .unwrap();
        s.apply(Action::SelectSpecialist {
            specialist_id: "sp1".into(),
        })
        .unwrap();
        assert_eq!(s.step(), Step::DateAndTime);
    }

    #[test]
    fn test_service_change_clears_specialist() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectService {
            service_id: "svc2".into(),
        })
        .unwrap();
        assert!(s.specialist().is_none());
        assert!(s.time().is_none());
        assert_eq!(s.slots(), &SlotsState::Idle);
    }

    #[test]
    fn test_incompatible_specialist_refused() {
        let mut s = session();
        s.apply(Action::SelectService {
            service_id: "svc1".into(),
        })
        .unwrap();
        let err = s.apply(Action::SelectSpecialist {
            specialist_id: "sp2".into(),
        });
        assert!(matches!(err, Err(WizardError::SpecialistNotOffered(_))));
        assert!(s.specialist().is_none());
    }

    #[test]
    fn test_specialist_needs_service() {
        let mut s = session();
        let err = s.apply(Action::SelectSpecialist {
            specialist_id: "sp1".into(),
        });
        assert!(matches!(err, Err(WizardError::ServiceRequired)));
    }

    #[test]
    fn test_unknown_service_refused() {
        let mut s = session();
        assert!(matches!(
            s.apply(Action::SelectService {
                service_id: "nope".into()
            }),
            Err(WizardError::UnknownService(_))
        ));
    }

    // ── dates and slots ──

    #[test]
    fn test_past_date_refused() {
        let mut s = session();
        let err = s.apply(Action::SelectDate {
            date: d(2026, 2, 27),
        });
        assert!(matches!(err, Err(WizardError::DateUnavailable(_))));
    }

    #[test]
    fn test_date_without_specialist_does_not_fetch() {
        let mut s = session();
        let effect = s
            .apply(Action::SelectDate {
                date: d(2026, 3, 10),
            })
            .unwrap();
        assert!(effect.is_none());
        assert_eq!(s.slots(), &SlotsState::Idle);
    }

    #[test]
    fn test_date_change_clears_time_and_picker() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        assert_eq!(s.picker().time().as_deref(), Some("10:00"));

        let effect = s
            .apply(Action::SelectDate {
                date: d(2026, 3, 11),
            })
            .unwrap();
        assert!(matches!(effect, Some(Effect::FetchSlots(_))));
        assert!(s.time().is_none());
        assert!(s.slots().slots().is_empty());
        assert!(s.slots().is_loading());
        assert_eq!(s.picker().time(), None);
        assert_eq!(s.custom_time_error(), None);
    }

    #[test]
    fn test_stale_slots_dropped() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        let Some(Effect::FetchSlots(first)) = s
            .apply(Action::SelectDate {
                date: d(2026, 3, 11),
            })
            .unwrap()
        else {
            panic!("expected fetch");
        };
        let Some(Effect::FetchSlots(second)) = s
            .apply(Action::SelectDate {
                date: d(2026, 3, 12),
            })
            .unwrap()
        else {
            panic!("expected fetch");
        };

        assert!(!s.slots_loaded(first.generation, Ok(vec![slot("09:00", true)])));
        assert!(s.slots().is_loading());
        assert!(s.slots_loaded(second.generation, Ok(vec![slot("15:00", true)])));
        assert_eq!(s.slots().slots()[0].start_time, "15:00");
    }

    #[test]
    fn test_failed_fetch_is_banner_not_error() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        let Some(Effect::FetchSlots(req)) = s.apply(Action::RetrySlots).unwrap() else {
            panic!("expected fetch");
        };
        s.slots_loaded(
            req.generation,
            Err(BackendError::Api {
                status: 500,
                message: None,
            }),
        );
        assert_eq!(s.slots().banner(), Some(SLOTS_FALLBACK_ERROR));
    }

    #[test]
    fn test_slot_toggle_and_replace() {
        let mut s = on_date_step(vec![slot("10:00", true), slot("10:30", true)]);
        let pick = |s: &mut WizardSession, t: &str| {
            s.apply(Action::SelectSlot {
                start_time: t.into(),
            })
            .unwrap();
        };

        pick(&mut s, "10:00");
        assert_eq!(s.time().map(|t| t.start_time.as_str()), Some("10:00"));
        pick(&mut s, "10:30");
        assert_eq!(s.time().map(|t| t.start_time.as_str()), Some("10:30"));
        pick(&mut s, "10:30");
        assert!(s.time().is_none());
    }

    #[test]
    fn test_unavailable_slot_is_noop() {
        let mut s = on_date_step(vec![slot("10:00", true), slot("11:00", false)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::SelectSlot {
            start_time: "11:00".into(),
        })
        .unwrap();
        assert_eq!(s.time().map(|t| t.start_time.as_str()), Some("10:00"));
    }

    #[test]
    fn test_slot_clicks_ignored_while_loading() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::RetrySlots).unwrap();
        assert!(s
            .apply(Action::SelectSlot {
                start_time: "10:00".into()
            })
            .unwrap()
            .is_none());
        assert!(s.time().is_none());
    }

    // ── custom time ──

    #[test]
    fn test_custom_time_success_supersedes_slot() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::SetHour { hour: 14 }).unwrap();
        s.apply(Action::SetMinute { minute: 15 }).unwrap();
        let Some(Effect::ValidateTime(check)) = s.apply(Action::SetCustomTime).unwrap() else {
            panic!("expected validation");
        };
        assert_eq!(check.start_time, "14:15");
        assert_eq!(s.busy(), Some(Busy::ValidatingTime));

        s.time_checked(
            check.generation,
            Ok(ValidatedTime {
                start_time: "14:15".into(),
                end_time: Some("14:45".into()),
                duration: Some(30),
            }),
        );
        let time = s.time().unwrap();
        assert!(time.is_custom_time);
        assert_eq!(time.end_time.as_deref(), Some("14:45"));
        assert_eq!(s.busy(), None);
    }

    #[test]
    fn test_custom_time_rejection_clears_time() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        let Some(Effect::ValidateTime(check)) = s.apply(Action::SetCustomTime).unwrap() else {
            panic!("expected validation");
        };
        s.time_checked(
            check.generation,
            Err(BackendError::Rejected("Outside working hours".into())),
        );
        assert!(s.time().is_none());
        assert_eq!(s.custom_time_error(), Some("Outside working hours"));
        assert!(!s.can_enter(Step::ContactInfo));
    }

    #[test]
    fn test_plain_slot_after_custom_replaces() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SetHour { hour: 10 }).unwrap();
        s.apply(Action::SetMinute { minute: 0 }).unwrap();
        let Some(Effect::ValidateTime(check)) = s.apply(Action::SetCustomTime).unwrap() else {
            panic!("expected validation");
        };
        s.time_checked(
            check.generation,
            Ok(ValidatedTime {
                start_time: "10:00".into(),
                end_time: None,
                duration: None,
            }),
        );
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        let time = s.time().unwrap();
        assert!(!time.is_custom_time);
    }

    #[test]
    fn test_custom_time_needs_both_fields() {
        let mut s = on_date_step(vec![]);
        s.apply(Action::StepHour { delta: 1 }).unwrap();
        assert!(s.apply(Action::SetCustomTime).unwrap().is_none());
    }

    #[test]
    fn test_custom_time_disabled_by_business() {
        let mut s = WizardSession::new(business(false), None, today());
        assert!(matches!(
            s.apply(Action::StepHour { delta: 1 }),
            Err(WizardError::CustomTimesDisabled)
        ));
        assert!(matches!(
            s.apply(Action::SetCustomTime),
            Err(WizardError::CustomTimesDisabled)
        ));
    }

    #[test]
    fn test_stale_time_check_dropped() {
        let mut s = on_date_step(vec![]);
        s.apply(Action::SetHour { hour: 9 }).unwrap();
        s.apply(Action::SetMinute { minute: 0 }).unwrap();
        let Some(Effect::ValidateTime(check)) = s.apply(Action::SetCustomTime).unwrap() else {
            panic!("expected validation");
        };
        s.apply(Action::SelectDate {
            date: d(2026, 3, 11),
        })
        .unwrap();
        assert!(!s.time_checked(
            check.generation,
            Ok(ValidatedTime {
                start_time: "09:00".into(),
                end_time: None,
                duration: None,
            })
        ));
        assert!(s.time().is_none());
    }

    // ── contact + verification ──

    #[test]
    fn test_send_code_blocked_by_invalid_contact() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::Next).unwrap();
        assert!(s.apply(Action::SendCode).unwrap().is_none());
        assert!(s.info_errors().email.is_some());
        assert_eq!(s.step(), Step::ContactInfo);

        s.apply(Action::EditCustomer {
            field: CustomerField::Email,
            value: "x".into(),
        })
        .unwrap();
        assert!(s.info_errors().email.is_none());
    }

    #[test]
    fn test_send_code_requires_time() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        assert!(matches!(
            s.apply(Action::SendCode),
            Err(WizardError::StepLocked(Step::ContactInfo))
        ));
    }

    #[test]
    fn test_code_sent_moves_to_verify() {
        let s = verified_session();
        assert_eq!(s.step(), Step::PhoneVerify);
        assert!(s.verification().is_issued());
        assert_eq!(s.customer().phone, "+15551234567");
    }

    #[test]
    fn test_send_failure_stays_on_contact() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::Next).unwrap();
        let mut s = with_valid_contact(s);
        s.apply(Action::SendCode).unwrap();
        s.code_sent(Err(BackendError::Decode("boom".into())));
        assert_eq!(s.step(), Step::ContactInfo);
        assert_eq!(s.verification().error(), Some(SEND_FALLBACK_ERROR));
        assert!(!s.can_enter(Step::PhoneVerify));
    }

    #[test]
    fn test_wrong_code_keeps_customer() {
        let mut s = verified_session();
        let before = s.customer().clone();
        s.apply(Action::EnterCode {
            code: "1234".into(),
        })
        .unwrap();
        assert!(s.apply(Action::Confirm).unwrap().is_none());
        assert_eq!(s.customer(), &before);
        assert_eq!(s.verification().entered_code(), "");
        assert!(s.verification().error().is_some());
    }

    #[test]
    fn test_matching_code_submits() {
        let mut s = verified_session();
        s.apply(Action::EnterCode {
            code: "0000".into(),
        })
        .unwrap();
        let Some(Effect::Submit(submission)) = s.apply(Action::Confirm).unwrap() else {
            panic!("expected submit");
        };
        let req = &submission.request;
        assert_eq!(req.service_id, "svc1");
        assert_eq!(req.specialist_id, "sp1");
        assert_eq!(req.start_time, "10:00");
        assert_eq!(req.customer_info.first_name, "Jane");
        assert_eq!(req.customer_info.last_name, "Doe");
        assert!(req.is_guest_booking);
    }

    #[test]
    fn test_resend_returns_to_contact() {
        let mut s = verified_session();
        s.apply(Action::Resend).unwrap();
        assert_eq!(s.step(), Step::ContactInfo);
        assert!(!s.can_enter(Step::PhoneVerify));
    }

    #[test]
    fn test_resend_refused_before_verify() {
        let mut s = session();
        assert!(matches!(
            s.apply(Action::Resend),
            Err(WizardError::StepLocked(Step::PhoneVerify))
        ));
        assert_eq!(s.step(), Step::ServiceAndSpecialist);

        let mut s = on_date_step(vec![slot("10:00", true)]);
        assert!(s.apply(Action::Resend).is_err());
        assert_eq!(s.step(), Step::DateAndTime);
        assert!(!s.can_enter(Step::ContactInfo));
    }

    #[test]
    fn test_selection_locked_while_code_sending() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.apply(Action::SelectSlot {
            start_time: "10:00".into(),
        })
        .unwrap();
        s.apply(Action::Next).unwrap();
        let mut s = with_valid_contact(s);
        assert!(s.apply(Action::SendCode).unwrap().is_some());

        assert!(matches!(
            s.apply(Action::GoTo {
                step: Step::DateAndTime
            }),
            Err(WizardError::Busy)
        ));
        assert!(matches!(
            s.apply(Action::SelectDate {
                date: d(2026, 3, 11)
            }),
            Err(WizardError::Busy)
        ));
        assert!(matches!(
            s.apply(Action::EditCustomer {
                field: CustomerField::Phone,
                value: "+1 555 000 0000".into(),
            }),
            Err(WizardError::Busy)
        ));

        s.code_sent(Ok("0000".into()));
        assert_eq!(s.step(), Step::PhoneVerify);
        s.apply(Action::EnterCode {
            code: "0000".into(),
        })
        .unwrap();
        let Some(Effect::Submit(submission)) = s.apply(Action::Confirm).unwrap() else {
            panic!("expected submit");
        };
        assert_eq!(submission.request.booking_date, d(2026, 3, 10));
        assert_eq!(submission.request.start_time, "10:00");
        assert!(matches!(s.apply(Action::Back), Err(WizardError::Busy)));
    }

    #[test]
    fn test_code_for_incomplete_selection_keeps_step() {
        let mut s = on_date_step(vec![slot("10:00", true)]);
        s.code_sent(Ok("0000".into()));
        assert_eq!(s.step(), Step::DateAndTime);
    }

    #[test]
    fn test_phone_change_discards_issued_code() {
        let mut s = verified_session();
        s.apply(Action::EditCustomer {
            field: CustomerField::Phone,
            value: "+1 555 123 4567".into(),
        })
        .unwrap();
        assert!(s.verification().is_issued());
        assert_eq!(s.step(), Step::PhoneVerify);

        s.apply(Action::EditCustomer {
            field: CustomerField::Phone,
            value: "+44 20 7946 0000".into(),
        })
        .unwrap();
        assert!(!s.verification().is_issued());
        assert_eq!(s.step(), Step::ContactInfo);
        assert!(matches!(
            s.apply(Action::Confirm),
            Err(WizardError::StepLocked(Step::PhoneVerify))
        ));
    }

    #[test]
    fn test_submit_failure_allows_retry() {
        let mut s = verified_session();
        s.apply(Action::EnterCode {
            code: "0000".into(),
        })
        .unwrap();
        let Some(Effect::Submit(submission)) = s.apply(Action::Confirm).unwrap() else {
            panic!("expected submit");
        };
        assert!(s
            .booking_submitted(
                *submission,
                Err(BackendError::Api {
                    status: 409,
                    message: Some("Slot just got taken".into()),
                }),
            )
            .is_none());
        assert_eq!(s.submit_error(), Some("Slot just got taken"));
        assert_eq!(s.verification().entered_code(), "0000");

        let retry = s.apply(Action::Confirm).unwrap();
        assert!(matches!(retry, Some(Effect::Submit(_))));
    }

    #[test]
    fn test_confirmed_session_refuses_actions() {
        let mut s = verified_session();
        s.apply(Action::EnterCode {
            code: "0000".into(),
        })
        .unwrap();
        let Some(Effect::Submit(submission)) = s.apply(Action::Confirm).unwrap() else {
            panic!("expected submit");
        };
        let booking: Booking =
            serde_json::from_value(serde_json::json!({ "_id": "bk1", "status": "pending" }))
                .unwrap();
        let confirmation = s.booking_submitted(*submission, Ok(booking)).unwrap();
        assert_eq!(confirmation.booking.id, "bk1");
        assert!(matches!(s.apply(Action::Back), Err(WizardError::Finished)));
    }

    // ── wire format ──

    #[test]
    fn test_action_json_shape() {
        let a: Action = serde_json::from_value(serde_json::json!({
            "type": "select_service", "serviceId": "svc1"
        }))
        .unwrap();
        assert_eq!(
            a,
            Action::SelectService {
                service_id: "svc1".into()
            }
        );
        let go: Action =
            serde_json::from_value(serde_json::json!({ "type": "go_to", "step": 3 })).unwrap();
        assert_eq!(
            go,
            Action::GoTo {
                step: Step::DateAndTime
            }
        );
        let edit: Action = serde_json::from_value(serde_json::json!({
            "type": "edit_customer", "field": "fullName", "value": "Jane"
        }))
        .unwrap();
        assert!(matches!(
            edit,
            Action::EditCustomer {
                field: CustomerField::FullName,
                ..
            }
        ));
    }
}
