use serde::{Deserialize, Serialize};
use std::fmt;

/// Wizard steps, numbered as the tabs show them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Step {
    Branch = 1,
    ServiceAndSpecialist = 2,
    DateAndTime = 3,
    ContactInfo = 4,
    PhoneVerify = 5,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Branch,
        Step::ServiceAndSpecialist,
        Step::DateAndTime,
        Step::ContactInfo,
        Step::PhoneVerify,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Step::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::Branch => "Select Branch",
            Step::ServiceAndSpecialist => "Service & Specialist",
            Step::DateAndTime => "Date & Time",
            Step::ContactInfo => "Your Phone",
            Step::PhoneVerify => "Phone Verify",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Step::Branch => "Branch",
            Step::ServiceAndSpecialist => "Service",
            Step::DateAndTime => "Date",
            Step::ContactInfo => "Phone",
            Step::PhoneVerify => "Verify",
        }
    }

    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    pub fn prev(self) -> Option<Step> {
        Step::from_number(self.number().saturating_sub(1))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Step::from_number(n).ok_or_else(|| format!("no wizard step {n}"))
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.number()
    }
}

/// The parts of a session the step gate looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateInput {
    pub has_service: bool,
    pub has_specialist: bool,
    pub has_date: bool,
    pub has_time: bool,
    pub code_issued: bool,
}

/// Whether `step` may be entered, by "Next" or by clicking its tab.
pub fn can_enter(step: Step, input: GateInput) -> bool {
    match step {
        Step::Branch | Step::ServiceAndSpecialist => true,
        Step::DateAndTime => input.has_service && input.has_specialist,
        Step::ContactInfo => input.has_date && input.has_time,
        Step::PhoneVerify => input.code_issued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── numbering ──

    #[test]
    fn test_number_roundtrip() {
        for step in Step::ALL {
            assert_eq!(Step::from_number(step.number()), Some(step));
        }
        assert_eq!(Step::from_number(0), None);
        assert_eq!(Step::from_number(6), None);
    }

    #[test]
    fn test_next_and_prev_stop_at_ends() {
        assert_eq!(Step::PhoneVerify.next(), None);
        assert_eq!(Step::Branch.prev(), None);
        assert_eq!(Step::DateAndTime.next(), Some(Step::ContactInfo));
        assert_eq!(Step::DateAndTime.prev(), Some(Step::ServiceAndSpecialist));
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&Step::ContactInfo).unwrap(), "4");
        let s: Step = serde_json::from_str("3").unwrap();
        assert_eq!(s, Step::DateAndTime);
        assert!(serde_json::from_str::<Step>("9").is_err());
    }

    // ── gate ──

    #[test]
    fn test_first_two_steps_always_open() {
        let none = GateInput::default();
        assert!(can_enter(Step::Branch, none));
        assert!(can_enter(Step::ServiceAndSpecialist, none));
        assert!(!can_enter(Step::DateAndTime, none));
        assert!(!can_enter(Step::ContactInfo, none));
        assert!(!can_enter(Step::PhoneVerify, none));
    }

    #[test]
    fn test_date_step_needs_service_and_specialist() {
        let only_service = GateInput {
            has_service: true,
            ..Default::default()
        };
        assert!(!can_enter(Step::DateAndTime, only_service));
        let both = GateInput {
            has_service: true,
            has_specialist: true,
            ..Default::default()
        };
        assert!(can_enter(Step::DateAndTime, both));
    }

    #[test]
    fn test_contact_step_needs_date_and_time() {
        let date_only = GateInput {
            has_date: true,
            ..Default::default()
        };
        assert!(!can_enter(Step::ContactInfo, date_only));
        let both = GateInput {
            has_date: true,
            has_time: true,
            ..Default::default()
        };
        assert!(can_enter(Step::ContactInfo, both));
    }

    #[test]
    fn test_verify_step_needs_issued_code() {
        let issued = GateInput {
            code_issued: true,
            ..Default::default()
        };
        assert!(can_enter(Step::PhoneVerify, issued));
    }
}
