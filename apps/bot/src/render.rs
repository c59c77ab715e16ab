//! Chat rendering of wizard views and parsing of button presses.
//!
//! Kept free of Telegram types so it can be tested directly.

use booking_wizard::availability::SlotsState;
use booking_wizard::view::WizardView;
use booking_wizard::{Action, CustomerField, Step};
use chrono::NaiveDate;

pub const NOOP: &str = "noop";

const SLOTS_PER_ROW: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }

    fn inert(label: impl Into<String>) -> Self {
        Self::new(label, NOOP)
    }
}

/// One chat message: HTML text plus its inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub text: String,
    pub rows: Vec<Vec<Button>>,
}

pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ── Callback data ──

/// Decode a button press. `None` for inert buttons and anything unrecognised.
pub fn parse_callback(data: &str) -> Option<Action> {
    let action = match data {
        "next" => Action::Next,
        "back" => Action::Back,
        "retry" => Action::RetrySlots,
        "set" => Action::SetCustomTime,
        "send" => Action::SendCode,
        "resend" => Action::Resend,
        "confirm" => Action::Confirm,
        _ => {
            let (prefix, arg) = data.split_once(':')?;
            match prefix {
                "svc" => Action::SelectService {
                    service_id: arg.to_string(),
                },
                "spc" => Action::SelectSpecialist {
                    specialist_id: arg.to_string(),
                },
                "date" => Action::SelectDate {
                    date: arg.parse::<NaiveDate>().ok()?,
                },
                "month" => Action::ShowMonth {
                    delta: arg.parse().ok()?,
                },
                "slot" => Action::SelectSlot {
                    start_time: arg.to_string(),
                },
                "hr" => Action::StepHour {
                    delta: arg.parse().ok()?,
                },
                "mn" => Action::StepMinute {
                    delta: arg.parse().ok()?,
                },
                "go" => Action::GoTo {
                    step: Step::from_number(arg.parse().ok()?)?,
                },
                _ => return None,
            }
        }
    };
    Some(action)
}

// ── Text input ──

/// Contact details typed as one message: name, email, phone, then notes.
pub fn contact_edits(text: &str) -> Vec<Action> {
    let mut lines = text.lines().map(str::trim);
    let mut edits = Vec::new();
    for field in [
        CustomerField::FullName,
        CustomerField::Email,
        CustomerField::Phone,
    ] {
        match lines.next() {
            Some(value) if !value.is_empty() => edits.push(Action::EditCustomer {
                field,
                value: value.to_string(),
            }),
            _ => {}
        }
    }
    let notes: Vec<&str> = lines.filter(|l| !l.is_empty()).collect();
    if !notes.is_empty() {
        edits.push(Action::EditCustomer {
            field: CustomerField::Notes,
            value: notes.join("\n"),
        });
    }
    edits
}

// ── Screens ──

pub fn render(view: &WizardView) -> Screen {
    if let Some(confirmation) = &view.confirmation {
        let text = format!(
            "✅ <b>Booking confirmed</b>\n\n\
             🏢 {}\n💇 {} with {}\n📅 {} at {}\n👤 {}\n\nBooking #{}",
            escape(&view.business.name),
            escape(&confirmation.service.name),
            escape(&confirmation.specialist.name),
            confirmation.date.format("%A, %B %-d"),
            escape(&confirmation.time.start_time),
            escape(&confirmation.customer_info.full_name),
            escape(&confirmation.booking.id),
        );
        return Screen {
            text,
            rows: Vec::new(),
        };
    }

    let mut text = format!("<b>{}</b>\n", escape(&view.business.name));
    if let Some(address) = &view.business.address {
        text.push_str(&format!("📍 {}\n", escape(address)));
    }
    text.push_str(&format!("\n<b>{}</b>\n\n", escape(&view.step.to_string())));

    let mut rows = vec![tabs(view)];
    match view.step {
        Step::Branch => {
            text.push_str("You are booking with this business.");
        }
        Step::ServiceAndSpecialist => service_step(view, &mut text, &mut rows),
        Step::DateAndTime => date_step(view, &mut text, &mut rows),
        Step::ContactInfo => contact_step(view, &mut text, &mut rows),
        Step::PhoneVerify => verify_step(view, &mut text, &mut rows),
    }

    let mut nav = Vec::new();
    if view.can_back {
        nav.push(Button::new("◀ Back", "back"));
    }
    if view.can_next && view.step < Step::ContactInfo {
        nav.push(Button::new("Next ▶", "next"));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    Screen { text, rows }
}

fn tabs(view: &WizardView) -> Vec<Button> {
    view.steps
        .iter()
        .map(|tab| {
            let label = if tab.active {
                format!("• {} •", tab.short_label)
            } else if tab.enabled {
                tab.short_label.to_string()
            } else {
                format!("🔒 {}", tab.short_label)
            };
            if tab.enabled && !tab.active {
                Button::new(label, format!("go:{}", tab.number))
            } else {
                Button::inert(label)
            }
        })
        .collect()
}

fn service_step(view: &WizardView, text: &mut String, rows: &mut Vec<Vec<Button>>) {
    text.push_str("Choose a service:");
    for svc in &view.services {
        let mut label = svc.name.clone();
        if let Some(minutes) = svc.duration {
            label.push_str(&format!(" · {minutes} min"));
        }
        if let Some(price) = &svc.price {
            label.push_str(&format!(
                " · {} {}",
                price.amount,
                price.currency.as_deref().unwrap_or("")
            ));
        }
        let label = if svc.selected {
            format!("✅ {}", label.trim_end())
        } else {
            label.trim_end().to_string()
        };
        rows.push(vec![Button::new(label, format!("svc:{}", svc.id))]);
    }

    if view.services.iter().any(|s| s.selected) {
        match &view.specialists_message {
            Some(message) => text.push_str(&format!("\n\n<i>{}</i>", escape(message))),
            None => {
                text.push_str("\nThen a specialist:");
                for sp in &view.specialists {
                    let mut label = sp.name.clone();
                    if let Some(title) = &sp.title {
                        label.push_str(&format!(" ({title})"));
                    }
                    if sp.selected {
                        label = format!("✅ {label}");
                    }
                    rows.push(vec![Button::new(label, format!("spc:{}", sp.id))]);
                }
            }
        }
    }
}

fn date_step(view: &WizardView, text: &mut String, rows: &mut Vec<Vec<Button>>) {
    rows.push(vec![
        Button::new("‹", "month:-1"),
        Button::inert(view.calendar.label.clone()),
        Button::new("›", "month:1"),
    ]);
    rows.push(
        ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"]
            .into_iter()
            .map(Button::inert)
            .collect(),
    );
    let mut cells: Vec<Button> = view
        .calendar
        .cells
        .iter()
        .map(|cell| match cell {
            None => Button::inert(" "),
            Some(day) if day.selected => Button::inert(format!("[{}]", day.day)),
            Some(day) if day.selectable => {
                Button::new(day.day.to_string(), format!("date:{}", day.date))
            }
            Some(_) => Button::inert("·"),
        })
        .collect();
    while cells.len() % 7 != 0 {
        cells.push(Button::inert(" "));
    }
    rows.extend(cells.chunks(7).map(<[Button]>::to_vec));

    match view.selected_date {
        None => {
            text.push_str("Pick a date.");
            return;
        }
        Some(date) => text.push_str(&format!("📅 {}\n", date.format("%A, %B %-d"))),
    }
    if let Some(hours) = &view.working_hours {
        text.push_str(&format!("🕒 {}\n", escape(hours)));
    }

    match &view.slots {
        SlotsState::Loading => text.push_str("\nLoading times…"),
        SlotsState::Loaded(slots) => {
            let selected = view.selected_time.as_ref();
            let buttons: Vec<Button> = slots
                .iter()
                .filter(|s| s.is_available)
                .map(|s| {
                    let is_selected = selected
                        .is_some_and(|t| !t.is_custom_time && t.start_time == s.start_time);
                    let label = if is_selected {
                        format!("✅ {}", s.start_time)
                    } else {
                        s.start_time.clone()
                    };
                    Button::new(label, format!("slot:{}", s.start_time))
                })
                .collect();
            rows.extend(buttons.chunks(SLOTS_PER_ROW).map(<[Button]>::to_vec));
        }
        SlotsState::Idle | SlotsState::Empty | SlotsState::Failed(_) => {}
    }
    if let Some(banner) = &view.slots_banner {
        text.push_str(&format!("\n<i>{}</i>", escape(banner)));
        rows.push(vec![Button::new("↻ Try again", "retry")]);
    }

    if let Some(custom) = &view.custom_time {
        text.push_str(&format!(
            "\n\nOr pick your own time: <b>{}</b>",
            custom.picker.display
        ));
        if let Some(error) = &custom.error {
            text.push_str(&format!("\n⚠️ {}", escape(error)));
        }
        rows.push(vec![
            Button::new("−1h", "hr:-1"),
            Button::new("+1h", "hr:1"),
            Button::new("−5m", "mn:-5"),
            Button::new("+5m", "mn:5"),
        ]);
        rows.push(vec![
            Button::new("−1m", "mn:-1"),
            Button::new("+1m", "mn:1"),
            if custom.validating {
                Button::inert("Checking…")
            } else if custom.can_set {
                Button::new("Set time", "set")
            } else {
                Button::inert("Set time")
            },
        ]);
    }

    if let Some(time) = &view.selected_time {
        text.push_str(&format!("\n\nSelected: <b>{}</b>", escape(&time.start_time)));
    }
}

fn contact_step(view: &WizardView, text: &mut String, rows: &mut Vec<Vec<Button>>) {
    let c = &view.customer;
    let e = &view.info_errors;
    let field = |label: &str, value: &str, error: &Option<String>| {
        let value = if value.is_empty() { "—" } else { value };
        match error {
            Some(err) => format!("{label}: {}  ⚠️ {}\n", escape(value), escape(err)),
            None => format!("{label}: {}\n", escape(value)),
        }
    };
    text.push_str(&field("Name", &c.full_name, &e.full_name));
    text.push_str(&field("Email", &c.email, &e.email));
    text.push_str(&field("Phone", &c.phone, &e.phone));
    if !c.notes.is_empty() {
        text.push_str(&format!("Notes: {}\n", escape(&c.notes)));
    }
    text.push_str(
        "\nReply with your details, one per line:\n\
         <i>name\nemail\nphone\nnotes (optional)</i>",
    );
    if let Some(error) = &view.verification.error {
        text.push_str(&format!("\n\n⚠️ {}", escape(error)));
    }

    let send = if view.verification.code_sent {
        Button::new("Enter code ▶", "go:5")
    } else if view.busy.is_some() {
        Button::inert("Sending…")
    } else {
        Button::new("📲 Send code", "send")
    };
    rows.push(vec![send]);
}

fn verify_step(view: &WizardView, text: &mut String, rows: &mut Vec<Vec<Button>>) {
    text.push_str(&format!(
        "We sent a 4-digit code to <b>{}</b>. Reply with it here.",
        escape(&view.customer.phone)
    ));
    if !view.verification.entered_code.is_empty() {
        text.push_str(&format!(
            "\nCode: <code>{}</code>",
            view.verification.entered_code
        ));
    }
    if let Some(error) = &view.verification.error {
        text.push_str(&format!("\n⚠️ {}", escape(error)));
    }
    if let Some(error) = &view.submit_error {
        text.push_str(&format!("\n❌ {}", escape(error)));
    }

    let mut row = vec![Button::new("↻ Resend code", "resend")];
    if view.verification.entered_code.len() == 4 && view.busy.is_none() {
        row.push(Button::new("✅ Confirm", "confirm"));
    }
    rows.push(row);
}
