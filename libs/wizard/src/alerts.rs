//! Operator alerts: ERROR events are forwarded to a Telegram chat.
//!
//! Sends are throttled (one per `MIN_INTERVAL`) and identical messages are
//! suppressed for `DEDUP_WINDOW`. Delivery is spawned onto the Tokio runtime so
//! logging never waits on the network.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

const MIN_INTERVAL: Duration = Duration::from_secs(10);
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

/// Rate limit plus duplicate suppression, keyed by message hash.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    dedup_window: Duration,
    last_sent: Option<Instant>,
    recent: Vec<(u64, Instant)>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(MIN_INTERVAL, DEDUP_WINDOW)
    }
}

impl Throttle {
    pub fn new(min_interval: Duration, dedup_window: Duration) -> Self {
        Self {
            min_interval,
            dedup_window,
            last_sent: None,
            recent: Vec::new(),
        }
    }

    /// Record an attempt at `now`; `true` means it may go out.
    pub fn admit(&mut self, hash: u64, now: Instant) -> bool {
        let window = self.dedup_window;
        self.recent
            .retain(|(_, at)| now.saturating_duration_since(*at) < window);

        let duplicate = self.recent.iter().any(|(h, _)| *h == hash);
        let too_soon = self
            .last_sent
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_interval);
        if duplicate || too_soon {
            return false;
        }
        self.last_sent = Some(now);
        self.recent.push((hash, now));
        true
    }
}

pub struct AlertLayer {
    bot_token: String,
    chat_id: i64,
    source: String,
    http: reqwest::Client,
    throttle: Mutex<Throttle>,
}

impl AlertLayer {
    /// `source` names the process in the alert header, e.g. "wizard-server".
    pub fn new(bot_token: String, chat_id: i64, source: impl Into<String>) -> Self {
        Self {
            bot_token,
            chat_id,
            source: source.into(),
            http: reqwest::Client::new(),
            throttle: Mutex::new(Throttle::default()),
        }
    }

    /// Built from `ALERT_BOT_TOKEN` / `ALERT_CHAT_ID`; `None` unless both are set and valid.
    pub fn from_env(source: &str) -> Option<Self> {
        let token = std::env::var("ALERT_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("ALERT_CHAT_ID").ok()?.parse().ok()?;
        Some(Self::new(token, chat_id, source))
    }

    fn format(&self, event: &Event<'_>, message: &str) -> String {
        let meta = event.metadata();
        let location = match (meta.file(), meta.line()) {
            (Some(file), Some(line)) => format!("{file}:{line}"),
            _ => "?".into(),
        };
        let at = chrono::Utc::now().format("%H:%M:%S UTC");
        format!(
            "\u{1f6a8} <b>{}</b>\n<code>{}</code>\n\u{1f4cd} {} ({})\n\u{1f550} {}",
            self.source,
            escape_html(message),
            meta.target(),
            location,
            at
        )
    }
}

impl<S: Subscriber> Layer<S> for AlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message();

        let hash = {
            let mut h = DefaultHasher::new();
            message.hash(&mut h);
            h.finish()
        };
        let admitted = match self.throttle.lock() {
            Ok(mut throttle) => throttle.admit(hash, Instant::now()),
            Err(_) => false,
        };
        if !admitted {
            return;
        }

        let text = self.format(event, &message);
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let client = self.http.clone();
        let chat_id = self.chat_id;

        // Outside a runtime there is nowhere to deliver from.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        handle.spawn(async move {
            let _ = client
                .post(&url)
                .json(&serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "parse_mode": "HTML"
                }))
                .send()
                .await;
        });
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Collects the `message` field plus any structured fields of an event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl MessageVisitor {
    fn message(&self) -> String {
        if self.fields.is_empty() {
            return self.message.clone();
        }
        let extras = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        if self.message.is_empty() {
            extras
        } else {
            format!("{} ({})", self.message, extras)
        }
    }

    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }
}
