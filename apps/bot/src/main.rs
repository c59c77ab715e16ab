mod render;

use booking_wizard::alerts::AlertLayer;
use booking_wizard::{
    Action, ApiClient, ApiConfig, BookingWizard, CodeSender, CustomerField, DemoCodeSender,
    EffectRunner, Step,
};
use dashmap::DashMap;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode},
    utils::command::BotCommands,
};
use tokio::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use render::{contact_edits, parse_callback, render, Screen};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "Book an appointment")]
    Start,
    #[command(description = "Cancel the current booking")]
    Cancel,
    #[command(description = "Help")]
    Help,
}

type Session = Arc<Mutex<BookingWizard>>;

#[derive(Clone)]
struct BotState {
    sessions: Arc<DashMap<ChatId, Session>>,
    api: ApiClient,
    codes: Arc<dyn CodeSender>,
    booking_link: String,
}

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());
    match AlertLayer::from_env("wizard-bot") {
        Some(alerts) => registry.with(alerts).init(),
        None => registry.init(),
    }

    let bot_token = std::env::var("BOT_TOKEN")
        .map_err(|_| anyhow::anyhow!("BOT_TOKEN must be set"))?;
    let booking_link = std::env::var("BOOKING_LINK")
        .map_err(|_| anyhow::anyhow!("BOOKING_LINK must be set"))?;

    let config = ApiConfig::from_env();
    let state = BotState {
        sessions: Arc::new(DashMap::new()),
        api: ApiClient::new(&config)?,
        codes: Arc::new(DemoCodeSender::new(
            config.demo_code.clone(),
            config.demo_code_delay,
        )),
        booking_link,
    };

    let bot = Bot::new(&bot_token);
    tracing::info!("Booking bot starting for link {}", state.booking_link);

    let cmd_handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint({
            let state = state.clone();
            move |bot: Bot, msg: Message, cmd: Command| {
                let state = state.clone();
                async move {
                    handle_command(bot, msg, cmd, &state).await?;
                    Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
                }
            }
        });

    let text_handler = Update::filter_message().endpoint({
        let state = state.clone();
        move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move { handle_text(bot, msg, &state).await }
        }
    });

    let callback_handler = Update::filter_callback_query().endpoint({
        let state = state.clone();
        move |bot: Bot, q: CallbackQuery| {
            let state = state.clone();
            async move {
                handle_callback(bot, q, &state).await?;
                Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
            }
        }
    });

    let handler = dptree::entry()
        .branch(cmd_handler)
        .branch(text_handler)
        .branch(callback_handler);

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn keyboard(screen: &Screen) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(screen.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

async fn send_screen(bot: &Bot, chat_id: ChatId, wizard: &BookingWizard) -> anyhow::Result<()> {
    let screen = render(&wizard.view());
    bot.send_message(chat_id, screen.text.clone())
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard(&screen))
        .await?;
    Ok(())
}

async fn edit_screen(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    wizard: &BookingWizard,
) -> anyhow::Result<()> {
    let screen = render(&wizard.view());
    let edited = bot
        .edit_message_text(chat_id, message_id, screen.text.clone())
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard(&screen))
        .await;
    if let Err(e) = edited {
        // Telegram refuses edits that change nothing.
        tracing::debug!("Screen edit skipped in chat {}: {}", chat_id, e);
    }
    Ok(())
}

// ── Commands ──

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: &BotState,
) -> anyhow::Result<()> {
    match cmd {
        Command::Start => {
            let runner = EffectRunner::new(Arc::new(state.api.clone()), state.codes.clone());
            let today = chrono::Local::now().date_naive();
            let mut wizard =
                match BookingWizard::open(&state.api, &state.booking_link, today, runner).await {
                    Ok(wizard) => wizard,
                    Err(e) => {
                        tracing::error!("Could not open booking for {}: {}", state.booking_link, e);
                        bot.send_message(
                            msg.chat.id,
                            e.user_message("Booking is unavailable right now. Please try later."),
                        )
                        .await?;
                        return Ok(());
                    }
                };

            if wizard.session().customer().full_name.is_empty() {
                if let Some(user) = msg.from.as_ref() {
                    wizard
                        .dispatch(Action::EditCustomer {
                            field: CustomerField::FullName,
                            value: user.full_name(),
                        })
                        .await?;
                }
            }

            send_screen(&bot, msg.chat.id, &wizard).await?;
            state
                .sessions
                .insert(msg.chat.id, Arc::new(Mutex::new(wizard)));
        }
        Command::Cancel => {
            let text = if state.sessions.remove(&msg.chat.id).is_some() {
                "Booking cancelled. Send /start to begin again."
            } else {
                "Nothing to cancel. Send /start to book."
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Help => {
            bot.send_message(
                msg.chat.id,
                "<b>Booking bot</b>\n\n\
                 /start - book an appointment\n\
                 /cancel - drop the booking in progress\n\
                 /help - this message",
            )
            .parse_mode(ParseMode::Html)
            .await?;
        }
    }
    Ok(())
}

// ── Free text: contact details and the verification code ──

async fn handle_text(bot: Bot, msg: Message, state: &BotState) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(session) = state.sessions.get(&msg.chat.id).map(|s| s.value().clone()) else {
        bot.send_message(msg.chat.id, "Send /start to book an appointment.")
            .await?;
        return Ok(());
    };
    let mut wizard = session.lock().await;

    let result = match wizard.session().step() {
        Step::ContactInfo => {
            let mut result = Ok(());
            for edit in contact_edits(text) {
                result = wizard.dispatch(edit).await;
                if result.is_err() {
                    break;
                }
            }
            match result {
                Ok(()) => wizard.dispatch(Action::SendCode).await,
                err => err,
            }
        }
        Step::PhoneVerify => {
            match wizard
                .dispatch(Action::EnterCode {
                    code: text.to_string(),
                })
                .await
            {
                Ok(()) => wizard.dispatch(Action::Confirm).await,
                err => err,
            }
        }
        _ => Ok(()),
    };
    if let Err(e) = result {
        bot.send_message(msg.chat.id, e.to_string()).await?;
    }

    send_screen(&bot, msg.chat.id, &wizard).await?;
    if wizard.confirmation().is_some() {
        drop(wizard);
        state.sessions.remove(&msg.chat.id);
    }
    Ok(())
}

// ── Inline buttons ──

async fn handle_callback(bot: Bot, q: CallbackQuery, state: &BotState) -> anyhow::Result<()> {
    let data = q.data.as_deref().unwrap_or("");
    let Some(message) = q.message.as_ref() else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let chat_id = message.chat().id;

    let Some(action) = parse_callback(data) else {
        bot.answer_callback_query(&q.id).await?;
        return Ok(());
    };
    let Some(session) = state.sessions.get(&chat_id).map(|s| s.value().clone()) else {
        bot.answer_callback_query(&q.id)
            .text("This booking has expired. Send /start to begin again.")
            .await?;
        return Ok(());
    };

    let mut wizard = session.lock().await;
    match wizard.dispatch(action).await {
        Ok(()) => {
            bot.answer_callback_query(&q.id).await?;
        }
        Err(e) => {
            bot.answer_callback_query(&q.id).text(e.to_string()).await?;
        }
    }

    edit_screen(&bot, chat_id, message.id(), &wizard).await?;
    if wizard.confirmation().is_some() {
        drop(wizard);
        state.sessions.remove(&chat_id);
    }
    Ok(())
}
