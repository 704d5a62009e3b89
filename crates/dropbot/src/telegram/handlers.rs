//! Dispatcher schema and handler chain builders
//!
//! Message text is turned into an [`Action`] by plain functions so the
//! routing rules can be tested without Telegram types.

use std::sync::Arc;

use dropcore::cleanup::{CleanupScheduler, SweepReport};
use dropcore::notifier::Notifier;
use dropcore::pipeline::Pipeline;
use dropcore::retrieval::{ClipRange, RetrievalMode, RetrievalRequest};
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use super::bot::Command;
use super::notifier::TelegramNotifier;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub const WELCOME_TEXT: &str = "Welcome! I am your bot.";
pub const INVALID_FORMAT_TEXT: &str = "Invalid command format. Use: /command URL [time_range]";
pub const CLEANUP_FAILED_TEXT: &str = "Error cleaning up downloads folder";

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub pipeline: Arc<Pipeline>,
    pub cleanup: CleanupScheduler,
}

impl HandlerDeps {
    pub fn new(pipeline: Arc<Pipeline>, cleanup: CleanupScheduler) -> Self {
        Self { pipeline, cleanup }
    }
}

/// What to do in response to one message
#[derive(Debug)]
pub enum Action {
    Reply(String),
    Submit(RetrievalRequest),
    Sweep,
}

/// Maps a parsed command to an action.
pub fn plan_command(cmd: Command, chat_id: i64) -> Action {
    match cmd {
        Command::Start => Action::Reply(WELCOME_TEXT.to_string()),
        Command::Help => Action::Reply(Command::descriptions().to_string()),
        Command::Vid(args) => plan_download(&args, chat_id, |_| Some(RetrievalMode::Full)),
        Command::Audio(args) => plan_download(&args, chat_id, |_| Some(RetrievalMode::AudioOnly)),
        Command::Clip(args) => plan_download(&args, chat_id, |range| {
            range?.parse::<ClipRange>().ok().map(RetrievalMode::Clip)
        }),
        Command::Cleanup => Action::Sweep,
    }
}

/// Maps non-command text: a lone `http…` token is a full download.
pub fn plan_text(text: &str, chat_id: i64) -> Action {
    let mut words = text.split_whitespace();
    match (words.next(), words.next()) {
        (Some(url), None) if url.starts_with("http") => {
            match RetrievalRequest::parse(url, RetrievalMode::Full, chat_id) {
                Ok(request) => Action::Submit(request),
                Err(_) => Action::Reply(INVALID_FORMAT_TEXT.to_string()),
            }
        }
        _ => Action::Reply(INVALID_FORMAT_TEXT.to_string()),
    }
}

/// `URL [extra]` with at most one extra argument, handed to `mode_for`.
fn plan_download<F>(args: &str, chat_id: i64, mode_for: F) -> Action
where
    F: FnOnce(Option<&str>) -> Option<RetrievalMode>,
{
    let words: Vec<&str> = args.split_whitespace().collect();
    let (url, extra) = match words.as_slice() {
        [url] => (*url, None),
        [url, extra] => (*url, Some(*extra)),
        _ => return Action::Reply(INVALID_FORMAT_TEXT.to_string()),
    };

    let Some(mode) = mode_for(extra) else {
        return Action::Reply(INVALID_FORMAT_TEXT.to_string());
    };
    match RetrievalRequest::parse(url, mode, chat_id) {
        Ok(request) => Action::Submit(request),
        Err(e) => {
            log::debug!("Rejected URL '{}': {}", url, e);
            Action::Reply(INVALID_FORMAT_TEXT.to_string())
        }
    }
}

/// Reply text for an on-demand sweep
pub fn sweep_text(report: &SweepReport) -> String {
    format!(
        "Cleanup finished: deleted {} of {} files ({} failed).",
        report.deleted, report.scanned, report.failed
    )
}

/// Creates the dispatcher schema for the bot.
///
/// Commands are tried first; any other text message falls through to the
/// plain-URL branch.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                log::info!("Received command: {:?} from chat {}", cmd, msg.chat.id);
                let action = plan_command(cmd, msg.chat.id.0);
                perform(&bot, msg.chat.id, action, &deps).await
            }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                let text = msg.text().unwrap_or_default();
                let action = plan_text(text, msg.chat.id.0);
                perform(&bot, msg.chat.id, action, &deps).await
            }
        })
}

async fn perform(bot: &Bot, chat_id: ChatId, action: Action, deps: &HandlerDeps) -> Result<(), HandlerError> {
    match action {
        Action::Reply(text) => {
            bot.send_message(chat_id, text).await?;
        }
        Action::Submit(request) => {
            log::info!(
                "Submitting {} download of {} for chat {}",
                request.mode.as_str(),
                request.source_url,
                chat_id
            );
            let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone(), chat_id));
            // Detached: the job reports back through the notifier
            let _ = deps.pipeline.submit(request, notifier);
        }
        Action::Sweep => {
            let text = match deps.cleanup.sweep().await {
                Ok(report) => {
                    log::info!("On-demand cleanup for chat {}: {:?}", chat_id, report);
                    sweep_text(&report)
                }
                Err(e) => {
                    log::error!("On-demand cleanup failed: {}", e);
                    CLEANUP_FAILED_TEXT.to_string()
                }
            };
            bot.send_message(chat_id, text).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reply(action: Action) -> String {
        match action {
            Action::Reply(text) => text,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    fn submitted(action: Action) -> RetrievalRequest {
        match action {
            Action::Submit(request) => request,
            other => panic!("expected a submission, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_url_is_full_download() {
        let request = submitted(plan_text("https://example/video", 7));
        assert_eq!(request.mode, RetrievalMode::Full);
        assert_eq!(request.requester_id, 7);
        assert_eq!(request.source_url.as_str(), "https://example/video");
    }

    #[test]
    fn test_other_text_gets_usage() {
        assert_eq!(reply(plan_text("hello there", 7)), INVALID_FORMAT_TEXT);
        assert_eq!(reply(plan_text("https://a https://b", 7)), INVALID_FORMAT_TEXT);
        assert_eq!(reply(plan_text("httpnotaurl", 7)), INVALID_FORMAT_TEXT);
    }

    #[test]
    fn test_audio_command() {
        let request = submitted(plan_command(Command::Audio("https://example/song".into()), 1));
        assert_eq!(request.mode, RetrievalMode::AudioOnly);
    }

    #[test]
    fn test_clip_command_parses_range() {
        let request = submitted(plan_command(
            Command::Clip("https://example/video 00:10-00:20".into()),
            1,
        ));
        match request.mode {
            RetrievalMode::Clip(range) => assert_eq!(range.section_selector(), "*00:10-00:20"),
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_malformed_commands_get_usage() {
        assert_eq!(reply(plan_command(Command::Vid(String::new()), 1)), INVALID_FORMAT_TEXT);
        assert_eq!(
            reply(plan_command(Command::Clip("https://example/video".into()), 1)),
            INVALID_FORMAT_TEXT
        );
        assert_eq!(
            reply(plan_command(Command::Clip("https://example/video soon".into()), 1)),
            INVALID_FORMAT_TEXT
        );
        assert_eq!(
            reply(plan_command(Command::Vid("https://a extra words".into()), 1)),
            INVALID_FORMAT_TEXT
        );
    }

    #[test]
    fn test_start_help_cleanup() {
        assert_eq!(reply(plan_command(Command::Start, 1)), WELCOME_TEXT);
        assert!(reply(plan_command(Command::Help, 1)).contains("/clip"));
        assert!(matches!(plan_command(Command::Cleanup, 1), Action::Sweep));
    }

    #[test]
    fn test_sweep_text() {
        let report = SweepReport {
            scanned: 4,
            deleted: 3,
            failed: 1,
        };
        assert_eq!(sweep_text(&report), "Cleanup finished: deleted 3 of 4 files (1 failed).");
    }
}
