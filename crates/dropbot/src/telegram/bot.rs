//! Bot instance creation and the command set

use dropcore::config::{network, TelegramSettings};
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;

/// Commands understood by the bot.
///
/// Arguments are taken as raw text and validated by the handlers, so a
/// malformed command still gets a usage reply.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show this message")]
    Help,
    #[command(description = "Download and send a video: /vid URL")]
    Vid(String),
    #[command(description = "Download and send an audio file: /audio URL")]
    Audio(String),
    #[command(description = "Download a video clip: /clip URL start-end")]
    Clip(String),
    #[command(description = "Delete downloaded files past the retention window")]
    Cleanup,
}

/// Creates a Bot instance with custom or default API URL
pub fn create_bot(settings: &TelegramSettings) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(network::timeout())
        .build()?;
    let bot = Bot::with_client(settings.token.clone(), client);

    let bot = match &settings.api_url {
        Some(api_url) => {
            log::info!("Using custom Bot API URL: {}", api_url);
            let url = url::Url::parse(api_url).map_err(|e| anyhow::anyhow!("Invalid telegram.api_url: {}", e))?;
            bot.set_api_url(url)
        }
        None => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "Start the bot"),
        BotCommand::new("help", "Show the command list"),
        BotCommand::new("vid", "Download and send a video"),
        BotCommand::new("audio", "Download and send an audio file"),
        BotCommand::new("clip", "Download a video clip with a time range"),
        BotCommand::new("cleanup", "Delete old downloaded files"),
    ])
    .await?;

    Ok(())
}
