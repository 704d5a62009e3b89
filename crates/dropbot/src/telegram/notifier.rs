use async_trait::async_trait;
use dropcore::notifier::{MediaKind, Notifier, NotifyError};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::InputFile;

/// [`Notifier`] bound to one Telegram chat
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.bot.send_message(self.chat_id, text).await?;
        Ok(())
    }

    async fn send_media(&self, path: &Path, kind: MediaKind) -> Result<(), NotifyError> {
        let file = InputFile::file(path.to_path_buf());
        match kind {
            MediaKind::Video => {
                self.bot.send_video(self.chat_id, file).await?;
            }
            MediaKind::Audio => {
                self.bot.send_audio(self.chat_id, file).await?;
            }
        }
        log::info!("Sent {} {} to chat {}", kind, path.display(), self.chat_id);
        Ok(())
    }
}
