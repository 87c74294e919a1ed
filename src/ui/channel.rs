use async_trait::async_trait;
use serenity::{
    builder::EditMessage,
    http::Http,
    model::id::{ChannelId, MessageId},
};
use std::sync::Arc;

use super::{MessageHandle, TextChannel};
use crate::error::{PlayerError, Result};

/// Canal de texto de Discord vía HTTP de serenity
#[derive(Clone)]
pub struct SerenityTextChannel {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl SerenityTextChannel {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

fn map_error(error: serenity::Error) -> PlayerError {
    if let serenity::Error::Http(http_error) = &error {
        if http_error.status_code().map(|s| s.as_u16()) == Some(404) {
            return PlayerError::MessageGone;
        }
    }
    PlayerError::Messaging(error.to_string())
}

#[async_trait]
impl TextChannel for SerenityTextChannel {
    async fn send(&self, text: &str) -> Result<MessageHandle> {
        let message = self.channel_id.say(&self.http, text).await.map_err(map_error)?;
        Ok(MessageHandle(message.id.get()))
    }

    async fn edit(&self, message: MessageHandle, text: &str) -> Result<()> {
        self.channel_id
            .edit_message(&self.http, MessageId::new(message.0), EditMessage::new().content(text))
            .await
            .map_err(map_error)?;
        Ok(())
    }
}
