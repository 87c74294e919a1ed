//! # UI Module
//!
//! Everything the bot writes into a guild's text channel.
//!
//! - [`TextChannel`]: the outbound messaging contract (send / edit in place)
//! - [`channel`]: serenity implementation of that contract
//! - [`messages`]: the user-facing texts (announcements, queue listing,
//!   now-playing line)

pub mod channel;
pub mod messages;

use async_trait::async_trait;

use crate::error::Result;

pub use channel::SerenityTextChannel;

/// Referencia opaca a un mensaje enviado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

/// Canal de texto de salida
#[async_trait]
pub trait TextChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<MessageHandle>;

    /// Falla con `MessageGone` si el mensaje fue borrado externamente
    async fn edit(&self, message: MessageHandle, text: &str) -> Result<()>;
}
