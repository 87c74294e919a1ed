//! # Voice Module
//!
//! The voice-channel transport contract consumed by the session state
//! machine, and its songbird implementation.
//!
//! A transport joins a channel, plays one [`PlayableStream`] at a time and
//! reports end-of-stream / error through the [`PlaybackNotifier`] it was
//! handed on [`VoiceTransport::subscribe`]. It also answers who is in the
//! channel so the occupancy monitor can decide when to leave.

pub mod songbird_transport;

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::sync::Arc;

use crate::{error::Result, sources::PlayableStream};

pub use songbird_transport::SongbirdTransport;

/// Conexión activa a un canal de voz
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConnection {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// Eventos del transporte sobre el track en curso
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Fin natural del stream (o forzado por skip/stop)
    Finished,
    Errored(String),
}

/// Callback que el transporte invoca al terminar o fallar un track
#[derive(Clone)]
pub struct PlaybackNotifier {
    callback: Arc<dyn Fn(PlaybackEvent) + Send + Sync>,
}

impl PlaybackNotifier {
    pub fn new(callback: impl Fn(PlaybackEvent) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn notify(&self, event: PlaybackEvent) {
        (self.callback)(event)
    }
}

impl std::fmt::Debug for PlaybackNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlaybackNotifier")
    }
}

/// Transporte de voz (un canal por guild)
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<VoiceConnection>;

    /// Reproduce `source`, reemplazando lo que hubiera
    async fn subscribe(
        &self,
        connection: &VoiceConnection,
        source: PlayableStream,
        notifier: PlaybackNotifier,
    ) -> Result<()>;

    /// Fuerza el fin del stream actual; el notifier recibe `Finished`
    async fn halt(&self, connection: &VoiceConnection) -> Result<()>;

    async fn pause(&self, connection: &VoiceConnection) -> Result<()>;

    async fn resume(&self, connection: &VoiceConnection) -> Result<()>;

    async fn disconnect(&self, connection: &VoiceConnection) -> Result<()>;

    /// Participantes humanos (sin bots) presentes ahora en el canal
    fn members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId>;
}
