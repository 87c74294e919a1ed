//! # Bot Module
//!
//! Gateway glue between serenity and the [`MusicPlayer`].
//!
//! [`SessionBot`] implements serenity's [`EventHandler`] and forwards voice
//! state changes to the occupancy monitor. The player itself lives in the
//! client's `TypeMap` under [`PlayerKey`] so that any command layer can reach
//! it through [`player_from`].
//!
//! ## Example
//!
//! ```rust,no_run
//! # use guild_player::bot::{enqueue_context, player_from};
//! # use serenity::all::{ChannelId, Context, GuildId};
//! # async fn example(ctx: &Context, guild_id: GuildId, text: ChannelId, voice: ChannelId) -> anyhow::Result<()> {
//! if let Some(player) = player_from(ctx).await {
//!     let context = enqueue_context(ctx, text, voice, "someone");
//!     player.enqueue(guild_id, "https://youtu.be/dQw4w9WgXcQ", context).await?;
//! }
//! # Ok(())
//! # }
//! ```

use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Ready, VoiceState},
    async_trait,
    prelude::TypeMapKey,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    audio::{EnqueueContext, MusicPlayer},
    ui::SerenityTextChannel,
};

/// Clave del reproductor en el `TypeMap` del cliente
pub struct PlayerKey;

impl TypeMapKey for PlayerKey {
    type Value = MusicPlayer;
}

/// Obtiene el reproductor registrado en el cliente
pub async fn player_from(ctx: &Context) -> Option<MusicPlayer> {
    ctx.data.read().await.get::<PlayerKey>().cloned()
}

/// Contexto de encolado que publica en `text_channel` de Discord
pub fn enqueue_context(
    ctx: &Context,
    text_channel: ChannelId,
    voice_channel: ChannelId,
    requester: impl Into<String>,
) -> EnqueueContext {
    EnqueueContext {
        text: Arc::new(SerenityTextChannel::new(ctx.http.clone(), text_channel)),
        voice_channel,
        requester: requester.into(),
    }
}

/// Handler de eventos del gateway
pub struct SessionBot;

impl SessionBot {
    /// Canales cuya membresía cambió con esta actualización
    fn affected_channels(before: Option<ChannelId>, after: Option<ChannelId>) -> Vec<ChannelId> {
        match (before, after) {
            (Some(b), Some(a)) if b == a => Vec::new(),
            _ => before.into_iter().chain(after).collect(),
        }
    }

    fn guild_of(old: Option<&VoiceState>, new: &VoiceState) -> Option<GuildId> {
        new.guild_id.or_else(|| old.and_then(|state| state.guild_id))
    }
}

#[async_trait]
impl EventHandler for SessionBot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    /// Handles voice state updates for users and the bot.
    ///
    /// - The bot being disconnected externally stops the guild's session,
    ///   unless the session no longer holds a connection to that channel
    /// - Anyone joining or leaving a channel re-evaluates its occupancy
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = Self::guild_of(old.as_ref(), &new) else {
            return;
        };
        let Some(player) = player_from(&ctx).await else {
            debug!("Reproductor no registrado todavía");
            return;
        };

        let current_user_id = ctx.cache.current_user().id;
        if new.user_id == current_user_id {
            let left = old.as_ref().and_then(|state| state.channel_id);
            if let (Some(channel_id), None) = (left, new.channel_id) {
                player.on_bot_disconnected(guild_id, channel_id).await;
            }
            return;
        }

        let before = old.as_ref().and_then(|state| state.channel_id);
        for channel_id in Self::affected_channels(before, new.channel_id) {
            player.on_membership_changed(guild_id, channel_id).await;
        }
    }
}
