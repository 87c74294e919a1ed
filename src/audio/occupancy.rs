//! Auto-desconexión por canal vacío.
//!
//! Cuando el canal de voz de una sesión se queda sin humanos (o la cola se
//! vacía tras el último track) se arma un temporizador de gracia. Al vencer
//! se vuelve a contar la gente del canal en ese momento: si sigue vacío la
//! sesión se detiene; si no, el temporizador se descarta sin re-armarse.

use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    player::{send, MusicPlayer},
    session::{Session, SessionInner, SessionState},
};
use crate::ui::messages;

/// Temporizador de desconexión armado en una sesión
#[derive(Debug)]
pub(crate) struct DisconnectTimer {
    id: u64,
    token: CancellationToken,
}

impl DisconnectTimer {
    /// Idempotente
    pub fn cancel(self) {
        self.token.cancel();
    }
}

impl MusicPlayer {
    /// Reacciona a un cambio de membresía en `channel_id`
    pub async fn on_membership_changed(&self, guild_id: GuildId, channel_id: ChannelId) {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return;
        };
        if session.voice_channel() != channel_id {
            return;
        }

        let mut inner = session.lock().await;
        if inner.state == SessionState::Stopped {
            return;
        }

        let members = self.inner.transport.members(guild_id, channel_id).len();
        debug!("👥 {} usuarios en el canal {} de guild {}", members, channel_id, guild_id);

        let grace_secs = self.inner.settings.grace_period.as_secs();
        let notice = if members == 0 {
            if self.arm_disconnect_timer(&session, &mut inner) {
                info!("🚪 Canal vacío en guild {}, desconexión en {}s", guild_id, grace_secs);
                Some(messages::channel_empty(grace_secs))
            } else {
                None
            }
        } else if let Some(timer) = inner.disconnect_timer.take() {
            timer.cancel();
            info!("✅ Desconexión cancelada en guild {}", guild_id);
            Some(messages::DISCONNECT_CANCELLED.to_string())
        } else {
            None
        };
        drop(inner);

        if let Some(notice) = notice {
            send(session.text(), &notice).await;
        }
    }

    /// Arma el chequeo de gracia si no hay uno armado. Devuelve si lo armó.
    pub(crate) fn arm_disconnect_timer(&self, session: &Arc<Session>, inner: &mut SessionInner) -> bool {
        if inner.disconnect_timer.is_some() {
            return false;
        }

        let id = inner.next_timer_id();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let grace = self.inner.settings.grace_period;
        let player = self.clone();
        let session = Arc::downgrade(session);

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Temporizador de desconexión {} cancelado", id);
                }
                _ = tokio::time::sleep(grace) => {
                    if let Some(session) = session.upgrade() {
                        player.on_grace_expired(&session, id).await;
                    }
                }
            }
        });

        inner.disconnect_timer = Some(DisconnectTimer { id, token });
        true
    }

    /// Vencimiento del temporizador `id`: se recuenta la membresía actual
    async fn on_grace_expired(&self, session: &Arc<Session>, id: u64) {
        let guild_id = session.guild_id();
        let mut inner = session.lock().await;
        if inner.state == SessionState::Stopped {
            return;
        }
        match &inner.disconnect_timer {
            Some(timer) if timer.id == id => {}
            _ => {
                debug!("Temporizador {} obsoleto en guild {}", id, guild_id);
                return;
            }
        }
        inner.disconnect_timer = None;

        let members = self
            .inner
            .transport
            .members(guild_id, session.voice_channel())
            .len();

        if members == 0 {
            info!("👋 Nadie en el canal de guild {}, desconectando", guild_id);
            self.teardown_session(session, inner, Some(messages::DISCONNECTED_EMPTY))
                .await;
        } else {
            drop(inner);
            info!("✅ Alguien volvió a guild {}, no se desconecta", guild_id);
            send(session.text(), messages::DISCONNECT_CANCELLED).await;
        }
    }
}
