use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::{
    sync::{Mutex, MutexGuard},
    time::Instant,
};

use super::{
    occupancy::DisconnectTimer,
    progress::ProgressReporter,
    queue::{Track, TrackQueue},
};
use crate::{
    ui::{MessageHandle, TextChannel},
    voice::VoiceConnection,
};

/// Estado de la sesión de una guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Playing,
    Paused,
    /// Terminal: la sesión ya salió del registro
    Stopped,
}

/// Track en reproducción y su reloj
#[derive(Debug)]
pub(crate) struct ActiveTrack {
    pub track: Track,
    started_at: Instant,
    paused_at: Option<Instant>,
}

impl ActiveTrack {
    pub fn new(track: Track, now: Instant) -> Self {
        Self {
            track,
            started_at: now,
            paused_at: None,
        }
    }

    /// Tiempo reproducido; congelado mientras está en pausa
    pub fn elapsed(&self, now: Instant) -> std::time::Duration {
        self.paused_at
            .unwrap_or(now)
            .saturating_duration_since(self.started_at)
    }

    pub fn pause(&mut self, now: Instant) {
        self.paused_at.get_or_insert(now);
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.started_at += now.saturating_duration_since(paused_at);
        }
    }
}

/// Track que dejó de sonar, con el mensaje de progreso a cerrar
#[derive(Debug)]
pub(crate) struct FinishedTrack {
    pub track: Track,
    pub message: Option<MessageHandle>,
}

/// Lo que queda por liberar fuera del lock tras detener la sesión
#[derive(Debug, Default)]
pub(crate) struct Teardown {
    pub connection: Option<VoiceConnection>,
    pub finished: Option<FinishedTrack>,
}

/// Estado mutable, serializado por el mutex de la sesión
#[derive(Debug)]
pub(crate) struct SessionInner {
    pub state: SessionState,
    pub queue: TrackQueue,
    pub active: Option<ActiveTrack>,
    /// Se incrementa en cada intento de reproducción y al detener
    pub epoch: u64,
    pub connection: Option<VoiceConnection>,
    pub progress: Option<ProgressReporter>,
    pub disconnect_timer: Option<DisconnectTimer>,
    timer_seq: u64,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            queue: TrackQueue::new(),
            active: None,
            epoch: 0,
            connection: None,
            progress: None,
            disconnect_timer: None,
            timer_seq: 0,
        }
    }

    /// Pasa a Connecting e invalida callbacks del intento anterior
    pub fn begin_attempt(&mut self) -> u64 {
        self.state = SessionState::Connecting;
        self.epoch += 1;
        self.epoch
    }

    /// Suelta el track activo y cancela su reporte de progreso
    pub fn finish_active(&mut self) -> Option<FinishedTrack> {
        let message = self.progress.take().and_then(ProgressReporter::cancel);
        self.active.take().map(|active| FinishedTrack {
            track: active.track,
            message,
        })
    }

    pub fn next_timer_id(&mut self) -> u64 {
        self.timer_seq += 1;
        self.timer_seq
    }

    /// Estado terminal: cancela todo y devuelve lo que hay que liberar
    pub fn teardown(&mut self) -> Teardown {
        self.state = SessionState::Stopped;
        self.epoch += 1;
        if let Some(timer) = self.disconnect_timer.take() {
            timer.cancel();
        }
        self.queue.clear();
        Teardown {
            finished: self.finish_active(),
            connection: self.connection.take(),
        }
    }
}

/// Sesión de reproducción de una guild
pub struct Session {
    guild_id: GuildId,
    voice_channel: ChannelId,
    text: Arc<dyn TextChannel>,
    inner: Mutex<SessionInner>,
}

impl Session {
    pub fn new(guild_id: GuildId, voice_channel: ChannelId, text: Arc<dyn TextChannel>) -> Self {
        Self {
            guild_id,
            voice_channel,
            text,
            inner: Mutex::new(SessionInner::new()),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn voice_channel(&self) -> ChannelId {
        self.voice_channel
    }

    pub fn text(&self) -> &dyn TextChannel {
        self.text.as_ref()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().await
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("guild_id", &self.guild_id)
            .field("voice_channel", &self.voice_channel)
            .finish_non_exhaustive()
    }
}
