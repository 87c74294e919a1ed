use async_trait::async_trait;
use dashmap::DashMap;
use serenity::{
    cache::Cache,
    model::id::{ChannelId, GuildId, UserId},
};
use songbird::{
    input::{Input, RawAdapter},
    tracks::TrackHandle,
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    collections::VecDeque,
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};
use symphonia::core::io::MediaSource;
use tracing::{debug, error, info, warn};

use super::{PlaybackEvent, PlaybackNotifier, VoiceConnection, VoiceTransport};
use crate::{
    error::{PlayerError, Result},
    sources::PlayableStream,
};

/// Transporte de voz sobre songbird; la membresía sale del caché de serenity
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    cache: Arc<Cache>,
    tracks: DashMap<GuildId, TrackHandle>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, cache: Arc<Cache>) -> Self {
        Self {
            manager,
            cache,
            tracks: DashMap::new(),
        }
    }

    fn current_track(&self, guild_id: GuildId) -> Result<TrackHandle> {
        self.tracks
            .get(&guild_id)
            .map(|t| t.clone())
            .ok_or_else(|| PlayerError::Transport("no hay track activo".to_string()))
    }

    fn is_bot(&self, user_id: UserId, member_is_bot: Option<bool>) -> bool {
        member_is_bot
            .or_else(|| self.cache.user(user_id).map(|u| u.bot))
            .unwrap_or(false)
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<VoiceConnection> {
        self.manager.join(guild_id, channel_id).await.map_err(|e| {
            error!("Error al conectar al canal de voz: {:?}", e);
            PlayerError::Transport(format!("no se pudo conectar al canal de voz: {e}"))
        })?;

        info!("🔊 Conectado al canal de voz {} en guild {}", channel_id, guild_id);
        Ok(VoiceConnection {
            guild_id,
            channel_id,
        })
    }

    async fn subscribe(
        &self,
        connection: &VoiceConnection,
        source: PlayableStream,
        notifier: PlaybackNotifier,
    ) -> Result<()> {
        let call = self
            .manager
            .get(connection.guild_id)
            .ok_or_else(|| PlayerError::Transport("sin llamada de voz activa".to_string()))?;

        let format = source.format();
        let input: Input =
            RawAdapter::new(PcmSource::new(source.into_reader()), format.sample_rate, format.channels)
                .into();

        let handle = {
            let mut call = call.lock().await;
            call.play_only_input(input)
        };

        for (event, kind) in [(TrackEvent::End, RelayKind::End), (TrackEvent::Error, RelayKind::Error)] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEventRelay {
                        guild_id: connection.guild_id,
                        kind,
                        notifier: notifier.clone(),
                    },
                )
                .map_err(|e| PlayerError::Transport(format!("error al registrar evento: {e}")))?;
        }

        self.tracks.insert(connection.guild_id, handle);
        Ok(())
    }

    async fn halt(&self, connection: &VoiceConnection) -> Result<()> {
        self.current_track(connection.guild_id)?
            .stop()
            .map_err(|e| PlayerError::Transport(e.to_string()))
    }

    async fn pause(&self, connection: &VoiceConnection) -> Result<()> {
        self.current_track(connection.guild_id)?
            .pause()
            .map_err(|e| PlayerError::Transport(e.to_string()))
    }

    async fn resume(&self, connection: &VoiceConnection) -> Result<()> {
        self.current_track(connection.guild_id)?
            .play()
            .map_err(|e| PlayerError::Transport(e.to_string()))
    }

    async fn disconnect(&self, connection: &VoiceConnection) -> Result<()> {
        if let Some((_, track)) = self.tracks.remove(&connection.guild_id) {
            let _ = track.stop();
        }

        self.manager
            .remove(connection.guild_id)
            .await
            .map_err(|e| PlayerError::Transport(format!("error al desconectar: {e}")))?;

        info!("👋 Desconectado del canal de voz en guild {}", connection.guild_id);
        Ok(())
    }

    fn members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId> {
        let Some(guild) = self.cache.guild(guild_id) else {
            debug!("Guild {} no está en caché", guild_id);
            return Vec::new();
        };

        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .filter(|state| !self.is_bot(state.user_id, state.member.as_ref().map(|m| m.user.bot)))
            .map(|state| state.user_id)
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum RelayKind {
    End,
    Error,
}

/// Reenvía los eventos de songbird al notifier de la sesión
struct TrackEventRelay {
    guild_id: GuildId,
    kind: RelayKind,
    notifier: PlaybackNotifier,
}

#[async_trait]
impl VoiceEventHandler for TrackEventRelay {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match self.kind {
            RelayKind::End => {
                debug!("🎵 Track terminó en guild {}", self.guild_id);
                self.notifier.notify(PlaybackEvent::Finished);
            }
            RelayKind::Error => {
                let mut reason = String::from("error de reproducción");
                if let EventContext::Track(track_list) = ctx {
                    for (state, _handle) in *track_list {
                        reason = format!("{:?}", state.playing);
                    }
                }
                error!("❌ Error en track para guild {}: {}", self.guild_id, reason);
                self.notifier.notify(PlaybackEvent::Errored(reason));
            }
        }

        None
    }
}

/// Adaptador s16le → f32le que songbird acepta como audio crudo
struct PcmSource {
    inner: Box<dyn Read + Send + Sync>,
    carry: Option<u8>,
    staged: VecDeque<u8>,
    finished: bool,
}

impl PcmSource {
    fn new(inner: Box<dyn Read + Send + Sync>) -> Self {
        Self {
            inner,
            carry: None,
            staged: VecDeque::new(),
            finished: false,
        }
    }

    /// Lee un bloque de PCM s16 y deja las muestras f32 en `staged`
    fn fill(&mut self) -> io::Result<()> {
        let mut raw = [0u8; 4096];
        let offset = match self.carry.take() {
            Some(byte) => {
                raw[0] = byte;
                1
            }
            None => 0,
        };

        let read = match self.inner.read(&mut raw[offset..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        };
        if read == 0 {
            self.finished = true;
            return Ok(());
        }

        let available = offset + read;
        let whole = available - available % 2;
        for pair in raw[..whole].chunks_exact(2) {
            let sample = i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0;
            self.staged.extend(sample.to_le_bytes());
        }
        if whole < available {
            self.carry = Some(raw[whole]);
        }
        Ok(())
    }
}

impl Read for PcmSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.staged.is_empty() && !self.finished {
            self.fill()?;
        }

        let n = buf.len().min(self.staged.len());
        for (slot, byte) in buf.iter_mut().zip(self.staged.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Seek for PcmSource {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        warn!("Seek no soportado en streams en vivo");
        Err(io::Error::new(io::ErrorKind::Unsupported, "stream no seekable"))
    }
}

impl MediaSource for PcmSource {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}
