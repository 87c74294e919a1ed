use serenity::model::id::{ChannelId, GuildId};
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{sync::MutexGuard, time::Instant};
use tracing::{debug, error, info, warn};

use super::{
    progress::{self, Progress, ProgressReporter},
    queue::Track,
    registry::SessionRegistry,
    session::{ActiveTrack, Session, SessionInner, SessionState},
};
use crate::{
    config::Config,
    error::{PlayerError, Result},
    sources::{PlayableStream, SourceResolver, Transcoder},
    ui::{messages, TextChannel},
    voice::{PlaybackEvent, PlaybackNotifier, VoiceConnection, VoiceTransport},
};

/// Tiempos y límites del reproductor
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub progress_interval: Duration,
    pub grace_period: Duration,
    pub progress_bar_width: usize,
    pub queue_display_limit: usize,
    /// Pausa entre el fin de un track y el intento del siguiente
    pub advance_delay: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(5),
            grace_period: Duration::from_secs(15),
            progress_bar_width: 20,
            queue_display_limit: 10,
            advance_delay: Duration::from_millis(500),
        }
    }
}

impl From<&Config> for PlayerSettings {
    fn from(config: &Config) -> Self {
        Self {
            progress_interval: Duration::from_secs(config.progress_interval_secs),
            grace_period: Duration::from_secs(config.grace_period_secs),
            progress_bar_width: config.progress_bar_width,
            queue_display_limit: config.queue_display_limit,
            advance_delay: Duration::from_millis(config.advance_delay_ms),
        }
    }
}

/// Contexto de quien pide una canción
#[derive(Clone)]
pub struct EnqueueContext {
    /// Canal donde se publican anuncios y progreso
    pub text: Arc<dyn TextChannel>,
    pub voice_channel: ChannelId,
    pub requester: String,
}

pub(crate) struct PlayerInner {
    pub registry: SessionRegistry,
    pub resolver: Arc<dyn SourceResolver>,
    pub transcoder: Arc<dyn Transcoder>,
    pub transport: Arc<dyn VoiceTransport>,
    pub settings: PlayerSettings,
}

/// Reproductor multi-guild.
///
/// Cada guild tiene su propia [`Session`] con un mutex; las operaciones de
/// guilds distintas nunca se bloquean entre sí. El lock de una sesión no se
/// mantiene mientras se conecta al canal, se abre el stream o se transcodifica.
#[derive(Clone)]
pub struct MusicPlayer {
    pub(crate) inner: Arc<PlayerInner>,
}

impl MusicPlayer {
    pub fn new(
        resolver: Arc<dyn SourceResolver>,
        transcoder: Arc<dyn Transcoder>,
        transport: Arc<dyn VoiceTransport>,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(PlayerInner {
                registry: SessionRegistry::new(),
                resolver,
                transcoder,
                transport,
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.inner.settings
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Agrega una canción y devuelve su posición en la cola (desde 1).
    /// Si la sesión estaba inactiva arranca la reproducción.
    pub async fn enqueue(&self, guild_id: GuildId, url: &str, context: EnqueueContext) -> Result<usize> {
        if !self.inner.resolver.validate(url) {
            info!("🚫 URL rechazada en guild {}: {}", guild_id, url);
            return Err(PlayerError::InvalidTrack(url.to_string()));
        }

        let metadata = self.inner.resolver.fetch_metadata(url).await?;
        let track = Track::new(url, metadata.title, metadata.duration_secs, context.requester.clone());

        let (session, position, should_start) = loop {
            let session = self.inner.registry.get_or_create(guild_id, || {
                Session::new(guild_id, context.voice_channel, context.text.clone())
            });

            let mut inner = session.lock().await;
            if inner.state == SessionState::Stopped {
                // La sesión vieja ya salió del registro al soltar el lock
                continue;
            }

            let position = inner.queue.enqueue(track.clone());
            debug!(
                "📋 Cola de guild {}: {} canciones, {}",
                guild_id,
                inner.queue.len(),
                humantime::format_duration(inner.queue.total_duration())
            );
            let should_start = inner.state == SessionState::Idle;
            if should_start {
                inner.begin_attempt();
            }
            drop(inner);
            break (session, position, should_start);
        };

        send(session.text(), &messages::track_added(&track, position)).await;

        if should_start {
            self.play_next(&session).await;
        }
        Ok(position)
    }

    /// Fuerza el fin del track actual; el siguiente arranca solo
    pub async fn skip(&self, guild_id: GuildId) -> bool {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return false;
        };

        let inner = session.lock().await;
        if !matches!(inner.state, SessionState::Playing | SessionState::Paused) {
            return false;
        }
        let epoch = inner.epoch;
        let Some(connection) = inner.connection.clone() else {
            return false;
        };
        let halted = self.inner.transport.halt(&connection).await;
        drop(inner);

        info!("⏭️ Saltando track en guild {}", guild_id);
        if let Err(e) = halted {
            // Sin evento del transporte: avanzar a mano
            warn!("❌ No se pudo detener el track en guild {}: {}", guild_id, e);
            self.handle_playback_event(session, epoch, PlaybackEvent::Finished)
                .await;
        }
        true
    }

    /// El bot salió de `channel_id` por fuera del reproductor. Solo detiene la
    /// sesión si su conexión sigue en ese canal; el eco de una desconexión
    /// propia no toca a una sesión sucesora.
    pub async fn on_bot_disconnected(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return false;
        };
        let inner = session.lock().await;
        let connected_here = inner
            .connection
            .as_ref()
            .is_some_and(|connection| connection.channel_id == channel_id);
        if !connected_here {
            debug!("Desconexión de {} ignorada en guild {}", channel_id, guild_id);
            return false;
        }

        info!("🔌 Bot desconectado externamente en guild {}", guild_id);
        self.teardown_session(&session, inner, None).await
    }

    /// Detiene la sesión y la elimina del registro. Idempotente.
    pub async fn stop(&self, guild_id: GuildId) -> bool {
        let Some(session) = self.inner.registry.get(guild_id) else {
            debug!("Sin sesión que detener en guild {}", guild_id);
            return false;
        };
        let inner = session.lock().await;
        self.teardown_session(&session, inner, None).await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<bool> {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return Ok(false);
        };
        let mut inner = session.lock().await;
        if inner.state != SessionState::Playing {
            return Ok(false);
        }
        let Some(connection) = inner.connection.clone() else {
            return Ok(false);
        };

        self.inner.transport.pause(&connection).await?;
        inner.state = SessionState::Paused;
        if let Some(active) = inner.active.as_mut() {
            active.pause(Instant::now());
        }
        info!("⏸️ Reproducción pausada en guild {}", guild_id);
        Ok(true)
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<bool> {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return Ok(false);
        };
        let mut inner = session.lock().await;
        if inner.state != SessionState::Paused {
            return Ok(false);
        }
        let Some(connection) = inner.connection.clone() else {
            return Ok(false);
        };

        self.inner.transport.resume(&connection).await?;
        inner.state = SessionState::Playing;
        if let Some(active) = inner.active.as_mut() {
            active.resume(Instant::now());
        }
        info!("▶️ Reproducción reanudada en guild {}", guild_id);
        Ok(true)
    }

    pub async fn state(&self, guild_id: GuildId) -> Option<SessionState> {
        let session = self.inner.registry.get(guild_id)?;
        Some(session.state().await)
    }

    pub async fn now_playing(&self, guild_id: GuildId) -> String {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return messages::NOTHING_PLAYING.to_string();
        };
        let inner = session.lock().await;
        match &inner.active {
            Some(active) => {
                let progress = Progress::compute(active.elapsed(Instant::now()), active.track.duration_secs);
                progress::now_playing_text(&active.track.title, &progress, self.inner.settings.progress_bar_width)
            }
            None => messages::NOTHING_PLAYING.to_string(),
        }
    }

    /// Listado de la cola (sin el track activo), truncado para mostrar
    pub async fn queue_text(&self, guild_id: GuildId) -> String {
        let Some(session) = self.inner.registry.get(guild_id) else {
            return messages::QUEUE_EMPTY.to_string();
        };
        let tracks = session
            .lock()
            .await
            .queue
            .snapshot(self.inner.settings.queue_display_limit);
        messages::queue_listing(&tracks)
    }

    /// Intenta arrancar tracks de la cola hasta que uno suene o se vacíe.
    /// Requiere que quien llama ya haya pasado la sesión a Connecting.
    pub(crate) async fn play_next(&self, session: &Arc<Session>) {
        let guild_id = session.guild_id();

        loop {
            let (track, epoch, existing) = {
                let mut inner = session.lock().await;
                if inner.state != SessionState::Connecting {
                    debug!("Intento cancelado en guild {} ({:?})", guild_id, inner.state);
                    return;
                }

                match inner.queue.dequeue_next() {
                    Some(track) => {
                        inner.epoch += 1;
                        (track, inner.epoch, inner.connection.clone())
                    }
                    None => {
                        inner.state = SessionState::Idle;
                        self.arm_disconnect_timer(session, &mut inner);
                        drop(inner);
                        info!("📭 Cola vacía en guild {}", guild_id);
                        send(
                            session.text(),
                            &messages::queue_drained(self.inner.settings.grace_period.as_secs()),
                        )
                        .await;
                        return;
                    }
                }
            };

            // Sin lock: conectar, abrir y transcodificar
            let joined_here = existing.is_none();
            let (connection, stream) = self.acquire(session, &track, existing).await;

            let mut inner = session.lock().await;
            if inner.state != SessionState::Connecting || inner.epoch != epoch {
                // stop ganó mientras conectábamos: descartar el resultado
                drop(inner);
                info!("⏹️ Intento descartado en guild {}: la sesión se detuvo", guild_id);
                if let Some(connection) = connection.filter(|_| joined_here) {
                    if let Err(e) = self.inner.transport.disconnect(&connection).await {
                        warn!("Error al liberar conexión descartada: {}", e);
                    }
                }
                return;
            }

            if connection.is_some() {
                inner.connection = connection.clone();
            }

            let failure = match (connection, stream) {
                (Some(connection), Ok(playable)) => {
                    match self.commit_playing(session, &mut inner, &connection, &track, epoch, playable).await {
                        Ok(()) => {
                            drop(inner);
                            info!("🎵 Reproduciendo en guild {}: {}", guild_id, track.title);
                            send(session.text(), &messages::now_playing_started(&track)).await;
                            return;
                        }
                        Err(e) => {
                            error!("❌ Error de suscripción en guild {}: {}", guild_id, e);
                            e
                        }
                    }
                }
                (_, Err(e)) => {
                    warn!("❌ No se pudo preparar {} en guild {}: {}", track.title, guild_id, e);
                    e
                }
                (None, Ok(_)) => PlayerError::Transport("sin conexión de voz".to_string()),
            };
            drop(inner);

            // El track se descarta sin reintentos; seguir con el siguiente
            send(session.text(), &messages::track_failed(&track, &failure.to_string())).await;
        }
    }

    async fn acquire(
        &self,
        session: &Session,
        track: &Track,
        existing: Option<VoiceConnection>,
    ) -> (Option<VoiceConnection>, Result<PlayableStream>) {
        let connection = match existing {
            Some(connection) => connection,
            None => match self
                .inner
                .transport
                .join(session.guild_id(), session.voice_channel())
                .await
            {
                Ok(connection) => connection,
                Err(e) => return (None, Err(e)),
            },
        };

        let stream = async {
            let raw = self.inner.resolver.open_stream(&track.url).await?;
            self.inner.transcoder.transcode(raw).await
        }
        .await;

        (Some(connection), stream)
    }

    /// Suscribe el stream y pasa a Playing, todo bajo el lock
    async fn commit_playing(
        &self,
        session: &Arc<Session>,
        inner: &mut SessionInner,
        connection: &VoiceConnection,
        track: &Track,
        epoch: u64,
        playable: PlayableStream,
    ) -> Result<()> {
        self.inner
            .transport
            .subscribe(connection, playable, self.notifier(session, epoch))
            .await?;

        inner.state = SessionState::Playing;
        inner.active = Some(ActiveTrack::new(track.clone(), Instant::now()));
        inner.progress = Some(ProgressReporter::start(
            session,
            epoch,
            self.inner.settings.progress_interval,
            self.inner.settings.progress_bar_width,
        ));
        Ok(())
    }

    /// Callback del transporte atado a la sesión y al intento `epoch`
    fn notifier(&self, session: &Arc<Session>, epoch: u64) -> PlaybackNotifier {
        let player: Weak<PlayerInner> = Arc::downgrade(&self.inner);
        let session = Arc::downgrade(session);

        PlaybackNotifier::new(move |event| {
            let (Some(inner), Some(session)) = (player.upgrade(), session.upgrade()) else {
                return;
            };
            let player = MusicPlayer { inner };
            tokio::spawn(async move {
                player.handle_playback_event(session, epoch, event).await;
            });
        })
    }

    /// Fin (natural, forzado o por error) del track del intento `epoch`
    pub(crate) async fn handle_playback_event(&self, session: Arc<Session>, epoch: u64, event: PlaybackEvent) {
        let guild_id = session.guild_id();

        let finished = {
            let mut inner = session.lock().await;
            if inner.epoch != epoch
                || !matches!(inner.state, SessionState::Playing | SessionState::Paused)
            {
                debug!("Evento {:?} obsoleto en guild {}", event, guild_id);
                return;
            }

            let finished = inner.finish_active();
            inner.state = SessionState::Idle;
            // Connecting ya reserva el próximo intento
            inner.begin_attempt();
            finished
        };

        if let Some(finished) = &finished {
            if let PlaybackEvent::Errored(reason) = &event {
                error!("❌ Error de reproducción en guild {}: {}", guild_id, reason);
                send(session.text(), &messages::track_failed(&finished.track, reason)).await;
            }
            progress::finish(session.text(), &finished.track, finished.message).await;
        }

        let delay = self.inner.settings.advance_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.play_next(&session).await;
    }

    /// Lleva la sesión a Stopped bajo el lock recibido: cancela timers y
    /// progreso, limpia la cola, desconecta y la quita del registro.
    pub(crate) async fn teardown_session(
        &self,
        session: &Arc<Session>,
        mut inner: MutexGuard<'_, SessionInner>,
        notice: Option<&str>,
    ) -> bool {
        if inner.state == SessionState::Stopped {
            return false;
        }

        let guild_id = session.guild_id();
        let teardown = inner.teardown();
        if let Some(connection) = &teardown.connection {
            if let Err(e) = self.inner.transport.disconnect(connection).await {
                warn!("Error al desconectar en guild {}: {}", guild_id, e);
            }
        }
        self.inner.registry.remove(guild_id, session);
        drop(inner);

        if let Some(finished) = teardown.finished {
            progress::finish(session.text(), &finished.track, finished.message).await;
        }
        if let Some(notice) = notice {
            send(session.text(), notice).await;
        }
        info!("⏹️ Sesión detenida en guild {}", guild_id);
        true
    }
}

/// Envía un texto; los fallos solo se registran
pub(crate) async fn send(text: &dyn TextChannel, message: &str) {
    if let Err(e) = text.send(message).await {
        warn!("Error al enviar mensaje: {}", e);
    }
}
