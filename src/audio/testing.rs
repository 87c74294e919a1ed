//! Dobles de prueba para los colaboradores del reproductor.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use super::player::{EnqueueContext, MusicPlayer, PlayerSettings};
use crate::{
    error::{PlayerError, Result},
    sources::{ByteStream, MockSourceResolver, PlayableStream, TrackMetadata, Transcoder},
    ui::{MessageHandle, TextChannel},
    voice::{PlaybackEvent, PlaybackNotifier, VoiceConnection, VoiceTransport},
};

pub const GUILD: GuildId = GuildId::new(1);
pub const VOICE: ChannelId = ChannelId::new(100);

/// Deja correr las tareas pendientes (con el reloj pausado)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOp {
    Send(u64, String),
    Edit(u64, String),
}

#[derive(Default)]
pub struct FakeText {
    ops: Mutex<Vec<TextOp>>,
    next_id: AtomicU64,
    fail_edits: AtomicBool,
}

impl FakeText {
    pub fn fail_edits(&self) {
        self.fail_edits.store(true, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<TextOp> {
        self.ops.lock().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                TextOp::Send(_, text) => Some(text.clone()),
                TextOp::Edit(..) => None,
            })
            .collect()
    }
}

#[async_trait]
impl TextChannel for FakeText {
    async fn send(&self, text: &str) -> Result<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.ops.lock().push(TextOp::Send(id, text.to_string()));
        Ok(MessageHandle(id))
    }

    async fn edit(&self, message: MessageHandle, text: &str) -> Result<()> {
        self.ops.lock().push(TextOp::Edit(message.0, text.to_string()));
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(PlayerError::MessageGone);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTransport {
    joins: AtomicUsize,
    subscribes: AtomicUsize,
    halts: AtomicUsize,
    disconnects: AtomicUsize,
    join_delay: Mutex<Duration>,
    fail_next_subscribe: AtomicBool,
    fail_next_halt: AtomicBool,
    notifiers: Mutex<HashMap<GuildId, PlaybackNotifier>>,
    /// Sin entrada = 1 persona en el canal
    members: Mutex<HashMap<ChannelId, usize>>,
}

impl FakeTransport {
    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn set_join_delay(&self, delay: Duration) {
        *self.join_delay.lock() = delay;
    }

    pub fn fail_next_subscribe(&self) {
        self.fail_next_subscribe.store(true, Ordering::SeqCst);
    }

    /// El próximo `halt` falla sin emitir evento
    pub fn fail_next_halt(&self) {
        self.fail_next_halt.store(true, Ordering::SeqCst);
    }

    pub fn set_members(&self, channel_id: ChannelId, count: usize) {
        self.members.lock().insert(channel_id, count);
    }

    /// Fin natural del track actual de la guild
    pub fn finish(&self, guild_id: GuildId) {
        self.emit(guild_id, PlaybackEvent::Finished);
    }

    pub fn fail(&self, guild_id: GuildId, reason: &str) {
        self.emit(guild_id, PlaybackEvent::Errored(reason.to_string()));
    }

    fn emit(&self, guild_id: GuildId, event: PlaybackEvent) {
        let notifier = self.notifiers.lock().remove(&guild_id);
        if let Some(notifier) = notifier {
            notifier.notify(event);
        }
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<VoiceConnection> {
        let delay = *self.join_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.joins.fetch_add(1, Ordering::SeqCst);
        Ok(VoiceConnection {
            guild_id,
            channel_id,
        })
    }

    async fn subscribe(
        &self,
        connection: &VoiceConnection,
        _source: PlayableStream,
        notifier: PlaybackNotifier,
    ) -> Result<()> {
        if self.fail_next_subscribe.swap(false, Ordering::SeqCst) {
            return Err(PlayerError::Transport("subscribe rechazado".to_string()));
        }
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.notifiers.lock().insert(connection.guild_id, notifier);
        Ok(())
    }

    async fn halt(&self, connection: &VoiceConnection) -> Result<()> {
        self.halts.fetch_add(1, Ordering::SeqCst);
        if self.fail_next_halt.swap(false, Ordering::SeqCst) {
            return Err(PlayerError::Transport("halt rechazado".to_string()));
        }
        self.finish(connection.guild_id);
        Ok(())
    }

    async fn pause(&self, _connection: &VoiceConnection) -> Result<()> {
        Ok(())
    }

    async fn resume(&self, _connection: &VoiceConnection) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self, connection: &VoiceConnection) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.notifiers.lock().remove(&connection.guild_id);
        Ok(())
    }

    fn members(&self, _guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId> {
        let count = self.members.lock().get(&channel_id).copied().unwrap_or(1);
        (1..=count as u64).map(UserId::new).collect()
    }
}

/// Transcoder identidad: el stream ya "es" PCM
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn transcode(&self, input: ByteStream) -> Result<PlayableStream> {
        Ok(PlayableStream::new(input))
    }
}

/// Resolver con catálogo fijo: valida `https://`, falla los streams "broken"
pub fn resolver(catalog: &[(&str, &str, u64)]) -> MockSourceResolver {
    let catalog: HashMap<String, TrackMetadata> = catalog
        .iter()
        .map(|(url, title, secs)| {
            (
                url.to_string(),
                TrackMetadata {
                    title: title.to_string(),
                    duration_secs: *secs,
                },
            )
        })
        .collect();

    let mut mock = MockSourceResolver::new();
    mock.expect_validate()
        .returning(|url| url.starts_with("https://"));
    mock.expect_fetch_metadata().returning(move |url| {
        catalog
            .get(url)
            .cloned()
            .ok_or_else(|| PlayerError::Resolution(format!("video no disponible: {url}")))
    });
    mock.expect_open_stream().returning(|url| {
        if url.contains("broken") {
            Err(PlayerError::Resolution("stream no disponible".to_string()))
        } else {
            Ok(Box::new(std::io::empty()) as ByteStream)
        }
    });
    mock
}

pub struct Harness {
    pub player: MusicPlayer,
    pub transport: Arc<FakeTransport>,
    pub text: Arc<FakeText>,
}

impl Harness {
    pub fn context(&self) -> EnqueueContext {
        self.context_in(VOICE)
    }

    pub fn context_in(&self, voice_channel: ChannelId) -> EnqueueContext {
        EnqueueContext {
            text: self.text.clone(),
            voice_channel,
            requester: "tester#0001".to_string(),
        }
    }
}

/// Harness sin pausa entre tracks
pub fn harness(catalog: &[(&str, &str, u64)]) -> Harness {
    harness_with(
        catalog,
        PlayerSettings {
            advance_delay: Duration::ZERO,
            ..PlayerSettings::default()
        },
    )
}

pub fn harness_with(catalog: &[(&str, &str, u64)], settings: PlayerSettings) -> Harness {
    let transport = Arc::new(FakeTransport::default());
    let text = Arc::new(FakeText::default());
    let player = MusicPlayer::new(
        Arc::new(resolver(catalog)),
        Arc::new(PassthroughTranscoder),
        transport.clone(),
        settings,
    );

    Harness {
        player,
        transport,
        text,
    }
}
