//! # Sources Module
//!
//! Contracts for the collaborators that turn a URL into playable audio:
//!
//! - [`SourceResolver`]: URL validation, metadata lookup and the raw
//!   audio-only byte stream
//! - [`Transcoder`]: raw stream → PCM in the fixed Discord format
//!   (16-bit little-endian, 48kHz, stereo)
//!
//! The concrete implementations shell out to `yt-dlp` ([`youtube`]) and
//! `ffmpeg` ([`ffmpeg`]). Streams are blocking [`Read`] handles because they
//! are consumed on songbird's decoder threads, never on the async runtime.

pub mod ffmpeg;
pub mod youtube;

use async_trait::async_trait;
use std::io::Read;

use crate::error::Result;

pub use ffmpeg::FfmpegTranscoder;
pub use youtube::YtDlpResolver;

/// Stream de bytes crudo (contenedor original, solo audio)
pub type ByteStream = Box<dyn Read + Send + Sync>;

/// Metadata mínima de un track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    /// Duración en segundos, 0 = desconocida
    pub duration_secs: u64,
}

/// Formato PCM de salida del transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

impl PcmFormat {
    /// s16le @ 48kHz estéreo, lo que espera Discord
    pub const DISCORD: PcmFormat = PcmFormat {
        sample_rate: 48_000,
        channels: 2,
    };
}

/// PCM interleaved s16le listo para el transporte de voz
pub struct PlayableStream {
    reader: Box<dyn Read + Send + Sync>,
    format: PcmFormat,
}

impl PlayableStream {
    pub fn new(reader: impl Read + Send + Sync + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            format: PcmFormat::DISCORD,
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn into_reader(self) -> Box<dyn Read + Send + Sync> {
        self.reader
    }
}

impl std::fmt::Debug for PlayableStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayableStream")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

/// Resolución de fuentes de audio
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Verifica si la URL es válida para esta fuente
    fn validate(&self, url: &str) -> bool;

    /// Obtiene título y duración. Falla con `Resolution` si la fuente no existe
    async fn fetch_metadata(&self, url: &str) -> Result<TrackMetadata>;

    /// Abre el stream de audio (solo audio)
    async fn open_stream(&self, url: &str) -> Result<ByteStream>;
}

/// Conversión del stream crudo a PCM reproducible
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: ByteStream) -> Result<PlayableStream>;
}
