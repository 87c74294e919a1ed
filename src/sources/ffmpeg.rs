use async_trait::async_trait;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

use super::{youtube::ChildReader, ByteStream, PlayableStream, PcmFormat, Transcoder};
use crate::error::{PlayerError, Result};

/// Transcoder basado en ffmpeg: cualquier contenedor → s16le 48kHz estéreo
pub struct FfmpegTranscoder {
    binary: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args(format: PcmFormat) -> Vec<String> {
        vec![
            "-analyzeduration".into(),
            "0".into(),
            "-loglevel".into(),
            "0".into(),
            "-i".into(),
            "pipe:0".into(),
            "-f".into(),
            "s16le".into(),
            "-ar".into(),
            format.sample_rate.to_string(),
            "-ac".into(),
            format.channels.to_string(),
            "pipe:1".into(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, mut input: ByteStream) -> Result<PlayableStream> {
        let mut child = Command::new(&self.binary)
            .args(Self::args(PcmFormat::DISCORD))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::Resolution(format!("error al ejecutar ffmpeg: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PlayerError::Resolution("ffmpeg sin stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayerError::Resolution("ffmpeg sin stdout".to_string()))?;

        // Alimentar ffmpeg desde el stream crudo en un hilo bloqueante
        tokio::task::spawn_blocking(move || match std::io::copy(&mut input, &mut stdin) {
            Ok(bytes) => debug!("📥 {} bytes enviados a ffmpeg", bytes),
            // El lector se cierra al saltar/detener: no es un error real
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Err(e) => warn!("❌ Error alimentando ffmpeg: {}", e),
        });

        Ok(PlayableStream::new(ChildReader { child, stdout }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_is_discord_pcm() {
        let args = FfmpegTranscoder::args(PcmFormat::DISCORD).join(" ");
        assert_eq!(
            args,
            "-analyzeduration 0 -loglevel 0 -i pipe:0 -f s16le -ar 48000 -ac 2 pipe:1"
        );
    }
}
