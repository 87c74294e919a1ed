use async_process::Command;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{
    io::Read,
    process::{Child, ChildStdout, Stdio},
    sync::OnceLock,
    time::Duration,
};
use tracing::{debug, info, warn};

use super::{ByteStream, SourceResolver, TrackMetadata};
use crate::error::{PlayerError, Result};

/// Resolver de YouTube basado en yt-dlp
pub struct YtDlpResolver {
    binary: String,
    metadata_timeout: Duration,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: tokio::sync::Semaphore,
}

/// Información extraída de yt-dlp (solo lo que usamos)
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: String,
    duration: Option<f64>,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<String>, metadata_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            metadata_timeout,
            rate_limiter: tokio::sync::Semaphore::new(3),
        }
    }

    /// Verifica si una URL es válida para YouTube
    pub fn is_youtube_url(url: &str) -> bool {
        static YOUTUBE_REGEX: OnceLock<Regex> = OnceLock::new();
        YOUTUBE_REGEX
            .get_or_init(|| {
                Regex::new(
                    r"^(https?://)?(www\.)?(youtube\.com/(watch\?v=|embed/|v/|shorts/)|youtu\.be/|music\.youtube\.com/)",
                )
                .expect("regex de YouTube inválida")
            })
            .is_match(url)
    }

    fn parse_info(raw: &str) -> Result<TrackMetadata> {
        let info: YtDlpInfo = serde_json::from_str(raw)
            .map_err(|e| PlayerError::Resolution(format!("respuesta de yt-dlp inválida: {e}")))?;

        // Duración desconocida o en vivo → 0
        let duration_secs = info
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| d.floor() as u64)
            .unwrap_or(0);

        Ok(TrackMetadata {
            title: info.title,
            duration_secs,
        })
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    fn validate(&self, url: &str) -> bool {
        Self::is_youtube_url(url)
    }

    async fn fetch_metadata(&self, url: &str) -> Result<TrackMetadata> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| PlayerError::Resolution(e.to_string()))?;

        debug!("📊 Obteniendo info de: {}", url);

        let output = tokio::time::timeout(
            self.metadata_timeout,
            Command::new(&self.binary)
                .args(["--no-playlist", "--dump-json", "--skip-download", "--no-warnings", url])
                .output(),
        )
        .await
        .map_err(|_| PlayerError::Resolution(format!("timeout obteniendo info de {url}")))?
        .map_err(|e| PlayerError::Resolution(format!("error al ejecutar yt-dlp: {e}")))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("❌ yt-dlp falló para {}: {}", url, error.trim());
            return Err(PlayerError::Resolution(error.trim().to_string()));
        }

        let metadata = Self::parse_info(&String::from_utf8_lossy(&output.stdout))?;
        info!("✅ Metadata obtenida: {} ({}s)", metadata.title, metadata.duration_secs);
        Ok(metadata)
    }

    async fn open_stream(&self, url: &str) -> Result<ByteStream> {
        debug!("🎵 Abriendo stream de audio para: {}", url);

        let mut child = std::process::Command::new(&self.binary)
            .args(["--no-playlist", "-f", "bestaudio/best", "--quiet", "--no-warnings", "-o", "-", url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::Resolution(format!("error al ejecutar yt-dlp: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayerError::Resolution("yt-dlp sin stdout".to_string()))?;

        Ok(Box::new(ChildReader { child, stdout }))
    }
}

/// Stdout de un proceso hijo; mata el proceso al soltarse
pub(crate) struct ChildReader {
    pub(crate) child: Child,
    pub(crate) stdout: ChildStdout,
}

impl Read for ChildReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for ChildReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_url_detection() {
        assert!(YtDlpResolver::is_youtube_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpResolver::is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(YtDlpResolver::is_youtube_url(
            "https://music.youtube.com/watch?v=test"
        ));
        assert!(!YtDlpResolver::is_youtube_url("https://example.com/video"));
        assert!(!YtDlpResolver::is_youtube_url("not a url"));
    }

    #[test]
    fn parses_title_and_floors_duration() {
        let meta = YtDlpResolver::parse_info(r#"{"title": "Song A", "duration": 125.7}"#).unwrap();
        assert_eq!(meta.title, "Song A");
        assert_eq!(meta.duration_secs, 125);
    }

    #[test]
    fn missing_duration_is_unknown() {
        let meta = YtDlpResolver::parse_info(r#"{"title": "Live", "duration": null}"#).unwrap();
        assert_eq!(meta.duration_secs, 0);

        let meta = YtDlpResolver::parse_info(r#"{"title": "Live"}"#).unwrap();
        assert_eq!(meta.duration_secs, 0);
    }

    #[test]
    fn garbage_output_is_a_resolution_error() {
        let err = YtDlpResolver::parse_info("ERROR: video unavailable").unwrap_err();
        assert!(matches!(err, PlayerError::Resolution(_)));
    }
}
