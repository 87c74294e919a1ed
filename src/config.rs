use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Reproducción
    pub progress_interval_secs: u64,
    pub grace_period_secs: u64,
    pub advance_delay_ms: u64,

    // Presentación
    pub progress_bar_width: usize,
    pub queue_display_limit: usize,

    // Herramientas externas
    pub metadata_timeout_secs: u64,
    pub ytdlp_path: String,
    pub ffmpeg_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN")?,

            // Reproducción
            progress_interval_secs: std::env::var("PROGRESS_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            grace_period_secs: std::env::var("GRACE_PERIOD_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()?,
            advance_delay_ms: std::env::var("ADVANCE_DELAY_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()?,

            // Presentación
            progress_bar_width: std::env::var("PROGRESS_BAR_WIDTH")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            queue_display_limit: std::env::var("QUEUE_DISPLAY_LIMIT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,

            // Herramientas externas
            metadata_timeout_secs: std::env::var("METADATA_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            ffmpeg_path: std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - The Discord token must be present
    /// - Progress interval, grace period and metadata timeout must be > 0
    /// - Bar width and queue display limit must be > 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN no puede estar vacío");
        }

        if self.progress_interval_secs == 0 {
            anyhow::bail!("Progress interval must be greater than 0");
        }

        if self.grace_period_secs == 0 {
            anyhow::bail!("Grace period must be greater than 0");
        }

        if self.metadata_timeout_secs == 0 {
            anyhow::bail!("Metadata timeout must be greater than 0");
        }

        if self.progress_bar_width == 0 || self.progress_bar_width > 100 {
            anyhow::bail!(
                "Progress bar width must be between 1 and 100, got: {}",
                self.progress_bar_width
            );
        }

        if self.queue_display_limit == 0 {
            anyhow::bail!("Queue display limit must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Playback: progress every {}, disconnect after {}, advance delay {}\n  \
            Display: {}-char bar, {} queue entries\n  \
            Tools: {} (timeout {}), {}",
            humantime::format_duration(Duration::from_secs(self.progress_interval_secs)),
            humantime::format_duration(Duration::from_secs(self.grace_period_secs)),
            humantime::format_duration(Duration::from_millis(self.advance_delay_ms)),
            self.progress_bar_width,
            self.queue_display_limit,
            self.ytdlp_path,
            humantime::format_duration(Duration::from_secs(self.metadata_timeout_secs)),
            self.ffmpeg_path,
        )
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (sin default, debe venir del entorno)
            discord_token: String::new(),

            progress_interval_secs: 5,
            grace_period_secs: 15,
            advance_delay_ms: 500,

            progress_bar_width: 20,
            queue_display_limit: 10,

            metadata_timeout_secs: 30,
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlayerSettings;

    fn valid() -> Config {
        Config {
            discord_token: "token".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_player_settings() {
        let settings = PlayerSettings::from(&valid());
        let defaults = PlayerSettings::default();

        assert_eq!(settings.progress_interval, defaults.progress_interval);
        assert_eq!(settings.grace_period, defaults.grace_period);
        assert_eq!(settings.advance_delay, defaults.advance_delay);
        assert_eq!(settings.progress_bar_width, defaults.progress_bar_width);
        assert_eq!(settings.queue_display_limit, defaults.queue_display_limit);
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(valid().validate().is_ok());
        assert!(Config::default().validate().is_err());

        let zero_grace = Config {
            grace_period_secs: 0,
            ..valid()
        };
        assert!(zero_grace.validate().is_err());

        let wide_bar = Config {
            progress_bar_width: 500,
            ..valid()
        };
        assert!(wide_bar.validate().is_err());
    }

    #[test]
    fn summary_hides_the_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..Config::default()
        };
        let summary = config.summary();

        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("disconnect after 15s"));
        assert!(summary.contains("advance delay 500ms"));
    }
}
