//! Reporte periódico de progreso del track activo.
//!
//! Cada intervalo se recalcula el tiempo transcurrido y se publica una barra
//! de texto. El primer tick envía un mensaje nuevo; los siguientes lo editan
//! en su lugar, así que hay como mucho un mensaje de progreso vivo por
//! sesión. Al terminar el track el mensaje se reemplaza por un aviso final.

use std::{sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{queue::Track, session::{Session, SessionState}};
use crate::{
    error::PlayerError,
    ui::{messages::{self, format_time}, MessageHandle, TextChannel},
};

const FILLED: &str = "▮";
const EMPTY: &str = "▯";

/// Progreso calculado de un track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Segundos transcurridos (sin redondear)
    pub elapsed: f64,
    pub duration_secs: u64,
    /// Siempre en [0, 1]
    pub percent: f64,
}

impl Progress {
    /// Duración 0 (desconocida) se trata como 1 segundo; el porcentaje se
    /// recorta después de calcularlo.
    pub fn compute(elapsed: Duration, duration_secs: u64) -> Self {
        let elapsed = elapsed.as_secs_f64();
        let percent = (elapsed / duration_secs.max(1) as f64).clamp(0.0, 1.0);
        Self {
            elapsed,
            duration_secs,
            percent,
        }
    }

    pub fn percent_display(&self) -> u32 {
        (self.percent * 100.0).round() as u32
    }

    /// `m:ss / m:ss`
    pub fn times(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.elapsed),
            format_time(self.duration_secs as f64)
        )
    }
}

/// Barra de ancho fijo proporcional a `percent`
pub fn render_bar(percent: f64, width: usize) -> String {
    let percent = if percent.is_finite() { percent.clamp(0.0, 1.0) } else { 0.0 };
    let filled = ((percent * width as f64).round() as usize).min(width);
    FILLED.repeat(filled) + &EMPTY.repeat(width - filled)
}

/// Texto del mensaje de progreso periódico
pub fn status_text(title: &str, progress: &Progress, width: usize) -> String {
    format!(
        "**Now Playing**: {}\n{} {}% — {}",
        title,
        render_bar(progress.percent, width),
        progress.percent_display(),
        progress.times()
    )
}

/// Texto de `now_playing`
pub fn now_playing_text(title: &str, progress: &Progress, width: usize) -> String {
    format!(
        "🎵 **{}** — {}\n{} {}%",
        title,
        progress.times(),
        render_bar(progress.percent, width),
        progress.percent_display()
    )
}

/// Handle del intervalo de progreso y del mensaje que edita
#[derive(Debug)]
pub(crate) struct ProgressReporter {
    token: CancellationToken,
    message: Option<MessageHandle>,
}

impl ProgressReporter {
    /// Arranca el intervalo para el intento `epoch` de la sesión
    pub fn start(session: &Arc<Session>, epoch: u64, period: Duration, bar_width: usize) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let session = Arc::downgrade(session);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        let Some(session) = session.upgrade() else { break };
                        if !tick(&session, epoch, bar_width).await {
                            break;
                        }
                    }
                }
            }
            debug!("⏱️ Intervalo de progreso terminado (epoch {})", epoch);
        });

        Self {
            token,
            message: None,
        }
    }

    /// Cancela el intervalo (idempotente) y entrega el mensaje a cerrar
    pub fn cancel(self) -> Option<MessageHandle> {
        self.token.cancel();
        self.message
    }
}

/// Un tick: crea o edita el mensaje bajo el lock de la sesión.
/// Devuelve `false` cuando el intervalo ya no tiene sentido.
async fn tick(session: &Session, epoch: u64, bar_width: usize) -> bool {
    let mut inner = session.lock().await;
    if inner.epoch != epoch {
        return false;
    }
    match inner.state {
        SessionState::Playing => {}
        SessionState::Paused => return true,
        _ => return false,
    }

    let text = match &inner.active {
        Some(active) => {
            let progress = Progress::compute(active.elapsed(Instant::now()), active.track.duration_secs);
            status_text(&active.track.title, &progress, bar_width)
        }
        None => return false,
    };

    let Some(reporter) = inner.progress.as_mut() else {
        return false;
    };

    match reporter.message {
        None => match session.text().send(&text).await {
            Ok(handle) => reporter.message = Some(handle),
            Err(e) => warn!("Error al enviar progreso en guild {}: {}", session.guild_id(), e),
        },
        Some(handle) => {
            // Un fallo de edición no detiene el intervalo
            if let Err(e) = session.text().edit(handle, &text).await {
                warn!("Error al actualizar progreso en guild {}: {}", session.guild_id(), e);
            }
        }
    }
    true
}

/// Reemplaza el último mensaje de progreso por el aviso de fin.
/// Los errores se registran y se ignoran.
pub(crate) async fn finish(text: &dyn TextChannel, track: &Track, message: Option<MessageHandle>) {
    let Some(message) = message else { return };

    match text.edit(message, &messages::playback_ended(track)).await {
        Ok(()) => {}
        Err(PlayerError::MessageGone) => debug!("Mensaje de progreso ya borrado: {}", track.title),
        Err(e) => warn!("Error al cerrar mensaje de progreso: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn example_progress_at_65_of_125_seconds() {
        let progress = Progress::compute(Duration::from_secs(65), 125);
        assert_eq!(progress.times(), "1:05 / 2:05");
        assert_eq!(progress.percent_display(), 52);
    }

    #[test]
    fn percent_is_clamped_past_the_end() {
        let progress = Progress::compute(Duration::from_secs(500), 125);
        assert_eq!(progress.percent, 1.0);
        assert_eq!(progress.percent_display(), 100);
        // El tiempo mostrado no se recorta
        assert_eq!(progress.times(), "8:20 / 2:05");
    }

    #[test]
    fn unknown_duration_does_not_divide_by_zero() {
        let start = Progress::compute(Duration::ZERO, 0);
        assert_eq!(start.percent, 0.0);

        let half = Progress::compute(Duration::from_millis(500), 0);
        assert_eq!(half.percent, 0.5);

        let later = Progress::compute(Duration::from_secs(30), 0);
        assert_eq!(later.percent, 1.0);
        assert_eq!(later.times(), "0:30 / 0:00");
    }

    #[test]
    fn bar_is_proportional_and_fixed_width() {
        assert_eq!(render_bar(0.0, 20), "▯".repeat(20));
        assert_eq!(render_bar(1.0, 20), "▮".repeat(20));
        assert_eq!(render_bar(0.52, 20), "▮".repeat(10) + &"▯".repeat(10));
        assert_eq!(render_bar(0.5, 4), "▮▮▯▯");
        assert_eq!(render_bar(7.0, 5).chars().count(), 5);
        assert_eq!(render_bar(f64::NAN, 5), "▯".repeat(5));
    }

    #[test]
    fn status_text_layout() {
        let progress = Progress::compute(Duration::from_secs(65), 125);
        assert_eq!(
            status_text("Song A", &progress, 10),
            "**Now Playing**: Song A\n▮▮▮▮▮▯▯▯▯▯ 52% — 1:05 / 2:05"
        );
        assert_eq!(
            now_playing_text("Song A", &progress, 10),
            "🎵 **Song A** — 1:05 / 2:05\n▮▮▮▮▮▯▯▯▯▯ 52%"
        );
    }
}
