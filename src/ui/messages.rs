//! Textos que el bot publica en el canal de texto.

use crate::audio::queue::Track;

pub const NOTHING_PLAYING: &str = "🔇 No hay ninguna canción reproduciéndose.";
pub const QUEUE_EMPTY: &str = "📭 La cola está vacía.";

/// Formatea segundos como `m:ss` (piso, segundos con dos dígitos)
pub fn format_time(secs: f64) -> String {
    if !secs.is_finite() || secs <= 0.0 {
        return "0:00".to_string();
    }
    let total = secs.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

pub fn track_added(track: &Track, position: usize) -> String {
    format!(
        "🎶 Agregado a la cola: **{}** ({}) — posición #{}",
        track.title,
        format_time(track.duration_secs as f64),
        position
    )
}

pub fn now_playing_started(track: &Track) -> String {
    format!(
        "▶️ Reproduciendo: **{}** ({})",
        track.title,
        format_time(track.duration_secs as f64)
    )
}

pub fn playback_ended(track: &Track) -> String {
    format!("⏹️ Reproducción terminada: {}", track.title)
}

pub fn track_failed(track: &Track, reason: &str) -> String {
    format!("❌ No se pudo reproducir **{}**: {}", track.title, reason)
}

pub fn queue_drained(grace_secs: u64) -> String {
    format!(
        "📭 La cola está vacía. Si no queda nadie en el canal me desconectaré en {} segundos.",
        grace_secs
    )
}

pub fn channel_empty(grace_secs: u64) -> String {
    format!(
        "⚠️ No hay nadie en el canal de voz. Me desconectaré en {} segundos.",
        grace_secs
    )
}

pub const DISCONNECT_CANCELLED: &str = "✅ Alguien volvió, se canceló la desconexión.";
pub const DISCONNECTED_EMPTY: &str = "👋 Me desconecté porque no quedaba nadie en el canal.";

/// Listado de la cola, una línea por track
pub fn queue_listing(tracks: &[Track]) -> String {
    if tracks.is_empty() {
        return QUEUE_EMPTY.to_string();
    }
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {} ({})", i + 1, t.title, format_time(t.duration_secs as f64)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(title: &str, secs: u64) -> Track {
        Track::new("https://youtu.be/x", title, secs, "tester")
    }

    #[test]
    fn formats_minutes_and_padded_seconds() {
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(125.0), "2:05");
        assert_eq!(format_time(59.99), "0:59");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn degenerate_times_render_as_zero() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::NAN), "0:00");
    }

    #[test]
    fn queue_listing_numbers_from_one() {
        let text = queue_listing(&[track("Song A", 125), track("Song B", 61)]);
        assert_eq!(text, "1. Song A (2:05)\n2. Song B (1:01)");
    }

    #[test]
    fn empty_queue_listing() {
        assert_eq!(queue_listing(&[]), QUEUE_EMPTY);
    }

    #[test]
    fn added_announcement_includes_position() {
        assert_eq!(
            track_added(&track("Song A", 125), 3),
            "🎶 Agregado a la cola: **Song A** (2:05) — posición #3"
        );
    }
}
