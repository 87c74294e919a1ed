use std::{collections::VecDeque, time::Duration};
use tracing::{debug, info};

/// Un item reproducible de la cola. Inmutable una vez creado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub url: String,
    pub title: String,
    /// Segundos, 0 = desconocida
    pub duration_secs: u64,
    pub requester: String,
}

impl Track {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        duration_secs: u64,
        requester: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            duration_secs,
            requester: requester.into(),
        }
    }
}

/// Cola FIFO de una guild. Sin prioridades ni shuffle.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final y devuelve su posición (desde 1)
    pub fn enqueue(&mut self, track: Track) -> usize {
        info!("➕ Agregado a la cola: {}", track.title);
        self.items.push_back(track);
        self.items.len()
    }

    /// Saca la cabeza de la cola
    pub fn dequeue_next(&mut self) -> Option<Track> {
        let next = self.items.pop_front();
        match &next {
            Some(track) => debug!("➡️ Siguiente en cola: {}", track.title),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }
        next
    }

    /// Copia de los primeros `limit` tracks, sin mutar
    pub fn snapshot(&self, limit: usize) -> Vec<Track> {
        self.items.iter().take(limit).cloned().collect()
    }

    pub fn clear(&mut self) {
        if !self.items.is_empty() {
            info!("🗑️ Cola limpiada ({} canciones)", self.items.len());
        }
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Duración total conocida (los tracks sin duración no suman)
    pub fn total_duration(&self) -> Duration {
        Duration::from_secs(self.items.iter().map(|t| t.duration_secs).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track(n: usize) -> Track {
        Track::new(format!("https://youtu.be/{n}"), format!("Song {n}"), 60, "tester")
    }

    #[test]
    fn positions_are_one_based() {
        let mut q = TrackQueue::new();
        assert_eq!(q.enqueue(track(1)), 1);
        assert_eq!(q.enqueue(track(2)), 2);
    }

    #[test]
    fn snapshot_keeps_order_and_truncates() {
        let mut q = TrackQueue::new();
        for n in 0..15 {
            q.enqueue(track(n));
        }

        let snap = q.snapshot(10);
        let titles: Vec<String> = snap.iter().map(|t| t.title.clone()).collect();
        assert_eq!(titles, (0..10).map(|n| format!("Song {n}")).collect::<Vec<_>>());

        // Internamente no se trunca
        assert_eq!(q.len(), 15);
    }

    #[test]
    fn dequeue_removes_head() {
        let mut q = TrackQueue::new();
        q.enqueue(track(1));
        q.enqueue(track(2));

        assert_eq!(q.dequeue_next().map(|t| t.title), Some("Song 1".to_string()));
        assert_eq!(q.dequeue_next().map(|t| t.title), Some("Song 2".to_string()));
        assert_eq!(q.dequeue_next(), None);
    }

    #[test]
    fn clear_and_total_duration() {
        let mut q = TrackQueue::new();
        q.enqueue(track(1));
        q.enqueue(Track::new("u", "unknown", 0, "tester"));
        q.enqueue(track(2));
        assert_eq!(q.total_duration(), Duration::from_secs(120));

        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.snapshot(10), Vec::new());
    }
}
