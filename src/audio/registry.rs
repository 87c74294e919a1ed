use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info};

use super::session::Session;

/// Dueño único de las sesiones, una por guild
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|s| s.value().clone())
    }

    /// Devuelve la sesión de la guild o la crea. El check-then-insert es
    /// atómico por guild: dos llamadas concurrentes ven la misma sesión.
    pub fn get_or_create(&self, guild_id: GuildId, create: impl FnOnce() -> Session) -> Arc<Session> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión para guild {}", guild_id);
                Arc::new(create())
            })
            .value()
            .clone()
    }

    /// Quita la sesión solo si sigue siendo `session` (nunca a su sucesora)
    pub fn remove(&self, guild_id: GuildId, session: &Arc<Session>) -> bool {
        let removed = self
            .sessions
            .remove_if(&guild_id, |_, current| Arc::ptr_eq(current, session))
            .is_some();
        if removed {
            debug!("🗑️ Sesión de guild {} eliminada del registro", guild_id);
        }
        removed
    }

    pub fn contains(&self, guild_id: GuildId) -> bool {
        self.sessions.contains_key(&guild_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeText;
    use serenity::model::id::ChannelId;

    fn session(guild: u64) -> Session {
        Session::new(GuildId::new(guild), ChannelId::new(10), Arc::new(FakeText::default()))
    }

    #[test]
    fn creation_is_lazy_and_unique() {
        let registry = SessionRegistry::new();
        let guild = GuildId::new(1);
        assert!(!registry.contains(guild));

        let first = registry.get_or_create(guild, || session(1));
        let second = registry.get_or_create(guild, || panic!("no debe crear otra sesión"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_creation_yields_one_session() {
        let registry = Arc::new(SessionRegistry::new());
        let guild = GuildId::new(7);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_or_create(guild, || session(7)))
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn stale_session_cannot_remove_successor() {
        let registry = SessionRegistry::new();
        let guild = GuildId::new(3);

        let old = registry.get_or_create(guild, || session(3));
        assert!(registry.remove(guild, &old));
        let new = registry.get_or_create(guild, || session(3));

        assert!(!registry.remove(guild, &old));
        assert!(Arc::ptr_eq(&registry.get(guild).unwrap(), &new));
        assert!(!registry.is_empty());
    }
}
