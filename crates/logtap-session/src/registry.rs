//! Concurrent session registry with lazy expiry and best-effort pruning.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use logtap_core::{RecordSink, SessionError, SessionId, SessionRegistrar, Tag, record::unix_ms};
use uuid::Uuid;

use crate::{config::SessionConfig, session::Session};

/// Outcome of one prune sweep.
///
/// Per-entry outcomes are aggregated here and logged; they are never
/// surfaced to paging clients.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneSummary {
    /// Sessions closed and removed.
    pub removed: usize,
    /// Candidates kept because a page fetch renewed them mid-sweep.
    pub renewed: usize,
    /// Candidates already gone by the time removal ran.
    pub missing: usize,
}

/// Concurrent mapping from session identifier to live session.
///
/// Lookups share a read lock; create, delete, and the pruner's mutating
/// phase take the write lock only for the map mutation itself, keeping the
/// exclusive window short. Expiry is lazy: `get` reports an expired entry
/// without removing it; physical removal is the pruner's job.
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    registrar: Option<Arc<dyn SessionRegistrar>>,
}

impl SessionRegistry {
    /// Create a registry with no registrar collaborator.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            registrar: None,
        }
    }

    /// Create a registry that reports session open/close to `registrar`.
    #[must_use]
    pub fn with_registrar(config: SessionConfig, registrar: Arc<dyn SessionRegistrar>) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            registrar: Some(registrar),
        }
    }

    /// The tunables this registry mints sessions with.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn table_read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, Arc<Session>>>, SessionError> {
        self.sessions
            .read()
            .map_err(|_| SessionError::InvariantViolation("session table lock poisoned".to_string()))
    }

    fn table_write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, Arc<Session>>>, SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::InvariantViolation("session table lock poisoned".to_string()))
    }

    /// Mint and register a fresh session: new identifier, empty queue,
    /// cursor 0, deadline one TTL from now.
    ///
    /// # Errors
    /// Infallible in normal operation; the only failure is the fatal
    /// poisoned-lock case, reported as [`SessionError::InvariantViolation`].
    pub fn create(&self, tags: Vec<Tag>) -> Result<Arc<Session>, SessionError> {
        let session = Arc::new(Session::new(Uuid::new_v4(), tags, &self.config));
        self.table_write()?
            .insert(session.id(), Arc::clone(&session));

        if let Some(registrar) = &self.registrar {
            let sink: Arc<dyn RecordSink> = Arc::clone(&session) as Arc<dyn RecordSink>;
            registrar.register(session.id(), session.tags(), sink);
        }

        tracing::debug!(id = %session.id(), "session created");
        Ok(session)
    }

    /// Look up a live session.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] when `id` is malformed or names no entry;
    /// [`SessionError::Expired`] when the entry's deadline has passed. The
    /// expired entry is left in place for the pruner.
    pub fn get(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.get_at(id, unix_ms())
    }

    fn get_at(&self, id: &str, now_ms: i64) -> Result<Arc<Session>, SessionError> {
        let sid = Uuid::parse_str(id).map_err(|_| SessionError::NotFound(id.to_string()))?;

        let table = self.table_read()?;
        let session = table
            .get(&sid)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if session.is_expired(now_ms) {
            return Err(SessionError::Expired(sid));
        }

        Ok(Arc::clone(session))
    }

    /// Close a session and drop it from the registry in one guarded step.
    ///
    /// An expired-but-present session is still deletable; only malformed
    /// or unknown identifiers fail.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] under the same identifier rule as `get`.
    pub fn delete(&self, id: &str) -> Result<(), SessionError> {
        let sid = Uuid::parse_str(id).map_err(|_| SessionError::NotFound(id.to_string()))?;

        {
            let mut table = self.table_write()?;
            let session = table
                .remove(&sid)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            session.close();
        }

        if let Some(registrar) = &self.registrar {
            registrar.deregister(sid);
        }

        tracing::debug!(id = %sid, "session deleted");
        Ok(())
    }

    /// Sweep out sessions whose deadline passed strictly before the sweep
    /// began. Best-effort: one stuck entry never blocks the rest.
    ///
    /// # Errors
    /// Only the fatal poisoned-lock case; per-entry outcomes land in the
    /// returned [`PruneSummary`].
    pub fn prune(&self) -> Result<PruneSummary, SessionError> {
        self.prune_at(unix_ms())
    }

    fn prune_at(&self, sweep_start_ms: i64) -> Result<PruneSummary, SessionError> {
        // Phase one: collect candidates under the shared lock.
        let candidates: Vec<SessionId> = {
            let table = self.table_read()?;
            table
                .values()
                .filter(|s| s.is_expired(sweep_start_ms))
                .map(|s| s.id())
                .collect()
        };

        // Phase two: remove each candidate under a short exclusive window,
        // re-checking the deadline in case a page fetch renewed the lease
        // between scan and removal.
        let mut summary = PruneSummary::default();
        for sid in candidates {
            {
                let mut table = self.table_write()?;
                let Some(session) = table.get(&sid).map(Arc::clone) else {
                    summary.missing += 1;
                    continue;
                };
                if !session.is_expired(sweep_start_ms) {
                    summary.renewed += 1;
                    continue;
                }
                table.remove(&sid);
                session.close();
            }

            if let Some(registrar) = &self.registrar {
                registrar.deregister(sid);
            }
            summary.removed += 1;
        }

        if summary.removed > 0 || summary.renewed > 0 || summary.missing > 0 {
            tracing::debug!(
                removed = summary.removed,
                renewed = summary.renewed,
                missing = summary.missing,
                "prune sweep finished"
            );
        }
        Ok(summary)
    }

    /// Close every session and empty the table. Idempotent; the
    /// drain-on-service-stop half of the registry lifecycle.
    ///
    /// # Errors
    /// Only the fatal poisoned-lock case.
    pub fn close(&self) -> Result<(), SessionError> {
        let drained: Vec<Arc<Session>> = {
            let mut table = self.table_write()?;
            table.drain().map(|(_, session)| session).collect()
        };

        for session in &drained {
            session.close();
        }
        if let Some(registrar) = &self.registrar {
            for session in &drained {
                registrar.deregister(session.id());
            }
        }

        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "session registry drained");
        }
        Ok(())
    }

    /// Number of entries in the table, expired-but-unpruned ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().map(|table| table.len()).unwrap_or(0)
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use logtap_core::{Level, LogRecord};

    use super::*;

    #[test]
    fn test_create_mints_distinct_ids() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let ids: HashSet<SessionId> = (0..100)
            .map(|_| registry.create(Vec::new()).unwrap().id())
            .collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(registry.len(), 100);
    }

    #[test]
    fn test_get_roundtrip() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let session = registry
            .create(vec![Tag::new("host", "a")])
            .unwrap();

        let found = registry.get(&session.id().to_string()).unwrap();
        assert_eq!(found.id(), session.id());
        assert_eq!(found.tags(), &[Tag::new("host", "a")]);
    }

    #[test]
    fn test_get_rejects_malformed_and_unknown_ids() {
        let registry = SessionRegistry::new(SessionConfig::default());

        assert!(matches!(
            registry.get("not-a-uuid"),
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            registry.get(&Uuid::new_v4().to_string()),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_get_reports_expired_lazily() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let session = registry.create(Vec::new()).unwrap();
        let id = session.id().to_string();

        // Past the 20s default deadline, without renewal.
        let later = session.deadline_ms() + 1;
        assert!(matches!(
            registry.get_at(&id, later),
            Err(SessionError::Expired(_))
        ));
        // Lazy: the entry is still present until a sweep removes it.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_removes_even_when_expired() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let session = registry.create(Vec::new()).unwrap();
        let id = session.id().to_string();

        registry.delete(&id).unwrap();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.delete(&id),
            Err(SessionError::NotFound(_))
        ));

        // An expired entry is still deletable; delete checks presence only.
        let session = registry.create(Vec::new()).unwrap();
        let id = session.id().to_string();
        let later = session.deadline_ms() + 1;
        assert!(registry.get_at(&id, later).is_err());
        registry.delete(&id).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_prune_removes_expired_keeps_renewed() {
        let registry = SessionRegistry::new(SessionConfig::default());
        let stale = registry.create(Vec::new()).unwrap();
        let live = registry.create(Vec::new()).unwrap();

        // Renew `live` once: its deadline moves one TTL past `stale`'s.
        live.fetch_page(0).unwrap();

        let sweep = stale.deadline_ms() + 1;
        let summary = registry.prune_at(sweep).unwrap();

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.renewed, 0);
        assert_eq!(registry.len(), 1);
        assert!(registry.get_at(&live.id().to_string(), sweep).is_ok());
        assert!(matches!(
            registry.get_at(&stale.id().to_string(), sweep),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_close_drains_everything() {
        let registry = SessionRegistry::new(SessionConfig::default());
        for _ in 0..3 {
            registry.create(Vec::new()).unwrap();
        }

        registry.close().unwrap();
        assert!(registry.is_empty());
        registry.close().unwrap();
    }

    #[derive(Default)]
    struct RecordingRegistrar {
        events: Mutex<Vec<(String, SessionId)>>,
        sinks: Mutex<Vec<Arc<dyn RecordSink>>>,
    }

    impl SessionRegistrar for RecordingRegistrar {
        fn register(&self, id: SessionId, _tags: &[Tag], sink: Arc<dyn RecordSink>) {
            self.events.lock().unwrap().push(("register".into(), id));
            self.sinks.lock().unwrap().push(sink);
        }

        fn deregister(&self, id: SessionId) {
            self.events.lock().unwrap().push(("deregister".into(), id));
        }
    }

    #[test]
    fn test_registrar_sees_lifecycle_and_feeds_the_queue() {
        let registrar = Arc::new(RecordingRegistrar::default());
        let registry = SessionRegistry::with_registrar(
            SessionConfig::default(),
            Arc::clone(&registrar) as Arc<dyn SessionRegistrar>,
        );

        let session = registry.create(vec![Tag::new("host", "a")]).unwrap();

        // The sink handed to the registrar reaches this session's queue.
        let sink = Arc::clone(&registrar.sinks.lock().unwrap()[0]);
        sink.publish(LogRecord::new(Level::Info, "routed"));
        let batch = session.fetch_page(0).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].message, "routed");

        registry.delete(&session.id().to_string()).unwrap();

        let events = registrar.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ("register".to_string(), session.id()),
                ("deregister".to_string(), session.id()),
            ]
        );
    }
}
