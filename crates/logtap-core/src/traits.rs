//! Shared identifier and error types, plus producer-side collaborator traits.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::record::{LogRecord, Tag};

/// Session identifier.
pub type SessionId = Uuid;

/// Session subsystem error.
///
/// All variants are returned to the calling collaborator as typed,
/// inspectable results. `NotFound` and `Expired` are terminal for the
/// request; `BadPage` is retryable with the correct page number;
/// `InvariantViolation` signals an internal contradiction and is never
/// client-correctable.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Identifier is malformed or names no live entry.
    #[error("session not found: {0}")]
    NotFound(String),
    /// Entry exists but its deadline has passed.
    #[error("session expired: {0}")]
    Expired(SessionId),
    /// Requested page does not match the session's cursor.
    #[error("bad page value: expected {expected}, got {requested}")]
    BadPage { expected: u64, requested: u64 },
    /// Internal accounting contradiction.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Destination a log producer publishes records into.
///
/// Implementations must not block the producer beyond a short internal
/// critical section.
pub trait RecordSink: Send + Sync {
    /// Hand a record over to the sink.
    fn publish(&self, record: LogRecord);
}

/// Collaborator notified as sessions open and close, so an external
/// producer pipeline can start or stop routing records to them.
pub trait SessionRegistrar: Send + Sync {
    /// A session was created; `sink` accepts its records from now on.
    fn register(&self, id: SessionId, tags: &[Tag], sink: Arc<dyn RecordSink>);

    /// The session was deleted or pruned; its sink should be dropped.
    fn deregister(&self, id: SessionId);
}
