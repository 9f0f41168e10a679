//! A single TTL-bounded paging session.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use logtap_core::{
    LogRecord, Queue, RecordSink, SessionError, SessionId, Tag, record::unix_ms,
};

use crate::config::SessionConfig;

/// Cursor and deadline, guarded together so a page fetch is one atomic step.
struct PageState {
    page: u64,
    deadline_ms: i64,
}

/// A server-held handle through which one client incrementally drains a
/// FIFO log stream.
///
/// The cursor acts as a strict continuation token: a fetch succeeds only
/// for the exact current page, so replayed and skipped-ahead requests are
/// rejected without side effects, and concurrent fetches for the same page
/// have exactly one winner. Each successful fetch extends the deadline by
/// the TTL; only actively-polling clients keep a session alive.
pub struct Session {
    id: SessionId,
    tags: Vec<Tag>,
    page_size: usize,
    ttl_ms: i64,
    state: Mutex<PageState>,
    queue: Queue,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn new(id: SessionId, tags: Vec<Tag>, config: &SessionConfig) -> Self {
        let ttl_ms = config.ttl_ms();
        Self {
            id,
            tags,
            page_size: config.page_size,
            ttl_ms,
            state: Mutex::new(PageState {
                page: 0,
                deadline_ms: unix_ms() + ttl_ms,
            }),
            queue: Queue::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Stable session identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Tags supplied at creation.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Current page cursor.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.state.lock().unwrap().page
    }

    /// Absolute expiry deadline, Unix epoch milliseconds.
    #[must_use]
    pub fn deadline_ms(&self) -> i64 {
        self.state.lock().unwrap().deadline_ms
    }

    /// Number of undelivered records.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.deadline_ms()
    }

    /// Drain up to one page of records.
    ///
    /// Succeeds only when `requested` equals the current cursor; the cursor
    /// then advances by one, the deadline extends by the TTL, and up to a
    /// page of records is drained in FIFO order - fewer when the queue is
    /// shorter, never padding. On a mismatch the session is left untouched.
    ///
    /// # Errors
    /// Returns [`SessionError::BadPage`] when `requested` is not the
    /// current cursor; the error reports which page would have been
    /// accepted.
    pub fn fetch_page(&self, requested: u64) -> Result<Vec<LogRecord>, SessionError> {
        let mut state = self.state.lock().unwrap();
        if requested != state.page {
            return Err(SessionError::BadPage {
                expected: state.page,
                requested,
            });
        }
        state.page += 1;
        state.deadline_ms += self.ttl_ms;

        let mut batch = Vec::with_capacity(self.page_size.min(self.queue.len()));
        for _ in 0..self.page_size {
            match self.queue.dequeue() {
                Some(record) => batch.push(record),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Close the session and discard undelivered records. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // Let an in-flight page fetch drain before discarding the rest.
        let _state = self.state.lock().unwrap();
        self.queue.clear();
    }
}

impl RecordSink for Session {
    fn publish(&self, record: LogRecord) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.queue.enqueue(record);
    }
}
