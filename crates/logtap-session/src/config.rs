//! Tunables for the session subsystem.

use std::time::Duration;

/// Page size and expiry tunables.
///
/// Both can change without affecting the paging protocol semantics: the
/// cursor contract and the sliding-deadline rule hold for any values.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Maximum records returned by a single page fetch.
    pub page_size: usize,
    /// Sliding expiry window; each successful page fetch extends the
    /// session's deadline by this amount.
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            ttl: Duration::from_secs(20),
        }
    }
}

impl SessionConfig {
    /// Override the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub(crate) fn ttl_ms(&self) -> i64 {
        self.ttl.as_millis() as i64
    }
}
