//! FIFO buffering between log producers and the paging consumer.

use std::{collections::VecDeque, sync::Mutex};

use crate::record::LogRecord;

/// Unbounded FIFO queue of log records.
///
/// Producers and the single paging consumer run on different call paths;
/// the queue's own lock is the only serialization point between them.
/// Deliberately unbounded: a stalled or abandoned session must never slow
/// its producers.
#[derive(Debug)]
pub struct Queue {
    inner: Mutex<VecDeque<LogRecord>>,
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Queue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(32)),
        }
    }

    /// Append a record at the tail.
    pub fn enqueue(&self, record: LogRecord) {
        self.inner.lock().unwrap().push_back(record);
    }

    /// Remove and return the head record, in arrival order.
    ///
    /// Returns `None` when the queue holds no records, so an empty queue
    /// can never be mistaken for a record with empty contents.
    #[must_use]
    pub fn dequeue(&self) -> Option<LogRecord> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    /// Whether the queue holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all buffered records.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        let dropped = inner.len();
        inner.clear();
        if dropped > 0 {
            tracing::trace!(dropped, "discarded undelivered records");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::record::{Field, Level};

    fn sample_records() -> Vec<LogRecord> {
        vec![
            LogRecord::new(Level::Info, "0").with_fields(vec![Field::str("test", "0")]),
            LogRecord::new(Level::Debug, "1").with_fields(vec![Field::str("test", "1")]),
            LogRecord::new(Level::Warn, "2").with_fields(vec![Field::str("test", "2")]),
            LogRecord::new(Level::Warn, "3")
                .with_fields(vec![Field::str("test", "3"), Field::int("number", 3)]),
        ]
    }

    #[test]
    fn test_queue_fifo_and_length() {
        let records = sample_records();
        let queue = Queue::new();

        // Verify null state
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());

        for (i, record) in records.iter().enumerate() {
            queue.enqueue(record.clone());
            assert_eq!(queue.len(), i + 1);
        }

        for (i, record) in records.iter().enumerate() {
            assert_eq!(queue.dequeue().as_ref(), Some(record));
            assert_eq!(queue.len(), records.len() - i - 1);
        }
    }

    #[test]
    fn test_dequeue_empty_returns_none() {
        let queue = Queue::new();
        let record = LogRecord::new(Level::Info, "0").with_fields(vec![Field::str("test", "0")]);

        queue.enqueue(record.clone());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.dequeue(), Some(record));
        assert_eq!(queue.len(), 0);

        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_clear_discards_records() {
        let queue = Queue::new();
        for record in sample_records() {
            queue.enqueue(record);
        }

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_concurrent_enqueue_accounting() {
        let queue = Arc::new(Queue::new());
        let threads = 8;
        let per_thread = 100;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        queue.enqueue(LogRecord::new(Level::Info, format!("{t}-{i}")));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), threads * per_thread);

        let mut drained = 0;
        while queue.dequeue().is_some() {
            drained += 1;
        }
        assert_eq!(drained, threads * per_thread);
        assert_eq!(queue.len(), 0);
    }
}
