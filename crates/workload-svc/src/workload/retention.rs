//! [`RetentionBuffer`]: bounded FIFO of byte batches retained by `/alloc`.

use std::{collections::VecDeque, sync::Arc};

use tokio::sync::Mutex;

/// Result of a single [`RetentionBuffer::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    /// Batches retained after the push.
    pub retained: usize,
    /// Batches evicted to make room (0 or 1 unless the cap was lowered).
    pub evicted: usize,
}

/// Size-bounded retention ring for allocated batches.
///
/// Wraps an `Arc<Mutex<VecDeque<_>>>` so that the evict-then-append step runs
/// as one critical section and the buffer never exceeds its capacity, even if
/// the service is run on a multi-threaded runtime.
#[derive(Clone, Debug)]
pub struct RetentionBuffer {
    inner: Arc<Mutex<VecDeque<Vec<u8>>>>,
    capacity: usize,
}

impl RetentionBuffer {
    /// Create an empty buffer retaining at most `capacity` batches.
    ///
    /// A zero capacity is treated as one; the configuration layer rejects zero
    /// before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Maximum number of retained batches.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of batches currently retained.
    #[allow(dead_code)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Total bytes currently retained.
    #[allow(dead_code)]
    pub async fn retained_bytes(&self) -> usize {
        self.inner.lock().await.iter().map(Vec::len).sum()
    }

    /// Append `batch`, evicting the oldest batches first if the buffer is full.
    pub async fn push(&self, batch: Vec<u8>) -> PushOutcome {
        let mut batches = self.inner.lock().await;
        let mut evicted = 0;
        while batches.len() >= self.capacity {
            batches.pop_front();
            evicted += 1;
        }
        batches.push_back(batch);
        PushOutcome {
            retained: batches.len(),
            evicted,
        }
    }

    /// First byte of every retained batch, oldest first.
    #[cfg(test)]
    pub async fn heads(&self) -> Vec<u8> {
        self.inner
            .lock()
            .await
            .iter()
            .filter_map(|b| b.first().copied())
            .collect()
    }
}
