// src/cloud/queue.rs - Bounded outbound message queue
//
// Decouples event producers (synchronous callback context) from the network
// consumer loop. Producers never block: a full queue is a drop signal.
use crate::cloud::tracker::StatusPayload;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

pub struct OutboundQueue {
    items: Mutex<VecDeque<StatusPayload>>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Non-blocking insert. Returns `false` when the queue is at capacity and
    /// the payload was dropped; callers log the loss and move on.
    pub fn try_put(&self, payload: StatusPayload) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() >= self.capacity {
            return false;
        }
        items.push_back(payload);
        true
    }

    /// Oldest queued payload if any, otherwise whatever `default_fn` builds.
    /// The fallback is only invoked when the queue was empty at call time.
    pub async fn take_or<F, Fut>(&self, default_fn: F) -> StatusPayload
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StatusPayload>,
    {
        let queued = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            items.pop_front()
        };
        match queued {
            Some(payload) => payload,
            None => default_fn().await,
        }
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
