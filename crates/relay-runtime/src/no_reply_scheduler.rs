//! Cancellable per-conversation no-reply timers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct SchedulerInner {
    next_generation: AtomicU64,
    timers: Mutex<HashMap<String, ArmedTimer>>,
}

impl SchedulerInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ArmedTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Default)]
/// At most one armed timer per conversation key; arming replaces.
pub struct NoReplyScheduler {
    inner: Arc<SchedulerInner>,
}

impl NoReplyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer that runs `replay` after `delay`, cancelling any timer
    /// already armed for `conversation_key`. Returns the timer generation.
    ///
    /// The firing task removes its own entry before calling `replay`, so a
    /// `cancel` issued from inside the replay never aborts it.
    pub fn arm<F>(&self, conversation_key: &str, delay: Duration, replay: F) -> u64
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let inner = Arc::clone(&self.inner);
        let key = conversation_key.to_string();

        let mut timers = self.inner.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_armed = {
                let mut timers = inner.lock();
                match timers.get(&key) {
                    Some(timer) if timer.generation == generation => {
                        timers.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if still_armed {
                tracing::debug!(user_id = %key, generation, "no-reply timer fired");
                replay().await;
            }
        });
        if let Some(previous) = timers.insert(
            conversation_key.to_string(),
            ArmedTimer { generation, handle },
        ) {
            previous.handle.abort();
        }
        generation
    }

    /// Aborts the conversation's armed timer. Returns whether one was armed.
    pub fn cancel(&self, conversation_key: &str) -> bool {
        match self.inner.lock().remove(conversation_key) {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn armed_generation(&self, conversation_key: &str) -> Option<u64> {
        self.inner
            .lock()
            .get(conversation_key)
            .map(|timer| timer.generation)
    }

    pub fn armed_count(&self) -> usize {
        self.inner.lock().len()
    }
}
