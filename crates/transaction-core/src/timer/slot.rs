use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// One cancellable, one-shot timer owned by a transaction.
///
/// Each arm spawns a task that sleeps and then runs the callback with the
/// generation it was armed under. The owner checks that generation with
/// [`TimerSlot::fired`] before acting, so a timer that was cancelled or
/// re-armed after its task already woke up is ignored.
#[derive(Debug, Default)]
pub(crate) struct TimerSlot {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Cancels whatever is pending and schedules `on_fire` after `delay`.
    pub(crate) fn arm<F, Fut>(&mut self, delay: Duration, on_fire: F)
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire(generation).await;
        }));
    }

    pub(crate) fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Called from the timer's own task. Returns `false` for a stale firing.
    ///
    /// The handle is dropped rather than aborted since the caller is running
    /// inside that task.
    pub(crate) fn fired(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.handle.take();
        true
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
