use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Counts outstanding work items of one batch
///
/// The dispatcher adds one per item sent to the workers, each worker calls
/// `done` after finishing an item, and `wait` resolves once the count is
/// back at zero.
#[derive(Debug, Default)]
pub struct BatchBarrier {
    pending: AtomicUsize,
    notify: Notify,
}

impl BatchBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, count: usize) {
        self.pending.fetch_add(count, Ordering::SeqCst);
    }

    /// Marks one item finished; extra calls at zero are ignored
    pub fn done(&self) {
        let previous = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Waits until no items are outstanding
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a `done` in between is not missed
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}
