use std::sync::{Arc, Mutex};

use hookrun::Outcome;
use tokio::sync::Notify;

/// Collects every outcome handed to a completion callback.
///
/// Each call to [`OutcomeRecorder::callback`] hands out a fresh `FnOnce`;
/// all of them write into the same list, so a test can assert on the total
/// number of deliveries.
#[derive(Debug, Clone, Default)]
pub struct OutcomeRecorder {
    outcomes: Arc<Mutex<Vec<Outcome>>>,
    notify: Arc<Notify>,
}

impl OutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn callback(&self) -> impl FnOnce(Outcome) + Send + 'static {
        let outcomes = Arc::clone(&self.outcomes);
        let notify = Arc::clone(&self.notify);
        move |outcome| {
            outcomes.lock().unwrap().push(outcome);
            notify.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Outcome> {
        std::mem::take(&mut *self.outcomes.lock().unwrap())
    }

    /// The single recorded outcome; panics unless exactly one was delivered.
    pub fn only(&self) -> Outcome {
        let mut all = self.take();
        assert_eq!(all.len(), 1, "expected exactly one outcome, got {all:?}");
        all.remove(0)
    }

    /// Wait until at least one outcome has been recorded.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.count() > 0 {
                return;
            }
            notified.await;
        }
    }
}
