use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delays an action until a quiet period has passed since the last trigger.
///
/// Each `schedule` call disarms the previously armed timer (if it has not
/// fired yet) and arms a new one, so at most one timer is pending per
/// instance. Dropping the debouncer disarms it as well; an owner that is
/// replaced wholesale therefore cannot leak a late firing.
///
/// The action must not hold anything that outlives the owner. Engine actions
/// capture a `Weak` handle and bail out when it no longer upgrades.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer. `action` runs once, after `delay`, unless superseded
    /// or cancelled first.
    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        // Deadline is fixed at trigger time, not when the task is first polled.
        let deadline = tokio::time::Instant::now() + delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            action.await;
        }));
    }

    /// Disarm the pending timer. Returns true if one was actually pending;
    /// calling it with nothing armed is a no-op.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const WINDOW: Duration = Duration::from_millis(300);

    async fn settle(by: Duration) {
        tokio::time::advance(by).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_with_last_payload() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new();

        for n in 0..5 {
            let fired = fired.clone();
            debouncer.schedule(WINDOW, async move {
                fired.lock().unwrap().push(n);
            });
            settle(Duration::from_millis(50)).await;
        }
        assert!(fired.lock().unwrap().is_empty());

        settle(WINDOW).await;
        assert_eq!(*fired.lock().unwrap(), vec![4]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_disarms_and_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.cancel());

        let c = count.clone();
        debouncer.schedule(WINDOW, async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        settle(WINDOW * 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_disarms() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut debouncer = Debouncer::new();
            let c = count.clone();
            debouncer.schedule(WINDOW, async move {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }
        settle(WINDOW * 2).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_after_fire_runs_again() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new();
        for _ in 0..2 {
            let c = count.clone();
            debouncer.schedule(WINDOW, async move {
                c.fetch_add(1, Ordering::SeqCst);
            });
            settle(WINDOW + Duration::from_millis(1)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
