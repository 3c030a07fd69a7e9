//! Device-side fail-safe timer (spec §4.7). Arming schedules a one-shot
//! expiry that fires a callback exactly once; disarming or re-arming before
//! expiry cancels the pending fire. Driven by a background task in the
//! style of `guard-service`'s audit loop: a `tokio::select!` between the
//! sleep and a watch channel that carries control-plane changes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Armed {
    Idle,
    Deadline(Instant),
}

/// Owned by whichever state machine arms it; dropping it stops the driver
/// task and cancels any pending expiry.
pub struct FailSafeTimer {
    tx: watch::Sender<Armed>,
    deadline: Arc<Mutex<Option<Instant>>>,
    driver: JoinHandle<()>,
}

impl FailSafeTimer {
    pub fn new<F>(on_expire: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, mut rx) = watch::channel(Armed::Idle);
        let deadline = Arc::new(Mutex::new(None));
        let deadline_task = deadline.clone();

        let driver = tokio::spawn(async move {
            loop {
                let current = *rx.borrow();
                match current {
                    Armed::Idle => {
                        if rx.changed().await.is_err() {
                            return;
                        }
                    }
                    Armed::Deadline(at) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(at.into()) => {
                                let still_current = matches!(*rx.borrow(), Armed::Deadline(d) if d == at);
                                if still_current {
                                    *deadline_task.lock() = None;
                                    on_expire();
                                }
                                if rx.changed().await.is_err() {
                                    return;
                                }
                            }
                            changed = rx.changed() => {
                                if changed.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        Self { tx, deadline, driver }
    }

    /// Cancels any prior arming and schedules a new one-shot expiry.
    pub fn arm(&self, duration: Duration) {
        let at = Instant::now() + duration;
        *self.deadline.lock() = Some(at);
        let _ = self.tx.send(Armed::Deadline(at));
    }

    /// Cancels any pending expiry without firing the callback.
    pub fn disarm(&self) {
        *self.deadline.lock() = None;
        let _ = self.tx.send(Armed::Idle);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.lock().is_some()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.lock().map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn expiry(&self) -> Option<Instant> {
        *self.deadline.lock()
    }
}

impl Drop for FailSafeTimer {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn fires_exactly_once_after_duration() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        let timer = FailSafeTimer::new(move || {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });
        timer.arm(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disarm_before_expiry_suppresses_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        let timer = FailSafeTimer::new(move || {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });
        timer.arm(Duration::from_millis(50));
        timer.disarm();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!timer.is_armed());
    }

    #[tokio::test]
    async fn re_arm_replaces_deadline_atomically() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = count.clone();
        let timer = FailSafeTimer::new(move || {
            count_cb.fetch_add(1, Ordering::SeqCst);
        });
        timer.arm(Duration::from_millis(20));
        timer.arm(Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0, "first deadline must have been canceled");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
