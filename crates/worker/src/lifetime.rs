//! Pending-task tracking that keeps a worker alive until its work is done.
//!
//! Every handler that starts asynchronous work it depends on holds a
//! [`PendingGuard`] for the duration of that work. Fire-and-forget side
//! effects (the cache write after a network fetch) are spawned through
//! [`Lifetime::wait_until`], which moves a guard into the task. The host
//! awaits [`Lifetime::idle`] before it tears the instance down or hands
//! control to a newer one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
struct Inner {
    pending: AtomicUsize,
    idle: Notify,
}

/// Shared counter of outstanding work for one worker instance.
#[derive(Debug, Clone, Default)]
pub struct Lifetime {
    inner: Arc<Inner>,
}

/// Marks one unit of outstanding work; released on drop.
#[derive(Debug)]
#[must_use = "the work is only tracked while the guard is alive"]
pub struct PendingGuard {
    inner: Arc<Inner>,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unit of outstanding work.
    pub fn guard(&self) -> PendingGuard {
        self.inner.pending.fetch_add(1, Ordering::AcqRel);
        PendingGuard { inner: Arc::clone(&self.inner) }
    }

    /// Number of guards currently held.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Spawn `fut` as tracked background work.
    ///
    /// The caller does not have to await the handle; the guard keeps
    /// [`Lifetime::idle`] from resolving until the task finishes or panics.
    pub fn wait_until<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.guard();
        tokio::spawn(async move {
            let output = fut.await;
            drop(guard);
            output
        })
    }

    /// Resolve once no work is pending.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_idle_when_nothing_pending() {
        let lifetime = Lifetime::new();
        lifetime.idle().await;
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test]
    async fn test_guard_counts() {
        let lifetime = Lifetime::new();
        let a = lifetime.guard();
        let b = lifetime.guard();
        assert_eq!(lifetime.pending(), 2);
        drop(a);
        assert_eq!(lifetime.pending(), 1);
        drop(b);
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_waits_for_background_work() {
        let lifetime = Lifetime::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let _handle = lifetime.wait_until(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = tx.send(());
        });
        assert_eq!(lifetime.pending(), 1);

        lifetime.idle().await;
        assert!(rx.await.is_ok());
        assert_eq!(lifetime.pending(), 0);
    }

    #[tokio::test]
    async fn test_guard_released_on_panic() {
        let lifetime = Lifetime::new();
        let handle = lifetime.wait_until(async {
            panic!("cache write blew up");
        });
        assert!(handle.await.is_err());
        assert_eq!(lifetime.pending(), 0);
    }
}
