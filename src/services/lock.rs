use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::services::delay::{Delay, TokioDelay};

/// Errors reported by [`KeyedLock`]
#[derive(Debug, Error)]
pub enum LockError<K: fmt::Debug> {
    /// The wait for the lock outlived the configured timeout
    #[error("timed out after {timeout:?} waiting for the lock on {key:?}")]
    Timeout { key: K, timeout: Duration },

    /// `release` was called with no outstanding `take` for the key
    #[error("no outstanding lock for key {key:?}")]
    NoLock { key: K },
}

/// One queued or active hold on a key.
///
/// `release_tx` fires when this waiter is released. `release_rx` is the
/// matching receiver; the next waiter to queue behind this one takes it
/// and suspends on it.
struct Waiter {
    release_tx: oneshot::Sender<()>,
    release_rx: Option<oneshot::Receiver<()>>,
}

/// Mutual exclusion per resource key for concurrent asynchronous tasks
///
/// Callers request exclusive access to a key with [`KeyedLock::take`] and
/// hand it back with [`KeyedLock::release`]. Waiters on the same key are
/// activated in strict call order; operations on distinct keys never block
/// one another. Release is explicit and caller-driven: nothing is released
/// automatically, so liveness depends on every holder eventually calling
/// `release`.
///
/// Re-entrancy is not supported. A holder that calls `take` again on the
/// same key queues behind itself and deadlocks unless someone else releases.
///
/// # Example
///
/// ```no_run
/// use svckit::services::lock::KeyedLock;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let lock = KeyedLock::new();
///
/// lock.take("invoice:42").await?;
/// // ... exclusive access to invoice 42 ...
/// lock.release(&"invoice:42")?;
/// # Ok(())
/// # }
/// ```
pub struct KeyedLock<K> {
    registry: Mutex<HashMap<K, VecDeque<Waiter>>>,
    delay: Arc<dyn Delay>,
    default_timeout: Option<Duration>,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    /// Create a lock manager that waits indefinitely by default
    pub fn new() -> Self {
        Self::with_delay(Arc::new(TokioDelay), None)
    }

    /// Create a lock manager whose plain `take` calls are bounded by `timeout`
    pub fn with_default_timeout(timeout: Duration) -> Self {
        Self::with_delay(Arc::new(TokioDelay), Some(timeout))
    }

    /// Create a lock manager with an injected timer source
    ///
    /// Mainly useful in tests, where a stubbed [`Delay`] makes the timeout
    /// race deterministic.
    pub fn with_delay(delay: Arc<dyn Delay>, default_timeout: Option<Duration>) -> Self {
        tracing::debug!("lock service initialized");
        Self {
            registry: Mutex::new(HashMap::new()),
            delay,
            default_timeout,
        }
    }

    /// Take the lock on `key`, waiting at most the configured default timeout
    ///
    /// Resolves immediately when nobody holds `key`; otherwise suspends until
    /// every earlier waiter on the key has been released. Errors with
    /// [`LockError::Timeout`] if a default timeout is configured and elapses
    /// first.
    pub async fn take(&self, key: K) -> Result<(), LockError<K>> {
        self.take_inner(key, self.default_timeout).await
    }

    /// Take the lock on `key`, waiting at most `timeout`
    pub async fn take_with_timeout(&self, key: K, timeout: Duration) -> Result<(), LockError<K>> {
        self.take_inner(key, Some(timeout)).await
    }

    async fn take_inner(&self, key: K, timeout: Option<Duration>) -> Result<(), LockError<K>> {
        let (entry_len, predecessor) = {
            let mut registry = self.registry.lock().expect("lock registry poisoned");
            let queue = registry.entry(key.clone()).or_default();
            let entry_len = queue.len();

            let (release_tx, release_rx) = oneshot::channel();
            let predecessor = queue.back_mut().and_then(|waiter| waiter.release_rx.take());
            queue.push_back(Waiter {
                release_tx,
                release_rx: Some(release_rx),
            });

            (entry_len, predecessor)
        };

        tracing::debug!(key = ?key, queue_len = entry_len, "demanding the lock");

        if let Some(signal) = predecessor {
            tracing::debug!(key = ?key, queue_len = entry_len, "waiting for the lock");

            match timeout {
                Some(timeout) => {
                    tokio::select! {
                        biased;
                        _ = signal => {}
                        _ = self.delay.wait(timeout) => {
                            // The timed-out waiter keeps its queue slot: a later
                            // release fires its signal into the void, and one
                            // extra release is needed to move past it.
                            return Err(LockError::Timeout { key, timeout });
                        }
                    }
                }
                None => {
                    // A closed channel means the registry itself went away;
                    // treat it as an activation.
                    let _ = signal.await;
                }
            }
        }

        tracing::debug!(key = ?key, queue_len = entry_len, "obtained the lock");
        Ok(())
    }

    /// Release the lock on `key`
    ///
    /// Removes and signals the head waiter of the key's queue, activating
    /// whichever `take` call is suspended right behind it. Release is
    /// key-specific, not waiter-specific: any caller may release, and the
    /// take/release pairing is the caller's contract. An unmatched release
    /// errors with [`LockError::NoLock`] rather than being ignored.
    pub fn release(&self, key: &K) -> Result<(), LockError<K>> {
        let mut registry = self.registry.lock().expect("lock registry poisoned");

        let Some(queue) = registry.get_mut(key) else {
            return Err(LockError::NoLock { key: key.clone() });
        };
        let queue_len = queue.len();
        let Some(head) = queue.pop_front() else {
            return Err(LockError::NoLock { key: key.clone() });
        };

        tracing::debug!(key = ?key, queue_len, "releasing the lock");

        // The receiver is already gone when the successor timed out.
        let _ = head.release_tx.send(());

        if queue.is_empty() {
            registry.remove(key);
        }
        Ok(())
    }

    /// Number of active plus queued waiters on `key`
    pub fn queue_len(&self, key: &K) -> usize {
        self.registry
            .lock()
            .expect("lock registry poisoned")
            .get(key)
            .map_or(0, VecDeque::len)
    }

    /// Whether `key` has any outstanding waiter
    pub fn contains(&self, key: &K) -> bool {
        self.registry
            .lock()
            .expect("lock registry poisoned")
            .contains_key(key)
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::poll;
    use tokio_test::{assert_pending, assert_ready};

    /// Timer that fires on the first poll.
    struct InstantDelay;

    #[async_trait]
    impl Delay for InstantDelay {
        async fn wait(&self, _duration: Duration) {}
    }

    /// Timer that never fires.
    struct NeverDelay;

    #[async_trait]
    impl Delay for NeverDelay {
        async fn wait(&self, _duration: Duration) {
            std::future::pending::<()>().await
        }
    }

    #[tokio::test]
    async fn uncontended_take_resolves_immediately() {
        let lock = KeyedLock::new();

        lock.take("key").await.unwrap();
        assert_eq!(lock.queue_len(&"key"), 1);

        lock.release(&"key").unwrap();
        assert!(!lock.contains(&"key"));
    }

    #[tokio::test]
    async fn balanced_pairs_leave_no_registry_entry() {
        let lock = KeyedLock::new();

        for _ in 0..3 {
            lock.take("key").await.unwrap();
            lock.release(&"key").unwrap();
        }

        assert!(!lock.contains(&"key"));
        assert_eq!(lock.queue_len(&"key"), 0);
    }

    #[tokio::test]
    async fn release_without_outstanding_take_fails() {
        let lock: KeyedLock<&str> = KeyedLock::new();

        let err = lock.release(&"key").unwrap_err();
        assert!(matches!(err, LockError::NoLock { key: "key" }));

        // Still an error once a balanced pair has come and gone.
        lock.take("key").await.unwrap();
        lock.release(&"key").unwrap();
        let err = lock.release(&"key").unwrap_err();
        assert!(matches!(err, LockError::NoLock { key: "key" }));
    }

    #[tokio::test]
    async fn contended_take_times_out() {
        let lock = KeyedLock::with_delay(Arc::new(InstantDelay), None);
        lock.take("key").await.unwrap();

        let err = lock
            .take_with_timeout("key", Duration::from_millis(200))
            .await
            .unwrap_err();
        match err {
            LockError::Timeout { key, timeout } => {
                assert_eq!(key, "key");
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn default_timeout_applies_to_plain_take() {
        let lock = KeyedLock::with_delay(Arc::new(InstantDelay), Some(Duration::from_millis(50)));
        lock.take("key").await.unwrap();

        let err = lock.take("key").await.unwrap_err();
        assert!(matches!(
            err,
            LockError::Timeout { timeout, .. } if timeout == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn uncontended_take_never_consults_the_timer() {
        // An immediate grant would still lose the race here if the timer
        // were consulted at all.
        let lock = KeyedLock::with_delay(Arc::new(InstantDelay), None);
        lock.take_with_timeout("key", Duration::from_millis(1))
            .await
            .unwrap();
        lock.release(&"key").unwrap();
    }

    #[tokio::test]
    async fn release_beats_a_pending_timeout() {
        let lock = KeyedLock::with_delay(Arc::new(NeverDelay), Some(Duration::from_millis(1)));
        lock.take("key").await.unwrap();

        let mut second = Box::pin(lock.take("key"));
        assert_pending!(poll!(second.as_mut()));

        lock.release(&"key").unwrap();
        assert_ready!(poll!(second.as_mut())).unwrap();

        lock.release(&"key").unwrap();
        assert!(!lock.contains(&"key"));
    }

    #[test]
    fn error_display() {
        let err: LockError<&str> = LockError::NoLock { key: "patients" };
        assert_eq!(err.to_string(), "no outstanding lock for key \"patients\"");

        let err: LockError<&str> = LockError::Timeout {
            key: "patients",
            timeout: Duration::from_millis(500),
        };
        assert!(err.to_string().contains("500ms"));
    }
}
