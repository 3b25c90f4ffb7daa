//! Sender liveness flag.
//!
//! The capture loop needs exactly one bit of information about the sender:
//! is it still running? [`SenderLiveness::new`] returns a read-only handle for
//! the watcher and a [`LivenessGuard`] that the sender task holds for its whole
//! lifetime. When the guard is dropped (normal return, fatal error, panic
//! unwinding, or the task being aborted) the flag flips to "dead".
//!
//! The flag is a termination signal only. It never carries data.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Read-only view of the sender's liveness.
#[derive(Debug, Clone)]
pub struct SenderLiveness {
    alive: Arc<AtomicBool>,
}

impl SenderLiveness {
    /// Creates a new "alive" flag and the guard that keeps it alive.
    pub fn new() -> (Self, LivenessGuard) {
        let alive = Arc::new(AtomicBool::new(true));
        (
            Self {
                alive: Arc::clone(&alive),
            },
            LivenessGuard { alive },
        )
    }

    /// Returns `true` while the guard has not been dropped.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Keeps the paired [`SenderLiveness`] reporting "alive" until dropped.
#[derive(Debug)]
pub struct LivenessGuard {
    alive: Arc<AtomicBool>,
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alive_until_guard_dropped() {
        let (liveness, guard) = SenderLiveness::new();
        assert!(liveness.is_alive());
        drop(guard);
        assert!(!liveness.is_alive());
    }

    #[test]
    fn test_clones_observe_the_same_flag() {
        let (liveness, guard) = SenderLiveness::new();
        let watcher = liveness.clone();
        drop(guard);
        assert!(!watcher.is_alive());
    }

    #[tokio::test]
    async fn test_aborted_task_drops_guard() {
        // Arrange
        let (liveness, guard) = SenderLiveness::new();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        assert!(liveness.is_alive());

        // Act
        handle.abort();
        let _ = handle.await;

        // Assert
        assert!(!liveness.is_alive());
    }
}
