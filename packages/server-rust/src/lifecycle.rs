//! Server lifecycle state with in-flight request tracking.
//!
//! Uses `ArcSwap` for lock-free state transitions and an atomic counter with
//! RAII guards for accurate in-flight operation tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::info;

/// Server lifecycle state.
///
/// State machine: Starting -> Ready -> Draining -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Queues and services are being set up; no operations are accepted.
    Starting,
    /// Routing table built; operations are dispatched.
    Ready,
    /// No new operations are accepted; in-flight ones are finishing.
    Draining,
    /// Every queue is closed.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Tracks the server's lifecycle state and the operations in flight.
///
/// 1. The lifecycle middleware checks `state()` before dispatching
/// 2. `begin_drain()` moves to Draining and signals all listeners
/// 3. `wait_for_drain()` waits until in-flight operations complete
/// 4. `set_stopped()` marks the end of shutdown
#[derive(Debug)]
pub struct ServerLifecycle {
    drain_signal: watch::Sender<bool>,
    in_flight: Arc<AtomicU64>,
    state: ArcSwap<LifecycleState>,
}

impl ServerLifecycle {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            drain_signal: tx,
            in_flight: Arc::new(AtomicU64::new(0)),
            state: ArcSwap::from_pointee(LifecycleState::Starting),
        }
    }

    pub fn set_ready(&self) {
        self.transition(LifecycleState::Ready);
    }

    /// Returns a receiver notified when draining begins.
    #[must_use]
    pub fn drain_receiver(&self) -> watch::Receiver<bool> {
        self.drain_signal.subscribe()
    }

    /// Stops accepting new operations and signals all drain receivers.
    pub fn begin_drain(&self) {
        self.transition(LifecycleState::Draining);
        // Receivers may have been dropped.
        let _ = self.drain_signal.send(true);
    }

    pub fn set_stopped(&self) {
        self.transition(LifecycleState::Stopped);
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Creates an RAII guard that tracks an in-flight operation.
    ///
    /// The counter is decremented when the guard is dropped, even if the
    /// handler panics.
    #[must_use]
    pub fn in_flight_guard(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    #[must_use]
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Waits for all in-flight operations to complete, up to `timeout`.
    ///
    /// Returns `false` if the timeout expired first. The state is not
    /// changed either way.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.in_flight.load(Ordering::Relaxed) == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn transition(&self, next: LifecycleState) {
        let prev = *self.state.swap(Arc::new(next));
        if prev != next {
            info!(from = %prev, to = %next, "server lifecycle transition");
        }
    }
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard that decrements the in-flight counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_starting() {
        let lifecycle = ServerLifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Starting);
        assert_eq!(lifecycle.in_flight_count(), 0);
        assert!(!lifecycle.is_ready());
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        let lifecycle = ServerLifecycle::new();
        lifecycle.set_ready();
        assert!(lifecycle.is_ready());

        lifecycle.begin_drain();
        assert_eq!(lifecycle.state(), LifecycleState::Draining);

        lifecycle.set_stopped();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn in_flight_guard_increments_and_decrements() {
        let lifecycle = ServerLifecycle::new();

        let guard1 = lifecycle.in_flight_guard();
        let guard2 = lifecycle.in_flight_guard();
        assert_eq!(lifecycle.in_flight_count(), 2);

        drop(guard1);
        assert_eq!(lifecycle.in_flight_count(), 1);
        drop(guard2);
        assert_eq!(lifecycle.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn drain_receiver_notified() {
        let lifecycle = ServerLifecycle::new();
        let mut rx = lifecycle.drain_receiver();
        assert!(!*rx.borrow());

        lifecycle.begin_drain();

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn wait_for_drain_with_active_operations() {
        let lifecycle = ServerLifecycle::new();
        lifecycle.set_ready();
        let guard = lifecycle.in_flight_guard();
        lifecycle.begin_drain();

        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(guard);
        });

        assert!(lifecycle.wait_for_drain(Duration::from_secs(2)).await);
        assert_eq!(lifecycle.state(), LifecycleState::Draining);
        release.await.unwrap();
    }

    #[tokio::test]
    async fn wait_for_drain_timeout() {
        let lifecycle = ServerLifecycle::new();
        let _guard = lifecycle.in_flight_guard();
        lifecycle.begin_drain();

        assert!(!lifecycle.wait_for_drain(Duration::from_millis(50)).await);
        assert_eq!(lifecycle.state(), LifecycleState::Draining);
    }
}
