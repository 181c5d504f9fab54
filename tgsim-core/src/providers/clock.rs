//! Clock provider for time abstraction.
//!
//! Request timeouts, reconnect backoff, keep-alive and polling intervals all
//! go through this trait, so tests can drive time by hand instead of
//! sleeping.

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// A pending timer returned by [`ClockProvider::sleep`].
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Provider trait for time operations.
pub trait ClockProvider: Send + Sync {
    /// Monotonic time in nanoseconds since the clock was created.
    fn now(&self) -> u64;

    /// Sleep for the specified duration.
    ///
    /// The returned future owns everything it needs, so it can be stored in
    /// a struct or raced in `tokio::select!` after the clock reference is
    /// gone.
    fn sleep(&self, duration: Duration) -> Sleep;

    /// Advance time by the specified duration (mock-only operation).
    ///
    /// Real implementations should do nothing.
    fn advance(&self, duration: Duration);

    /// Check if this is a mock clock.
    fn is_mock(&self) -> bool;
}

/// Real clock backed by tokio timers.
#[derive(Debug, Clone)]
pub struct RealClock {
    start: Instant,
}

impl RealClock {
    /// Create a new real clock.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockProvider for RealClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }

    fn advance(&self, _duration: Duration) {
        // Real clock cannot be manually advanced
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Mock clock for testing with controllable time.
///
/// Time starts at zero and only moves when [`ClockProvider::advance`] is
/// called. Cloning shares the same timeline.
#[derive(Clone, Default)]
pub struct MockClock {
    inner: Arc<MockClockInner>,
}

#[derive(Default)]
struct MockClockInner {
    current_nanos: AtomicU64,
    next_sleep_id: AtomicU64,
    pending_sleeps: Mutex<Vec<PendingSleep>>,
}

struct PendingSleep {
    id: u64,
    wake_at_nanos: u64,
    waker: Waker,
}

impl MockClock {
    /// Create a mock clock starting at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sleeps that have been polled and are still waiting.
    ///
    /// Tests use this to wait until a task has armed its timer before
    /// advancing time.
    pub fn pending_sleeps(&self) -> usize {
        self.inner.pending_sleeps.lock().len()
    }

    /// Wait until at least `count` sleeps are parked on this clock.
    pub async fn wait_for_sleeps(&self, count: usize) {
        while self.pending_sleeps() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl std::fmt::Debug for MockClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockClock")
            .field("current_nanos", &self.now())
            .field("pending_sleeps", &self.pending_sleeps())
            .finish()
    }
}

impl ClockProvider for MockClock {
    fn now(&self) -> u64 {
        self.inner.current_nanos.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        let wake_at = self.now() + duration.as_nanos() as u64;
        Box::pin(MockSleep {
            id: self.inner.next_sleep_id.fetch_add(1, Ordering::SeqCst),
            wake_at,
            clock: Arc::clone(&self.inner),
        })
    }

    fn advance(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;
        let new_time = self.inner.current_nanos.fetch_add(nanos, Ordering::SeqCst) + nanos;

        let mut sleeps = self.inner.pending_sleeps.lock();
        sleeps.retain(|sleep| {
            if sleep.wake_at_nanos <= new_time {
                sleep.waker.wake_by_ref();
                false
            } else {
                true
            }
        });
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Future returned by `MockClock::sleep()`.
struct MockSleep {
    id: u64,
    wake_at: u64,
    clock: Arc<MockClockInner>,
}

impl Future for MockSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        // The time check happens under the lock so an `advance` racing with
        // registration either is seen here or finds our entry.
        let mut sleeps = self.clock.pending_sleeps.lock();

        if self.clock.current_nanos.load(Ordering::SeqCst) >= self.wake_at {
            sleeps.retain(|s| s.id != self.id);
            return Poll::Ready(());
        }

        match sleeps.iter_mut().find(|s| s.id == self.id) {
            Some(existing) => existing.waker.clone_from(cx.waker()),
            None => sleeps.push(PendingSleep {
                id: self.id,
                wake_at_nanos: self.wake_at,
                waker: cx.waker().clone(),
            }),
        }
        Poll::Pending
    }
}

impl Drop for MockSleep {
    fn drop(&mut self) {
        self.clock.pending_sleeps.lock().retain(|s| s.id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_clock_advances() {
        let clock = RealClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = clock.now();
        assert!(t2 > t1);
    }

    #[test]
    fn mock_clock_does_not_advance_automatically() {
        let clock = MockClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(t1, clock.now());
    }

    #[test]
    fn mock_clock_advance() {
        let clock = MockClock::new();
        assert_eq!(clock.now(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), 1_000_000_000);

        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), 1_500_000_000);
    }

    #[tokio::test]
    async fn mock_clock_sleep_completes_on_advance() {
        let clock = MockClock::new();
        let sleeper = clock.clone();

        let handle = tokio::spawn(async move {
            sleeper.sleep(Duration::from_secs(1)).await;
            true
        });

        clock.wait_for_sleeps(1).await;
        clock.advance(Duration::from_secs(2));

        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("Timed out waiting for sleep")
            .expect("Task panicked");
        assert!(result);
        assert_eq!(clock.pending_sleeps(), 0);
    }

    #[test]
    fn mock_clock_sleep_stays_pending_before_deadline() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(5));

        assert!(futures_poll_once(&mut sleep).is_pending());
        clock.advance(Duration::from_secs(4));
        assert!(futures_poll_once(&mut sleep).is_pending());
        clock.advance(Duration::from_secs(1));
        assert!(futures_poll_once(&mut sleep).is_ready());
    }

    #[test]
    fn dropped_sleep_is_unregistered() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(5));
        assert!(futures_poll_once(&mut sleep).is_pending());
        assert_eq!(clock.pending_sleeps(), 1);

        drop(sleep);
        assert_eq!(clock.pending_sleeps(), 0);
    }

    fn futures_poll_once(sleep: &mut Sleep) -> Poll<()> {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);
        sleep.as_mut().poll(&mut cx)
    }
}
