//! The synchronized time base shared by every camera.
//!
//! Clock-domain instants are [Duration]s since the clock epoch, in the
//! same nanosecond unit as the start time carried by control messages.
//! Synchronizing the clock to the authority is not done here; a handle
//! only reports the current time and whether it is already in sync.

use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::time::sleep;
use tracing::{debug, info};

/// A clock already synchronized, or being synchronized, to the authority.
pub trait SyncClock: Send + Sync {
    /// Current clock-domain instant.
    fn now(&self) -> Duration;

    /// Whether the clock has settled on the authority's time.
    fn is_synced(&self) -> bool {
        true
    }
}

/// The host's realtime clock, counted from the UNIX epoch.
///
/// This is the clock the authority serves, so on the authority itself it
/// is in sync by definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SyncClock for SystemClock {
    fn now(&self) -> Duration {
        // A host clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// A clock driven by hand, for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
    synced: AtomicBool,
}

impl ManualClock {
    /// An unsynced clock reading `start`.
    pub fn new(start: Duration) -> Self {
        Self {
            nanos: AtomicU64::new(start.as_nanos() as u64),
            synced: AtomicBool::new(false),
        }
    }

    pub fn set(&self, time: Duration) {
        self.nanos.store(time.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::SeqCst);
    }
}

impl SyncClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }
}

/// Wait until `clock` reports it is synchronized, checking every `poll`.
///
/// There is no timeout; a camera cannot show a meaningful race time on an
/// unsynchronized clock.
pub async fn wait_for_sync<C>(clock: &C, poll: Duration)
where
    C: SyncClock + ?Sized,
{
    if !clock.is_synced() {
        info!("waiting for clock to synchronize");
    }

    while !clock.is_synced() {
        debug!(poll = ?poll, "clock not yet synchronized");
        sleep(poll).await;
    }

    debug!(now = ?clock.now(), "clock synchronized");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::timeout;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(Duration::from_secs(10));
        assert_eq!(clock.now(), Duration::from_secs(10));
        assert!(!clock.is_synced());

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(10_250));

        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_synced() {
        let clock = SystemClock;
        assert!(clock.is_synced());
        assert!(clock.now() > Duration::from_secs(1_600_000_000));
    }

    #[tokio::test]
    async fn test_wait_for_sync() {
        let clock = Arc::new(ManualClock::new(Duration::ZERO));

        let setter = {
            let clock = clock.clone();
            tokio::spawn(async move {
                sleep(Duration::from_millis(30)).await;
                clock.set_synced(true);
            })
        };

        timeout(
            Duration::from_secs(2),
            wait_for_sync(clock.as_ref(), Duration::from_millis(5)),
        )
        .await
        .unwrap();
        assert!(clock.is_synced());
        setter.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_sync_pending() {
        let clock = ManualClock::new(Duration::ZERO);
        let result = timeout(
            Duration::from_millis(50),
            wait_for_sync(&clock, Duration::from_millis(5)),
        )
        .await;
        assert!(result.is_err());
    }
}
