//! Minimum spacing between calls to a named external channel.
//!
//! Each channel owns an async mutex around its last recorded call time.
//! Callers queue on that mutex in issue order (tokio mutexes are fair), so a
//! second caller always measures its wait from the first caller's recorded
//! timestamp. The timestamp is written only after the wait completes: a caller
//! dropped mid-wait leaves the previous record in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::clock::{self, Clock};

/// Well-known channels
pub mod channels {
    pub const NOMINATIM: &str = "nominatim";
}

type ChannelSlot = Arc<AsyncMutex<Option<Instant>>>;

#[derive(Debug)]
pub struct Throttle {
    channels: Mutex<HashMap<String, ChannelSlot>>,
    clock: Arc<dyn Clock>,
}

impl Throttle {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(clock::system())
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Suspends until at least `min_interval` has passed since the channel's
    /// last recorded call, then records the current time as the new call.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn wait(&self, channel: &str, min_interval: Duration) {
        let slot = self.slot(channel);
        let mut last_call = slot.lock().await;

        if let Some(last) = *last_call {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < min_interval {
                let remaining = min_interval - elapsed;
                debug!(
                    "Throttling channel '{}' for {:.3}s",
                    channel,
                    remaining.as_secs_f64()
                );
                time::sleep(remaining).await;
            }
        }

        *last_call = Some(self.clock.now());
    }

    /// Time of the last recorded call on a channel
    pub async fn last_call(&self, channel: &str) -> Option<Instant> {
        let slot = self.slot(channel);
        let last = *slot.lock().await;
        last
    }

    fn slot(&self, channel: &str) -> ChannelSlot {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(None)))
            .clone()
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_wait() {
        let throttle = Throttle::new();
        let start = Instant::now();

        throttle.wait("nominatim", INTERVAL).await;

        assert_eq!(Instant::now() - start, Duration::ZERO);
        assert_eq!(throttle.last_call("nominatim").await, Some(start));
    }

    #[tokio::test(start_paused = true)]
    async fn second_call_waits_for_remainder() {
        let throttle = Throttle::new();
        throttle.wait("nominatim", INTERVAL).await;
        let first = Instant::now();

        time::advance(Duration::from_millis(200)).await;
        let issued = Instant::now();
        throttle.wait("nominatim", INTERVAL).await;

        assert_eq!(Instant::now() - issued, Duration::from_millis(800));
        assert_eq!(Instant::now() - first, INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn channels_are_independent() {
        let throttle = Throttle::new();
        let start = Instant::now();

        throttle.wait("nominatim", INTERVAL).await;
        throttle.wait("countries", INTERVAL).await;

        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced_in_issue_order() {
        let throttle = Arc::new(Throttle::new());
        let start = Instant::now();

        let mut handles = Vec::new();
        for index in 0..4u32 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move {
                throttle.wait("nominatim", INTERVAL).await;
                (index, Instant::now())
            }));
            tokio::task::yield_now().await;
        }

        let mut recorded = Vec::new();
        for handle in handles {
            recorded.push(handle.await.unwrap());
        }

        for (index, at) in &recorded {
            assert_eq!(*at - start, INTERVAL * *index);
        }
        for pair in recorded.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_wait_keeps_previous_record() {
        let throttle = Throttle::new();
        throttle.wait("nominatim", INTERVAL).await;
        let first = throttle.last_call("nominatim").await;

        let abandoned = time::timeout(
            Duration::from_millis(100),
            throttle.wait("nominatim", INTERVAL),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(throttle.last_call("nominatim").await, first);

        let issued = Instant::now();
        throttle.wait("nominatim", INTERVAL).await;
        assert_eq!(Instant::now() - issued, Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn injected_clock_drives_the_wait() {
        let clock = Arc::new(crate::clock::ManualClock::new());
        clock.advance(Duration::from_secs(3600));
        let throttle = Throttle::with_clock(clock.clone());

        let start = Instant::now();
        throttle.wait("nominatim", INTERVAL).await;
        throttle.wait("nominatim", INTERVAL).await;
        assert_eq!(Instant::now() - start, INTERVAL);

        clock.advance(Duration::from_millis(400));
        let issued = Instant::now();
        throttle.wait("nominatim", INTERVAL).await;
        assert_eq!(Instant::now() - issued, Duration::from_millis(600));
    }
}
