use crate::errors::Result;
use crate::pool::{ClientPool, Publisher};
use crate::reading::{generate_sample, Reading};
use chrono::{DateTime, Local, TimeDelta, Utc};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Simulated timestamps from `start` to `end` inclusive, `step` apart.
#[derive(Debug, Clone)]
pub struct VirtualAxis {
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    step: TimeDelta,
}

impl VirtualAxis {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        let step = TimeDelta::from_std(step)
            .unwrap_or(TimeDelta::MAX)
            .max(TimeDelta::milliseconds(1));
        Self {
            next: Some(start),
            end,
            step,
        }
    }

    /// The `window` of simulated time leading up to `now`.
    pub fn ending_at(now: DateTime<Utc>, window: Duration, step: Duration) -> Self {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        let start = now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(start, now, step)
    }
}

impl Iterator for VirtualAxis {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|t| *t <= self.end)?;
        self.next = current.checked_add_signed(self.step);
        Some(current)
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackSettings {
    pub topic: String,
    pub device_name: String,
    pub base_ts: u64,
    /// Wall-clock pause after each batch.
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub steps: u64,
    pub published: u64,
    /// Readings the client library refused to queue.
    pub dropped: u64,
}

/// Replays the virtual axis: every step, each pooled client publishes one
/// reading, then the loop sleeps for `delay`.
pub struct Playback<R> {
    settings: PlaybackSettings,
    rng: R,
    counter: u64,
    dropped: u64,
}

impl<R: Rng> Playback<R> {
    pub fn new(settings: PlaybackSettings, rng: R) -> Self {
        Self {
            settings,
            rng,
            counter: 0,
            dropped: 0,
        }
    }

    pub async fn run<P: Publisher>(
        &mut self,
        pool: &ClientPool<P>,
        axis: VirtualAxis,
    ) -> Result<PlaybackSummary> {
        if pool.is_empty() {
            warn!("Client pool is empty, nothing will be published");
        }

        let mut steps = 0u64;

        for instant in axis {
            for client in pool.iter() {
                self.publish_one(client)?;
            }
            steps += 1;

            info!("{} send success.", instant.with_timezone(&Local).format("%H:%M:%S"));
            tokio::time::sleep(self.settings.delay).await;
        }

        Ok(PlaybackSummary {
            steps,
            published: self.counter - self.dropped,
            dropped: self.dropped,
        })
    }

    fn publish_one<P: Publisher>(&mut self, client: &P) -> Result<()> {
        // The payload timestamp follows the publish counter, not the virtual axis.
        let ts = self.settings.base_ts + self.counter;
        let reading = Reading::new(
            generate_sample(&mut self.rng),
            client.client_id(),
            self.settings.device_name.as_str(),
            ts,
        );
        let payload = serde_json::to_vec(&reading)?;

        // A refused publish still consumes its ts.
        self.counter += 1;
        match client.publish(&self.settings.topic, payload) {
            Ok(()) => debug!("{} published ts={}", client.client_id(), ts),
            Err(e) => {
                self.dropped += 1;
                warn!("{} failed to publish ts={}: {}", client.client_id(), ts, e);
            }
        }
        Ok(())
    }
}
