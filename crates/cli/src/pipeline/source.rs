//! Mock stream producer.
//!
//! Emits `phase + k * period` stamps at wall-clock pace, one stamp tick per
//! `tick` duration, skipping every `drop_every`-th sample.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{Insertion, SourceConfig};
use sync_engine::Captor;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub struct MockSource {
    config: SourceConfig,
    captor: Arc<Captor<i64, Bytes>>,
    tick: Duration,
}

impl MockSource {
    pub fn new(config: SourceConfig, captor: Arc<Captor<i64, Bytes>>, tick: Duration) -> Self {
        Self {
            config,
            captor,
            tick,
        }
    }

    /// Stamp and payload of sample `k`, or `None` if the sample is dropped
    pub fn sample(&self, k: u64) -> Option<(i64, Bytes)> {
        if let Some(every) = self.config.drop_every {
            if (k + 1) % u64::from(every) == 0 {
                return None;
            }
        }
        let stamp = self
            .config
            .phase
            .saturating_add(self.config.period.saturating_mul(k as i64));
        let payload = Bytes::from(vec![(k % 256) as u8; self.config.payload_bytes]);
        Some((stamp, payload))
    }

    /// Produce until `shutdown` is set. Returns the number of inserted samples.
    pub async fn run(self, shutdown: Arc<AtomicBool>, produced: Arc<AtomicU64>) -> u64 {
        let stream = self.captor.stream().clone();
        let pace = self
            .tick
            .saturating_mul(self.config.period.clamp(1, i64::from(u32::MAX)) as u32)
            .max(Duration::from_micros(1));
        let mut interval = tokio::time::interval(pace);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        debug!(stream = %stream, pace_us = pace.as_micros() as u64, "Producer started");

        let mut k = 0u64;
        let mut inserted = 0u64;
        while !shutdown.load(Ordering::Relaxed) {
            interval.tick().await;
            if let Some((stamp, payload)) = self.sample(k) {
                let outcome = self.captor.insert(stamp, payload);
                if outcome != Insertion::Rejected {
                    inserted += 1;
                }
                produced.fetch_add(1, Ordering::Relaxed);
                observability::record_dispatch_produced(&stream);
                trace!(stream = %stream, stamp, outcome = outcome.as_str(), "Dispatch produced");
            }
            k += 1;
        }

        debug!(stream = %stream, inserted, "Producer stopped");
        inserted
    }
}
