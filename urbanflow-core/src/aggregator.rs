//! The traffic aggregator: poll, classify, buffer, publish.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use urbanflow_types::{
    vienna_sensors, ClassifiedRecord, RawReading, Reading, SensorSet, TrafficSnapshot,
    HISTORY_CAPACITY,
};

use crate::channel::{Replay, Subscription, DEFAULT_CHANNEL_CAPACITY};
use crate::history::HistoryBook;
use crate::schedule::PollLoop;
use crate::source::{SyntheticSource, TrafficSource};
use crate::{FallbackPolicy, Mode};

/// Configuration for a [`TrafficAggregator`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Time between polls.
    pub interval: Duration,
    /// What to publish when a fetch fails.
    pub fallback: FallbackPolicy,
    /// Samples kept per history series.
    pub history_capacity: usize,
}

impl AggregatorConfig {
    /// Defaults for a given mode: 5 s live, 3 s simulation.
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            interval: mode.default_traffic_interval(),
            fallback: FallbackPolicy::default(),
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self::for_mode(Mode::default())
    }
}

/// Turns raw readings into a continuously updated, classified snapshot.
///
/// The aggregator owns the per-sensor histories and the snapshot channel.
/// Cloning it yields another handle to the same aggregator.
///
/// # Example
///
/// ```rust
/// use urbanflow_core::TrafficAggregator;
///
/// # tokio_test::block_on(async {
/// // No source given: readings are generated for the reference sensor set.
/// let aggregator = TrafficAggregator::builder().build();
/// let mut snapshots = aggregator.subscribe();
///
/// aggregator.poll_once().await;
///
/// let snapshot = snapshots.recv().await.unwrap();
/// assert_eq!(snapshot.len(), aggregator.sensors().len());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct TrafficAggregator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    source: Arc<dyn TrafficSource>,
    synthetic: SyntheticSource,
    config: AggregatorConfig,
    state: Mutex<AggregatorState>,
    snapshots: Replay<Arc<TrafficSnapshot>>,
}

#[derive(Debug)]
struct AggregatorState {
    histories: HistoryBook,
    /// Sequence number handed to the most recently started poll.
    issued: u64,
    /// Sequence number of the most recently published poll.
    applied: u64,
    /// Bumped by `stop()`; polls started in an older epoch are discarded.
    epoch: u64,
    cycle: u64,
    poller: Option<PollLoop>,
}

impl TrafficAggregator {
    pub fn builder() -> TrafficAggregatorBuilder {
        TrafficAggregatorBuilder::default()
    }

    /// The fixed sensor set, in load order.
    pub fn sensors(&self) -> &SensorSet {
        self.inner.synthetic.sensors()
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    /// Description of the configured source.
    pub fn source_description(&self) -> &str {
        self.inner.source.description()
    }

    /// Subscribe to snapshots. The latest snapshot, if any, is delivered
    /// first, followed by every later one.
    pub fn subscribe(&self) -> Subscription<Arc<TrafficSnapshot>> {
        self.inner.snapshots.subscribe()
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> Option<Arc<TrafficSnapshot>> {
        self.inner.snapshots.latest()
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.lock().poller.is_some()
    }

    /// Start polling at the configured interval.
    ///
    /// Returns `false` (and does nothing) if already running. Must be called
    /// from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut state = self.inner.state.lock();
        if state.poller.is_some() {
            return false;
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        state.poller = Some(PollLoop::spawn(self.inner.config.interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    TrafficAggregator { inner }.poll_once().await;
                }
            }
        }));

        info!(
            source = self.inner.source.description(),
            interval_ms = self.inner.config.interval.as_millis() as u64,
            "traffic aggregator started"
        );
        true
    }

    /// Stop polling. Safe to call when not running.
    ///
    /// Once this returns no further snapshot is published, including from a
    /// poll whose fetch is still in flight.
    pub fn stop(&self) {
        let poller = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.poller.take()
        };
        if let Some(poller) = poller {
            poller.stop();
            info!("traffic aggregator stopped");
        }
    }

    /// Run one poll cycle and publish the result.
    ///
    /// Returns the published snapshot, or `None` when nothing was published:
    /// the fetch failed under [`FallbackPolicy::Skip`], a newer poll already
    /// published, or the aggregator was stopped meanwhile.
    pub async fn poll_once(&self) -> Option<Arc<TrafficSnapshot>> {
        let (seq, epoch) = {
            let mut state = self.inner.state.lock();
            state.issued += 1;
            (state.issued, state.epoch)
        };

        let (raw, synthetic) = match self.inner.source.fetch_readings().await {
            Ok(raw) => (raw, false),
            Err(err) => {
                warn!(
                    source = self.inner.source.description(),
                    error = %err,
                    fallback = ?self.inner.config.fallback,
                    "traffic fetch failed"
                );
                match self.inner.config.fallback {
                    FallbackPolicy::Synthetic => (self.inner.synthetic.generate(), true),
                    FallbackPolicy::Skip => return None,
                }
            }
        };

        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            debug!(seq, "discarding poll that completed after stop");
            return None;
        }
        if seq <= state.applied {
            debug!(seq, applied = state.applied, "discarding stale poll");
            return None;
        }
        state.applied = seq;
        state.cycle += 1;

        let mut snapshot = assemble(state.cycle, &raw, &mut state.histories);
        snapshot.synthetic = synthetic;
        let snapshot = Arc::new(snapshot);

        debug!(
            cycle = snapshot.cycle,
            sensors = snapshot.len(),
            synthetic,
            "publishing traffic snapshot"
        );
        self.inner.snapshots.publish(snapshot.clone());
        Some(snapshot)
    }
}

/// Build a snapshot from one batch of raw readings, recording history.
///
/// When a batch holds several readings for the same sensor only the newest
/// (by timestamp, later position breaking ties) is used.
fn assemble(cycle: u64, raw: &[RawReading], histories: &mut HistoryBook) -> TrafficSnapshot {
    let taken_at = Utc::now();

    let mut latest: BTreeMap<String, Reading> = BTreeMap::new();
    for reading in raw.iter().map(|r| Reading::from_raw(r, taken_at)) {
        match latest.get(&reading.sensor_id) {
            Some(existing) if existing.timestamp > reading.timestamp => {}
            _ => {
                latest.insert(reading.sensor_id.clone(), reading);
            }
        }
    }

    let mut snapshot = TrafficSnapshot::new(cycle, taken_at);
    for (sensor_id, reading) in latest {
        let history = histories.record(&reading);
        snapshot
            .records
            .insert(sensor_id, ClassifiedRecord::new(reading, history));
    }
    snapshot
}

/// Builder for [`TrafficAggregator`].
#[derive(Debug, Default)]
pub struct TrafficAggregatorBuilder {
    source: Option<Arc<dyn TrafficSource>>,
    sensors: Option<SensorSet>,
    config: Option<AggregatorConfig>,
    interval: Option<Duration>,
    fallback: Option<FallbackPolicy>,
    channel_capacity: Option<usize>,
}

impl TrafficAggregatorBuilder {
    /// Set the reading source. Without one the aggregator runs in
    /// simulation mode over its sensor set.
    pub fn source(mut self, source: impl TrafficSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set a shared reading source.
    pub fn shared_source(mut self, source: Arc<dyn TrafficSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the fixed sensor set (default: the Vienna reference set).
    pub fn sensors(mut self, sensors: SensorSet) -> Self {
        self.sensors = Some(sensors);
        self
    }

    /// Start from a full configuration. `interval` and `fallback` still
    /// override it.
    pub fn config(mut self, config: AggregatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Snapshots buffered per subscriber before a slow one skips ahead.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = Some(capacity);
        self
    }

    pub fn build(self) -> TrafficAggregator {
        let sensors = self.sensors.unwrap_or_else(vienna_sensors);
        let synthetic = SyntheticSource::new(sensors);

        let mode = if self.source.is_some() {
            Mode::Live
        } else {
            Mode::Simulation
        };
        let mut config = self
            .config
            .unwrap_or_else(|| AggregatorConfig::for_mode(mode));
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(fallback) = self.fallback {
            config.fallback = fallback;
        }

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(synthetic.clone()) as Arc<dyn TrafficSource>);

        TrafficAggregator {
            inner: Arc::new(Inner {
                source,
                synthetic,
                state: Mutex::new(AggregatorState {
                    histories: HistoryBook::new(config.history_capacity),
                    issued: 0,
                    applied: 0,
                    epoch: 0,
                    cycle: 0,
                    poller: None,
                }),
                config,
                snapshots: Replay::new(
                    self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY),
                ),
            }),
        }
    }
}
