//! Aggregator behaviour driven through scripted sources.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use urbanflow_core::{
    CongestionStatus, FallbackPolicy, RawReading, SourceError, TrafficAggregator, TrafficSource,
};
use urbanflow_types::{GeoPoint, Sensor, SensorSet};

type Response = Result<Vec<RawReading>, SourceError>;

/// Returns queued responses in order, optionally waiting on a gate first.
/// Once the script runs out every call returns an empty batch.
#[derive(Debug, Default)]
struct ScriptedSource {
    script: Mutex<VecDeque<(Option<oneshot::Receiver<()>>, Response)>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn push(&self, response: Response) {
        self.script.lock().push_back((None, response));
    }

    fn push_gated(&self, response: Response) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().push_back((Some(rx), response));
        tx
    }
}

#[async_trait]
impl TrafficSource for ScriptedSource {
    async fn fetch_readings(&self) -> Result<Vec<RawReading>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next {
            Some((gate, response)) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                response
            }
            None => Ok(Vec::new()),
        }
    }

    fn description(&self) -> &str {
        "scripted"
    }
}

fn reading(id: &str, speed: f64, ci: f64) -> RawReading {
    RawReading {
        street_id: id.to_string(),
        street_name: None,
        average_speed_kph: speed,
        speed_limit_kph: Some(50.0),
        vehicle_count: 20.0,
        congestion_index: Some(ci),
        timestamp_utc: None,
        latitude: Some(40.7128),
        longitude: Some(-74.0060),
    }
}

fn new_york() -> SensorSet {
    std::iter::once(Sensor::new(
        "S1",
        "Broadway",
        GeoPoint::new(40.7128, -74.0060),
        "",
    ))
    .collect()
}

fn aggregator_with(source: Arc<ScriptedSource>) -> TrafficAggregator {
    TrafficAggregator::builder()
        .shared_source(source)
        .sensors(new_york())
        .build()
}

#[tokio::test]
async fn free_then_congested_with_history() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    source.push(Ok(vec![reading("S1", 12.0, 3.0)]));

    let aggregator = aggregator_with(source);
    let mut snapshots = aggregator.subscribe();

    aggregator.poll_once().await.unwrap();
    aggregator.poll_once().await.unwrap();

    let first = snapshots.recv().await.unwrap();
    let second = snapshots.recv().await.unwrap();

    assert_eq!(first.get("S1").unwrap().status, CongestionStatus::Free);
    let s1 = second.get("S1").unwrap();
    assert_eq!(s1.status, CongestionStatus::Congested);
    assert_eq!(s1.history.avg_speed, vec![48.0, 12.0]);
    assert_eq!(s1.history.vehicle_count, vec![20, 20]);
    assert_eq!((first.cycle, second.cycle), (1, 2));
}

#[tokio::test]
async fn history_keeps_last_twenty_samples() {
    let source = Arc::new(ScriptedSource::default());
    for i in 0..30 {
        source.push(Ok(vec![reading("S1", i as f64, 0.1)]));
    }
    let aggregator = aggregator_with(source);

    let mut last = None;
    for _ in 0..30 {
        last = aggregator.poll_once().await;
    }

    let last = last.unwrap();
    let history = &last.get("S1").unwrap().history;
    assert_eq!(history.len(), 20);
    let expected: Vec<f64> = (10..30).map(|i| i as f64).collect();
    assert_eq!(history.avg_speed, expected);
}

#[tokio::test]
async fn late_subscriber_sees_latest_snapshot_only() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    source.push(Ok(vec![reading("S1", 30.0, 0.4)]));
    let aggregator = aggregator_with(source);

    aggregator.poll_once().await.unwrap();
    let s2 = aggregator.poll_once().await.unwrap();

    let mut late = aggregator.subscribe();
    let received = late.recv().await.unwrap();
    assert_eq!(received.cycle, s2.cycle);
    assert_eq!(received.get("S1").unwrap().status, CongestionStatus::Dense);
    assert!(late.try_recv().is_none());
}

#[tokio::test]
async fn snapshot_replaces_previous_wholesale() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(vec![reading("S1", 48.0, 0.1), reading("S2", 48.0, 0.1)]));
    source.push(Ok(vec![reading("S2", 20.0, 2.5)]));
    let aggregator = aggregator_with(source);

    aggregator.poll_once().await.unwrap();
    let second = aggregator.poll_once().await.unwrap();

    assert!(second.get("S1").is_none());
    assert_eq!(second.len(), 1);
}

#[tokio::test]
async fn fetch_failure_publishes_synthetic_and_stream_survives() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Err(SourceError::Timeout));
    source.push(Err(SourceError::Malformed("expected a JSON array".to_string())));
    source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    let aggregator = aggregator_with(source);
    let mut snapshots = aggregator.subscribe();

    for _ in 0..3 {
        aggregator.poll_once().await;
    }

    let first = snapshots.recv().await.unwrap();
    let second = snapshots.recv().await.unwrap();
    let third = snapshots.recv().await.unwrap();

    assert!(first.synthetic && second.synthetic);
    assert!(first.get("S1").is_some());
    assert!(!third.synthetic);
    assert_eq!(third.get("S1").unwrap().avg_speed, 48.0);
    // Synthetic and live samples share one history
    assert_eq!(third.get("S1").unwrap().history.len(), 3);
}

#[tokio::test]
async fn skip_policy_keeps_previous_snapshot() {
    let source = Arc::new(ScriptedSource::default());
    source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    source.push(Err(SourceError::Transport("503".to_string())));
    let aggregator = TrafficAggregator::builder()
        .shared_source(source)
        .sensors(new_york())
        .fallback(FallbackPolicy::Skip)
        .build();

    let first = aggregator.poll_once().await.unwrap();
    assert!(aggregator.poll_once().await.is_none());
    assert_eq!(aggregator.latest().unwrap().cycle, first.cycle);
}

#[tokio::test]
async fn stale_poll_is_discarded() {
    let source = Arc::new(ScriptedSource::default());
    let release_slow = source.push_gated(Ok(vec![reading("S1", 10.0, 5.0)]));
    source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    let aggregator = aggregator_with(source.clone());

    let slow = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.poll_once().await }
    });
    while source.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    // The later poll answers first and wins
    let fast = aggregator.poll_once().await.unwrap();
    assert_eq!(fast.cycle, 1);

    release_slow.send(()).unwrap();
    assert!(slow.await.unwrap().is_none());

    let latest = aggregator.latest().unwrap();
    assert_eq!(latest.get("S1").unwrap().status, CongestionStatus::Free);
    assert_eq!(latest.cycle, 1);
}

#[tokio::test]
async fn stop_discards_in_flight_fetch() {
    let source = Arc::new(ScriptedSource::default());
    let release = source.push_gated(Ok(vec![reading("S1", 48.0, 0.1)]));
    let aggregator = aggregator_with(source.clone());
    let mut snapshots = aggregator.subscribe();

    let in_flight = tokio::spawn({
        let aggregator = aggregator.clone();
        async move { aggregator.poll_once().await }
    });
    while source.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    aggregator.stop();
    release.send(()).unwrap();

    assert!(in_flight.await.unwrap().is_none());
    assert!(aggregator.latest().is_none());
    assert!(snapshots.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn timer_drives_polls_until_stopped() {
    let source = Arc::new(ScriptedSource::default());
    for _ in 0..10 {
        source.push(Ok(vec![reading("S1", 48.0, 0.1)]));
    }
    let aggregator = TrafficAggregator::builder()
        .shared_source(source.clone())
        .interval(Duration::from_millis(3000))
        .build();

    assert!(aggregator.start());
    assert!(!aggregator.start());

    // Ticks at 0, 3 and 6 seconds
    tokio::time::sleep(Duration::from_millis(7000)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(aggregator.latest().unwrap().cycle, 3);

    aggregator.stop();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_never_close_the_stream() {
    let source = Arc::new(ScriptedSource::default());
    for _ in 0..5 {
        source.push(Err(SourceError::Transport("connection refused".to_string())));
    }
    let aggregator = TrafficAggregator::builder()
        .shared_source(source)
        .interval(Duration::from_secs(1))
        .build();
    let mut snapshots = aggregator.subscribe();
    aggregator.start();

    for expected_cycle in 1..=5 {
        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.cycle, expected_cycle);
        assert!(snapshot.synthetic);
    }
    aggregator.stop();
}
