//! The alert notifier: detect new alerts and relay them once.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use urbanflow_types::Alert;

use crate::channel::{Broadcast, Subscription, DEFAULT_CHANNEL_CAPACITY};
use crate::schedule::PollLoop;
use crate::source::{AlertSource, SourceError};

/// Default time between alert polls.
pub const DEFAULT_ALERT_INTERVAL: Duration = Duration::from_millis(5000);

/// Configuration for an [`AlertNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotifierConfig {
    pub interval: Duration,
    pub channel_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_ALERT_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Polls an alert source and broadcasts each newly arrived alert once.
///
/// The source is expected to return alerts newest first. Only the head of
/// each poll result is considered: it is broadcast if its id differs from
/// the last one broadcast.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    source: Arc<dyn AlertSource>,
    config: NotifierConfig,
    state: Mutex<NotifierState>,
    alerts: Broadcast<Alert>,
    selected: Broadcast<Alert>,
}

#[derive(Debug, Default)]
struct NotifierState {
    last_broadcast_alert_id: Option<String>,
    poller: Option<PollLoop>,
    /// Bumped by `stop()` so a poll in flight cannot broadcast afterwards.
    epoch: u64,
}

impl AlertNotifier {
    /// Create a notifier without starting it.
    pub fn new(source: impl AlertSource + 'static, config: NotifierConfig) -> Self {
        Self::with_shared_source(Arc::new(source), config)
    }

    pub fn with_shared_source(source: Arc<dyn AlertSource>, config: NotifierConfig) -> Self {
        let capacity = config.channel_capacity;
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                state: Mutex::new(NotifierState::default()),
                alerts: Broadcast::new(capacity),
                selected: Broadcast::new(capacity),
            }),
        }
    }

    /// Create a notifier and start polling immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(source: impl AlertSource + 'static, config: NotifierConfig) -> Self {
        let notifier = Self::new(source, config);
        notifier.start();
        notifier
    }

    /// Start polling. Returns `false` if already polling.
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
                    AlertNotifier { inner }.poll_once().await;
                }
            }
        }));

        info!(
            source = self.inner.source.description(),
            interval_ms = self.inner.config.interval.as_millis() as u64,
            "alert notifier started"
        );
        true
    }

    /// Stop polling. Safe to call when not polling.
    pub fn stop(&self) {
        let poller = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.poller.take()
        };
        if let Some(poller) = poller {
            poller.stop();
            info!("alert notifier stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state.lock().poller.is_some()
    }

    /// Id of the most recently broadcast alert.
    pub fn last_broadcast_alert_id(&self) -> Option<String> {
        self.inner.state.lock().last_broadcast_alert_id.clone()
    }

    /// Subscribe to newly arrived alerts. Earlier alerts are not replayed.
    pub fn subscribe(&self) -> Subscription<Alert> {
        self.inner.alerts.subscribe()
    }

    /// Subscribe to "alert selected" events.
    pub fn subscribe_selected(&self) -> Subscription<Alert> {
        self.inner.selected.subscribe()
    }

    /// Signal that the user chose to focus an alert.
    ///
    /// Fire-and-forget: returns how many subscribers received it, and the
    /// event is lost if nobody is listening.
    pub fn select_alert(&self, alert: Alert) -> usize {
        debug!(alert_id = %alert.alert_id, "alert selected");
        self.inner.selected.publish(alert)
    }

    /// Fetch the alerts for one sensor, straight from the source.
    ///
    /// No caching and no deduplication. An unknown sensor gives an empty list.
    pub async fn alerts_for_sensor(&self, sensor_id: &str) -> Result<Vec<Alert>, SourceError> {
        self.inner.source.fetch_alerts(Some(sensor_id)).await
    }

    /// Run one poll cycle. Returns the alert broadcast this cycle, if any.
    pub async fn poll_once(&self) -> Option<Alert> {
        let epoch = self.inner.state.lock().epoch;

        let alerts = match self.inner.source.fetch_alerts(None).await {
            Ok(alerts) => alerts,
            Err(err) => {
                warn!(
                    source = self.inner.source.description(),
                    error = %err,
                    "alert fetch failed"
                );
                return None;
            }
        };

        let mut state = self.inner.state.lock();
        if state.epoch != epoch {
            debug!("discarding alert poll that completed after stop");
            return None;
        }
        process_alerts(&mut state, &alerts, &self.inner.alerts)
    }
}

/// Broadcast the head of a newest-first list if it has not been seen.
fn process_alerts(
    state: &mut NotifierState,
    alerts: &[Alert],
    channel: &Broadcast<Alert>,
) -> Option<Alert> {
    let newest = alerts.first()?;
    if state.last_broadcast_alert_id.as_deref() == Some(newest.alert_id.as_str()) {
        return None;
    }

    info!(
        alert_id = %newest.alert_id,
        sensor_id = %newest.sensor_id,
        kind = %newest.kind,
        "new alert received"
    );
    state.last_broadcast_alert_id = Some(newest.alert_id.clone());
    channel.publish(newest.clone());
    Some(newest.clone())
}
