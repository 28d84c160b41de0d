use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use urbanflow::view::{render_sparkline, summary_line, MarkerFilter};
use urbanflow::{export_to_file, Settings};
use urbanflow_adapters::{HttpAlertSource, HttpTrafficSource};
use urbanflow_core::{
    Alert, AlertNotifier, CongestionStatus, FallbackPolicy, Mode, TrafficAggregator,
    TrafficSnapshot,
};
use urbanflow_types::SensorSet;

#[derive(Parser, Debug)]
#[command(name = "urbanflow")]
#[command(about = "Headless traffic monitor: classifies sensor congestion and relays alerts")]
struct Args {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reading source: live or simulation
    #[arg(short, long)]
    mode: Option<Mode>,

    /// API gateway base URL
    #[arg(long)]
    base_url: Option<String>,

    /// API id behind the gateway
    #[arg(long)]
    api_id: Option<String>,

    /// Traffic poll interval in milliseconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// Alert poll interval in milliseconds
    #[arg(long)]
    alert_interval: Option<u64>,

    /// What to publish when a fetch fails: synthetic or skip
    #[arg(long)]
    fallback: Option<FallbackPolicy>,

    /// JSON file with the sensor set
    #[arg(long)]
    sensors: Option<PathBuf>,

    /// Only show sensors whose id, name or description contains this
    #[arg(short, long)]
    search: Option<String>,

    /// Only show sensors with this status (repeatable)
    #[arg(long = "status")]
    statuses: Vec<CongestionStatus>,

    /// Run one aggregation cycle, export it to a JSON file and exit
    #[arg(short, long, conflicts_with = "alerts_for")]
    export: Option<PathBuf>,

    /// Print the alerts for one sensor and exit
    #[arg(long)]
    alerts_for: Option<String>,
}

impl Args {
    /// Command-line flags take precedence over every other settings layer.
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(mode) = self.mode {
            settings.mode = mode;
        }
        if let Some(base_url) = &self.base_url {
            settings.api.base_url = base_url.clone();
        }
        if let Some(api_id) = &self.api_id {
            settings.api.api_id = api_id.clone();
        }
        if let Some(interval) = self.interval {
            settings.traffic_interval_ms = Some(interval);
        }
        if let Some(interval) = self.alert_interval {
            settings.alert_interval_ms = Some(interval);
        }
        if let Some(fallback) = self.fallback {
            settings.fallback = fallback;
        }
        if let Some(path) = &self.sensors {
            settings.sensors_file = Some(path.clone());
        }
    }

    fn filter(&self) -> MarkerFilter {
        MarkerFilter::new()
            .with_search(self.search.as_deref().unwrap_or_default())
            .with_statuses(self.statuses.iter().copied())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply_to(&mut settings);
    let sensors = settings.load_sensors()?;

    let rt = tokio::runtime::Runtime::new()?;

    if let Some(sensor_id) = &args.alerts_for {
        return rt.block_on(print_sensor_alerts(&settings, sensor_id));
    }

    let aggregator = build_aggregator(&settings, sensors.clone())?;

    if let Some(export_path) = &args.export {
        return rt.block_on(export_once(&aggregator, &sensors, export_path));
    }

    rt.block_on(run(&settings, aggregator, sensors, args.filter()))
}

fn build_aggregator(settings: &Settings, sensors: SensorSet) -> Result<TrafficAggregator> {
    let builder = TrafficAggregator::builder()
        .sensors(sensors)
        .config(settings.aggregator_config());

    let builder = match settings.mode {
        Mode::Simulation => builder,
        Mode::Live => builder.source(
            HttpTrafficSource::builder()
                .endpoints(settings.api.endpoints())
                .timeout(settings.api.timeout())
                .build()?,
        ),
    };
    Ok(builder.build())
}

fn build_notifier(settings: &Settings) -> Result<AlertNotifier> {
    let source = HttpAlertSource::builder()
        .endpoints(settings.api.endpoints())
        .timeout(settings.api.timeout())
        .build()?;
    Ok(AlertNotifier::with_shared_source(
        Arc::new(source),
        settings.notifier_config(),
    ))
}

/// Poll until interrupted, printing each snapshot and every new alert.
async fn run(
    settings: &Settings,
    aggregator: TrafficAggregator,
    sensors: SensorSet,
    filter: MarkerFilter,
) -> Result<()> {
    // Alerts only exist behind the API
    let notifier = if settings.api.api_id.is_empty() {
        info!("no api_id configured, alert polling disabled");
        None
    } else {
        Some(build_notifier(settings)?)
    };

    let mut snapshots = aggregator.subscribe();
    let mut alerts = notifier.as_ref().map(AlertNotifier::subscribe);

    aggregator.start();
    if let Some(notifier) = &notifier {
        notifier.start();
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(snapshot) = snapshots.recv() => print_snapshot(&snapshot, &sensors, &filter),
            Some(alert) = async {
                match alerts.as_mut() {
                    Some(alerts) => alerts.recv().await,
                    None => std::future::pending::<Option<Alert>>().await,
                }
            } => {
                warn!(
                    alert_id = %alert.alert_id,
                    sensor_id = %alert.sensor_id,
                    street = %alert.street_name,
                    kind = %alert.kind,
                    "traffic alert"
                );
            }
            result = &mut shutdown => {
                result.context("failed to listen for ctrl-c")?;
                info!("shutting down");
                break;
            }
        }
    }

    aggregator.stop();
    if let Some(notifier) = &notifier {
        notifier.stop();
    }
    Ok(())
}

fn print_snapshot(snapshot: &TrafficSnapshot, sensors: &SensorSet, filter: &MarkerFilter) {
    println!("{}", summary_line(snapshot));
    for sensor in filter.visible(sensors, Some(snapshot)) {
        match snapshot.get(&sensor.id) {
            Some(record) => println!(
                "  {:<6} {:<28} {:<5} {:>5.1} km/h  ci {:>6.2}  {}",
                sensor.id,
                sensor.name,
                record.status.symbol(),
                record.avg_speed,
                record.congestion_index,
                render_sparkline(&record.history.avg_speed)
            ),
            None => println!("  {:<6} {:<28} -", sensor.id, sensor.name),
        }
    }
}

/// Run a single aggregation cycle and write it out.
async fn export_once(
    aggregator: &TrafficAggregator,
    sensors: &SensorSet,
    export_path: &Path,
) -> Result<()> {
    let Some(snapshot) = aggregator.poll_once().await else {
        bail!("no snapshot produced (fetch failed and fallback is 'skip')");
    };
    export_to_file(&snapshot, sensors, export_path)?;
    println!("Exported traffic state to: {}", export_path.display());
    Ok(())
}

async fn print_sensor_alerts(settings: &Settings, sensor_id: &str) -> Result<()> {
    let notifier = build_notifier(settings)?;
    let alerts = notifier
        .alerts_for_sensor(sensor_id)
        .await
        .with_context(|| format!("failed to fetch alerts for {}", sensor_id))?;
    println!("{}", serde_json::to_string_pretty(&alerts)?);
    Ok(())
}
