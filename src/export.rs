//! One-shot JSON export of a snapshot.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use urbanflow_types::{SensorSet, TrafficSnapshot};

use crate::view::{critical_records, status_tallies};

/// Build the export document: summary, per-sensor records and the
/// critical list.
pub fn export_document(snapshot: &TrafficSnapshot, sensors: &SensorSet) -> Value {
    let tallies: serde_json::Map<String, Value> = status_tallies(snapshot)
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), json!(count)))
        .collect();

    let records: Vec<Value> = snapshot
        .iter()
        .map(|(id, record)| {
            let sensor = sensors.get(id);
            json!({
                "sensor_id": id,
                "name": sensor.map(|s| s.name.as_str()),
                "location": sensor.map(|s| s.location),
                "timestamp": record.timestamp,
                "avg_speed": record.avg_speed,
                "vehicle_count": record.vehicle_count,
                "congestion_index": record.congestion_index,
                "speed_limit": record.speed_limit,
                "status": record.status,
                "history": record.history,
            })
        })
        .collect();

    let critical: Vec<&str> = critical_records(snapshot)
        .iter()
        .map(|r| r.sensor_id.as_str())
        .collect();

    json!({
        "summary": {
            "cycle": snapshot.cycle,
            "taken_at": snapshot.taken_at,
            "synthetic": snapshot.synthetic,
            "total_sensors": snapshot.len(),
            "statuses": tallies,
            "worst_status": snapshot.worst_status(),
        },
        "records": records,
        "critical": critical,
    })
}

/// Write the export document for `snapshot` to `path` as pretty JSON.
pub fn export_to_file(snapshot: &TrafficSnapshot, sensors: &SensorSet, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&export_document(snapshot, sensors))?;
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}
