//! Sensor identity and the fixed sensor set.

use std::collections::HashMap;

/// A geographic coordinate in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Static identity of a measuring point. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sensor {
    /// Unique sensor id (the API calls it `street_id`).
    pub id: String,
    /// Display name.
    pub name: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub description: String,
}

impl Sensor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        location: GeoPoint,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location,
            description: description.into(),
        }
    }
}

/// The ordered, fixed set of sensors known at startup.
///
/// Ids are unique: inserting a sensor whose id already exists replaces the
/// earlier entry in place, keeping its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSet {
    sensors: Vec<Sensor>,
    index: HashMap<String, usize>,
}

impl SensorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a sensor.
    pub fn insert(&mut self, sensor: Sensor) {
        match self.index.get(&sensor.id) {
            Some(&pos) => self.sensors[pos] = sensor,
            None => {
                self.index.insert(sensor.id.clone(), self.sensors.len());
                self.sensors.push(sensor);
            }
        }
    }

    /// Look up a sensor by id.
    pub fn get(&self, id: &str) -> Option<&Sensor> {
        self.index.get(id).map(|&pos| &self.sensors[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Sensors in load order.
    pub fn as_slice(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.iter()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Parse a JSON array of sensors.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let sensors: Vec<Sensor> = serde_json::from_str(json)?;
        Ok(sensors.into_iter().collect())
    }
}

impl FromIterator<Sensor> for SensorSet {
    fn from_iter<I: IntoIterator<Item = Sensor>>(iter: I) -> Self {
        let mut set = SensorSet::new();
        for sensor in iter {
            set.insert(sensor);
        }
        set
    }
}

impl<'a> IntoIterator for &'a SensorSet {
    type Item = &'a Sensor;
    type IntoIter = std::slice::Iter<'a, Sensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.sensors.iter()
    }
}

/// Reference sensor set: six measuring points across Vienna.
pub fn vienna_sensors() -> SensorSet {
    [
        (
            "S001",
            "A23 Südosttangente / Praterbrücke",
            GeoPoint::new(48.205, 16.425),
            "High volume commuter route",
        ),
        (
            "S002",
            "B1 Wiener Straße / Schönbrunn",
            GeoPoint::new(48.185, 16.320),
            "Tourist and local traffic",
        ),
        (
            "S003",
            "Ringstraße / Oper",
            GeoPoint::new(48.202, 16.369),
            "City center loop",
        ),
        (
            "S004",
            "Gürtel / Westbahnhof",
            GeoPoint::new(48.196, 16.338),
            "Major urban arterial",
        ),
        (
            "S005",
            "Donauufer Autobahn (A22)",
            GeoPoint::new(48.235, 16.400),
            "Northern connector",
        ),
        (
            "S006",
            "Handelskai",
            GeoPoint::new(48.230, 16.380),
            "Riverbank commercial route",
        ),
    ]
    .into_iter()
    .map(|(id, name, location, description)| Sensor::new(id, name, location, description))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vienna_fixture() {
        let sensors = vienna_sensors();
        assert_eq!(sensors.len(), 6);
        let ids: Vec<&str> = sensors.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["S001", "S002", "S003", "S004", "S005", "S006"]);
        assert_eq!(sensors.get("S003").unwrap().name, "Ringstraße / Oper");
        assert!(sensors.get("S999").is_none());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut set = vienna_sensors();
        set.insert(Sensor::new("S002", "Renamed", GeoPoint::new(0.0, 0.0), ""));
        assert_eq!(set.len(), 6);
        assert_eq!(set.as_slice()[1].name, "Renamed");
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"id": "S1", "name": "Broadway", "location": {"lat": 40.7128, "lng": -74.0060}},
            {"id": "S2", "name": "5th Ave", "location": {"lat": 40.7306, "lng": -73.9866}, "description": "north"}
        ]"#;
        let set = SensorSet::from_json(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("S1").unwrap().location, GeoPoint::new(40.7128, -74.0060));
        assert_eq!(set.get("S1").unwrap().description, "");
        assert!(SensorSet::from_json("{}").is_err());
    }
}
