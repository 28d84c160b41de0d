//! Shared request plumbing for the HTTP sources.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::AdapterError;

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn build_client(timeout: Duration) -> Result<Client, AdapterError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdapterError::Config(e.to_string()))
}

/// GET `url` and decode a JSON array of records.
///
/// Returns `Ok(None)` on 404 so callers can decide what "not found" means.
pub(crate) async fn get_array<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<Option<Vec<T>>, AdapterError> {
    let response = client.get(url).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !response.status().is_success() {
        return Err(AdapterError::Http(format!(
            "API returned status {}",
            response.status()
        )));
    }

    let body = response.text().await?;
    parse_array(&body).map(Some)
}

/// GET `url` and decode a single JSON record, where `null` means "no record".
///
/// A 404 also yields `Ok(None)`.
pub(crate) async fn get_one<T: DeserializeOwned>(
    client: &Client,
    url: &str,
) -> Result<Option<T>, AdapterError> {
    let response = client.get(url).send().await?;

    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !response.status().is_success() {
        return Err(AdapterError::Http(format!(
            "API returned status {}",
            response.status()
        )));
    }

    let body = response.text().await?;
    parse_one(&body)
}

/// Decode a body that must be a JSON object of `T` or `null`.
pub(crate) fn parse_one<T: DeserializeOwned>(body: &str) -> Result<Option<T>, AdapterError> {
    let value: Value = serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| AdapterError::Parse(e.to_string())),
        other => Err(AdapterError::UnexpectedShape(kind_of(&other))),
    }
}

/// Decode a body that must be a JSON array of `T`.
pub(crate) fn parse_array<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, AdapterError> {
    let value: Value = serde_json::from_str(body).map_err(|e| AdapterError::Parse(e.to_string()))?;
    match value {
        Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| AdapterError::Parse(e.to_string()))
        }
        other => Err(AdapterError::UnexpectedShape(kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use urbanflow_types::RawReading;

    #[test]
    fn test_parse_array_of_readings() {
        let body = r#"[
            {"street_id": "S001", "average_speed_kph": 42.5, "vehicle_count": 17,
             "congestion_index": 0.88, "timestamp_utc": "2024-05-01T08:00:00Z"}
        ]"#;
        let readings: Vec<RawReading> = parse_array(body).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].street_id, "S001");
        assert_eq!(readings[0].congestion_index, Some(0.88));
    }

    #[test]
    fn test_parse_rejects_non_arrays() {
        let err = parse_array::<RawReading>(r#"{"message": "Internal server error"}"#).unwrap_err();
        assert!(matches!(err, AdapterError::UnexpectedShape("object")));

        let err = parse_array::<RawReading>("null").unwrap_err();
        assert!(matches!(err, AdapterError::UnexpectedShape("null")));
    }

    #[test]
    fn test_parse_reports_bad_json_and_bad_records() {
        assert!(matches!(
            parse_array::<RawReading>("<html>"),
            Err(AdapterError::Parse(_))
        ));
        assert!(matches!(
            parse_array::<RawReading>(r#"[{"street_id": 7}]"#),
            Err(AdapterError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_single_record_or_null() {
        let body = r#"{"street_id": "S002", "average_speed_kph": 61.0, "vehicle_count": 9}"#;
        let reading: Option<RawReading> = parse_one(body).unwrap();
        assert_eq!(reading.unwrap().street_id, "S002");

        assert!(parse_one::<RawReading>("null").unwrap().is_none());
        assert!(matches!(
            parse_one::<RawReading>("[]"),
            Err(AdapterError::UnexpectedShape("array"))
        ));
    }

    #[test]
    fn test_parse_empty_array() {
        let readings: Vec<RawReading> = parse_array("[]").unwrap();
        assert!(readings.is_empty());
    }
}
