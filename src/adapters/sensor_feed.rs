//! Sensor feed adapter.
//!
//! The field node publishes one JSON object per measurement:
//!
//! ```json
//! {"raspberryId":"raspi-01","soilMoisture":41.5,"waterLevel":1,
//!  "temperature":22.4,"humidity":63.0,"timestamp":"2024-05-01T09:30:00"}
//! ```
//!
//! `timestamp` carries no zone; it is local time at the farm, converted
//! here with the configured UTC offset.

use chrono::{FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use log::{debug, warn};
use serde::Deserialize;

use super::memory::LatestReading;
use crate::model::SensorReading;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Not valid JSON, or a required field is missing or mistyped.
    Malformed(String),
    /// `timestamp` did not match `yyyy-MM-ddTHH:mm:ss`.
    BadTimestamp(String),
    /// Older than the reading already held.
    OutOfOrder,
}

impl core::fmt::Display for FeedError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed sensor payload: {}", msg),
            Self::BadTimestamp(ts) => write!(f, "bad timestamp '{}'", ts),
            Self::OutOfOrder => write!(f, "reading older than the latest one"),
        }
    }
}

impl std::error::Error for FeedError {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SensorPayload {
    #[serde(default)]
    raspberry_id: Option<String>,
    soil_moisture: f32,
    water_level: i32,
    temperature: f32,
    humidity: f32,
    timestamp: String,
}

/// Parse one device payload into a [`SensorReading`].
pub fn parse_payload(json: &str, offset: FixedOffset) -> Result<SensorReading, FeedError> {
    let payload: SensorPayload =
        serde_json::from_str(json).map_err(|e| FeedError::Malformed(e.to_string()))?;

    let naive = NaiveDateTime::parse_from_str(&payload.timestamp, TIMESTAMP_FORMAT)
        .map_err(|_| FeedError::BadTimestamp(payload.timestamp.clone()))?;
    let at = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| FeedError::BadTimestamp(payload.timestamp.clone()))?;
    let timestamp_ms = u64::try_from(at.timestamp_millis())
        .map_err(|_| FeedError::BadTimestamp(payload.timestamp.clone()))?;

    if let Some(id) = &payload.raspberry_id {
        debug!("Feed: reading from '{}' at {}", id, payload.timestamp);
    }

    Ok(SensorReading {
        temperature: payload.temperature,
        humidity: payload.humidity,
        soil_moisture: payload.soil_moisture,
        water_level: payload.water_level,
        timestamp_ms,
    })
}

/// Parses payloads and stores the result as the latest reading.
#[derive(Debug, Clone)]
pub struct SensorFeed {
    latest: LatestReading,
    offset: FixedOffset,
}

impl SensorFeed {
    /// Out-of-range offsets fall back to UTC.
    pub fn new(latest: LatestReading, utc_offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self { latest, offset }
    }

    /// Ingest one raw message.
    pub fn ingest(&self, json: &str) -> Result<SensorReading, FeedError> {
        let reading = parse_payload(json, self.offset).inspect_err(|e| {
            warn!("Feed: {}", e);
        })?;
        if !self.latest.record(reading) {
            warn!("Feed: dropped out-of-order reading at {}", reading.timestamp_ms);
            return Err(FeedError::OutOfOrder);
        }
        debug!(
            "Feed: T={:.1}C H={:.1}% soil={:.1}% level={}",
            reading.temperature, reading.humidity, reading.soil_moisture, reading.water_level
        );
        Ok(reading)
    }
}
