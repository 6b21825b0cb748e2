// Reading domain model
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Timezone every reading is expressed in.
pub const SITE_TZ: Tz = chrono_tz::America::Los_Angeles;

pub type SiteTime = DateTime<Tz>;

/// Why a raw record could not become a [`Reading`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
    #[error("sample_time {0} is out of range")]
    TimeOutOfRange(i64),
    #[error("depth {0} is negative or not finite")]
    InvalidDepth(f64),
}

/// One timestamped sensor depth measurement, in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub time: SiteTime,
    pub depth: f64,
}

impl Reading {
    pub fn new(time: SiteTime, depth: f64) -> Self {
        Self { time, depth }
    }

    /// Build a reading from a raw scan record shaped like
    /// `{ "sample_time": <ms>, "device_data": { "sensor_depth_in": <num|str> } }`.
    ///
    /// Sub-second precision is dropped from `sample_time`.
    pub fn from_record(record: &Value) -> Result<Self, RecordError> {
        let sample_ms = record
            .get("sample_time")
            .ok_or(RecordError::MissingField("sample_time"))
            .and_then(|v| numeric_field("sample_time", v))?;
        let depth = record
            .get("device_data")
            .and_then(|d| d.get("sensor_depth_in"))
            .ok_or(RecordError::MissingField("device_data.sensor_depth_in"))
            .and_then(|v| numeric_field("device_data.sensor_depth_in", v))?;

        if !depth.is_finite() || depth < 0.0 {
            return Err(RecordError::InvalidDepth(depth));
        }

        let unix_secs = (sample_ms / 1000.0).floor() as i64;
        let time = Utc
            .timestamp_opt(unix_secs, 0)
            .single()
            .ok_or(RecordError::TimeOutOfRange(unix_secs))?
            .with_timezone(&SITE_TZ);

        Ok(Self::new(time, depth))
    }
}

fn numeric_field(field: &'static str, value: &Value) -> Result<f64, RecordError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RecordError::NotNumeric {
        field,
        value: value.to_string(),
    })
}

/// Readings ordered non-decreasing by time.
///
/// The only way to build one is through [`ReadingSeries::from_unsorted`], so
/// the ordering holds for every instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingSeries {
    readings: Vec<Reading>,
}

impl ReadingSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_unsorted(mut readings: Vec<Reading>) -> Self {
        // Stable, so duplicates keep their source order.
        readings.sort_by_key(|r| r.time);
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.readings.windows(2).all(|w| w[0].time <= w[1].time)
    }
}
