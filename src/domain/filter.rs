// Filter descriptor domain model
use super::reading::SiteTime;
use chrono::TimeDelta;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GranularityUnit {
    Minutes,
    Hours,
    Days,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown granularity unit `{0}` (expected minutes, hours or days)")]
pub struct InvalidGranularityUnit(pub String);

impl GranularityUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranularityUnit::Minutes => "minutes",
            GranularityUnit::Hours => "hours",
            GranularityUnit::Days => "days",
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            GranularityUnit::Minutes => 60,
            GranularityUnit::Hours => 60 * 60,
            GranularityUnit::Days => 24 * 60 * 60,
        }
    }
}

impl FromStr for GranularityUnit {
    type Err = InvalidGranularityUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutes" => Ok(GranularityUnit::Minutes),
            "hours" => Ok(GranularityUnit::Hours),
            "days" => Ok(GranularityUnit::Days),
            _ => Err(InvalidGranularityUnit(s.to_string())),
        }
    }
}

impl fmt::Display for GranularityUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket width used for resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Granularity {
    pub quantity: u32,
    pub unit: GranularityUnit,
}

impl Granularity {
    pub fn new(quantity: u32, unit: GranularityUnit) -> Self {
        Self {
            quantity: quantity.max(1),
            unit,
        }
    }

    pub fn width(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.quantity) * self.unit.seconds())
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::new(1, GranularityUnit::Hours)
    }
}

/// Normalised, validated view of the user's chart filter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterDescriptor {
    pub start_time: Option<SiteTime>,
    pub end_time: Option<SiteTime>,
    pub granularity: Granularity,
    pub refresh: bool,
}

impl FilterDescriptor {
    pub fn contains(&self, time: &SiteTime) -> bool {
        self.start_time.is_none_or(|start| *time >= start)
            && self.end_time.is_none_or(|end| *time <= end)
    }
}
