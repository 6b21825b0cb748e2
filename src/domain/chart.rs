// Aggregated chart domain models
use super::reading::SiteTime;
use chrono::TimeDelta;
use serde::Serialize;

/// Mean depth of every reading in `[bucket_start, bucket_start + width)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPoint {
    pub bucket_start: SiteTime,
    pub mean_depth: f64,
}

impl AggregatedPoint {
    pub fn new(bucket_start: SiteTime, mean_depth: f64) -> Self {
        Self {
            bucket_start,
            mean_depth,
        }
    }
}

/// Time unit the chart axis should be labelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    Minute,
    #[default]
    Hour,
    Day,
}

impl DisplayUnit {
    /// Pick a unit for a window spanning `span`.
    ///
    /// Spans of five minutes or less fall back to `Hour`, same as an empty
    /// window.
    pub fn for_span(span: TimeDelta) -> Self {
        if span > TimeDelta::days(3) {
            DisplayUnit::Day
        } else if span > TimeDelta::hours(2) {
            DisplayUnit::Hour
        } else if span > TimeDelta::minutes(5) {
            DisplayUnit::Minute
        } else {
            DisplayUnit::Hour
        }
    }
}

/// Output of the aggregation engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregation {
    pub points: Vec<AggregatedPoint>,
    pub display_unit: DisplayUnit,
    /// Readings that fell inside the filter window.
    pub reading_count: usize,
}
