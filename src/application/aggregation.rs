// Aggregation engine - Window, resample and pick a display unit
use crate::domain::chart::{AggregatedPoint, Aggregation, DisplayUnit};
use crate::domain::filter::{FilterDescriptor, Granularity, GranularityUnit};
use crate::domain::reading::{Reading, ReadingSeries, SiteTime, SITE_TZ};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::OffsetComponents;
use std::collections::BTreeMap;

/// Running mean for one bucket.
#[derive(Debug, Clone, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Window `series` to the filter's bounds and average it into buckets of the
/// filter's granularity.
///
/// Minute and hour buckets are fixed spans of real time on a grid anchored at
/// 1970-01-01 00:00 Pacific standard time, so a one-hour bucket always starts
/// on the hour and the repeated hour in November stays two buckets. Day
/// buckets run from local midnight to local midnight. Empty buckets are not
/// emitted.
pub fn aggregate(series: &ReadingSeries, filter: &FilterDescriptor) -> Aggregation {
    let window: Vec<&Reading> = series
        .readings()
        .iter()
        .filter(|r| filter.contains(&r.time))
        .collect();

    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return Aggregation::default();
    };
    let display_unit = DisplayUnit::for_span(last.time - first.time);

    let mut buckets: BTreeMap<SiteTime, Accumulator> = BTreeMap::new();
    for reading in &window {
        buckets
            .entry(bucket_start(&reading.time, &filter.granularity))
            .or_default()
            .add(reading.depth);
    }

    let points = buckets
        .into_iter()
        .map(|(start, acc)| AggregatedPoint::new(start, acc.mean()))
        .collect();

    Aggregation {
        points,
        display_unit,
        reading_count: window.len(),
    }
}

/// Start of the bucket containing `time`.
fn bucket_start(time: &SiteTime, granularity: &Granularity) -> SiteTime {
    match granularity.unit {
        GranularityUnit::Minutes | GranularityUnit::Hours => {
            let standard = time.offset().base_utc_offset().num_seconds();
            let local = time.timestamp() + standard;
            let floored = local - local.rem_euclid(granularity.width().num_seconds());
            DateTime::from_timestamp(floored - standard, 0)
                .map(|dt| dt.with_timezone(&SITE_TZ))
                .unwrap_or(*time)
        }
        GranularityUnit::Days => {
            let days = time.date_naive().signed_duration_since(epoch_date()).num_days();
            let floored = days - days.rem_euclid(i64::from(granularity.quantity));
            local_midnight(epoch_date() + TimeDelta::days(floored)).unwrap_or(*time)
        }
    }
}

fn epoch_date() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

fn local_midnight(date: NaiveDate) -> Option<SiteTime> {
    SITE_TZ.from_local_datetime(&date.and_time(NaiveTime::MIN)).earliest()
}
