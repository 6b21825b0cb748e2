// Filter resolver - Raw request parameters to a validated filter descriptor
use crate::domain::filter::{FilterDescriptor, Granularity, GranularityUnit};
use crate::domain::reading::{SiteTime, SITE_TZ};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Date-time format accepted for `start_time` and `end_time`.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Loosely typed parameters exactly as they arrive from the client.
///
/// `None` means the parameter was not sent at all; `Some("")` means it was
/// sent blank and clears any remembered value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFilterParams {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub granularity_quantity: Option<String>,
    pub granularity_unit: Option<String>,
    pub refresh: Option<String>,
}

impl RawFilterParams {
    pub fn is_empty(&self) -> bool {
        self.start_time.is_none()
            && self.end_time.is_none()
            && self.granularity_quantity.is_none()
            && self.granularity_unit.is_none()
            && self.refresh.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} `{value}` is not a valid date-time (expected YYYY-MM-DD HH:MM:SS)")]
    InvalidTimeFormat { field: &'static str, value: String },
    #[error("{field} `{value}` does not exist in America/Los_Angeles")]
    NonexistentLocalTime { field: &'static str, value: String },
    #[error("end_time {0} is in the future")]
    EndTimeInFuture(String),
}

/// Resolve `raw` into a filter descriptor.
///
/// Parameters missing from `raw` are taken from `prior`, then from the
/// defaults. `refresh` is never inherited.
pub fn resolve(
    raw: &RawFilterParams,
    prior: Option<&FilterDescriptor>,
    now: DateTime<Utc>,
) -> Result<FilterDescriptor, ValidationError> {
    let fallback = prior.cloned().unwrap_or_default();

    let start_time = match raw.start_time.as_deref() {
        Some(text) => parse_time("start_time", text, Bound::Start)?,
        None => fallback.start_time,
    };
    let end_time = match raw.end_time.as_deref() {
        Some(text) => parse_time("end_time", text, Bound::End)?,
        None => fallback.end_time,
    };
    if let Some(end) = end_time {
        if end.with_timezone(&Utc) > now {
            return Err(ValidationError::EndTimeInFuture(end.format(TIME_FORMAT).to_string()));
        }
    }

    let quantity = match raw.granularity_quantity.as_deref() {
        Some(text) => parse_quantity(text),
        None => fallback.granularity.quantity,
    };
    let unit = match raw.granularity_unit.as_deref() {
        Some(text) => parse_unit(text),
        None => fallback.granularity.unit,
    };
    let refresh = raw.refresh.as_deref().is_some_and(parse_flag);

    Ok(FilterDescriptor {
        start_time,
        end_time,
        granularity: Granularity::new(quantity, unit),
        refresh,
    })
}

/// Which side of the window a time bounds. A wall time repeated by the
/// fall-back change resolves outward, so the window covers every instant
/// showing that wall time.
#[derive(Debug, Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_time(
    field: &'static str,
    text: &str,
    bound: Bound,
) -> Result<Option<SiteTime>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let naive = NaiveDateTime::parse_from_str(text, TIME_FORMAT).map_err(|_| {
        ValidationError::InvalidTimeFormat {
            field,
            value: text.to_string(),
        }
    })?;
    let local = SITE_TZ.from_local_datetime(&naive);
    let resolved = match bound {
        Bound::Start => local.earliest(),
        Bound::End => local.latest(),
    };
    resolved
        .map(Some)
        .ok_or_else(|| ValidationError::NonexistentLocalTime {
            field,
            value: text.to_string(),
        })
}

fn parse_quantity(text: &str) -> u32 {
    let text = text.trim();
    match text.parse::<i64>() {
        Ok(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => {
            if !text.is_empty() {
                tracing::warn!("Ignoring granularity_quantity `{}`, using 1", text);
            }
            1
        }
    }
}

fn parse_unit(text: &str) -> GranularityUnit {
    if text.trim().is_empty() {
        return GranularityUnit::Hours;
    }
    text.parse().unwrap_or_else(|e| {
        tracing::warn!("{}, using hours", e);
        GranularityUnit::Hours
    })
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "y" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawFilterParams {
        let mut params = RawFilterParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "start_time" => params.start_time = value,
                "end_time" => params.end_time = value,
                "granularity_quantity" => params.granularity_quantity = value,
                "granularity_unit" => params.granularity_unit = value,
                "refresh" => params.refresh = value,
                other => panic!("unknown parameter {other}"),
            }
        }
        params
    }

    #[test]
    fn test_defaults() {
        let filter = resolve(&RawFilterParams::default(), None, now()).unwrap();
        assert_eq!(filter, FilterDescriptor::default());
        assert_eq!(filter.granularity, Granularity::new(1, GranularityUnit::Hours));
        assert!(!filter.refresh);
    }

    #[test]
    fn test_parses_all_fields() {
        let filter = resolve(
            &raw(&[
                ("start_time", "2024-01-01 00:00:00"),
                ("end_time", "2024-01-02 06:30:00"),
                ("granularity_quantity", "15"),
                ("granularity_unit", "minutes"),
                ("refresh", "y"),
            ]),
            None,
            now(),
        )
        .unwrap();

        assert_eq!(
            filter.start_time,
            Some(SITE_TZ.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            filter.end_time,
            Some(SITE_TZ.with_ymd_and_hms(2024, 1, 2, 6, 30, 0).unwrap())
        );
        assert_eq!(filter.granularity, Granularity::new(15, GranularityUnit::Minutes));
        assert!(filter.refresh);
    }

    #[test]
    fn test_bad_time_is_validation_error() {
        let err = resolve(&raw(&[("start_time", "yesterday")]), None, now()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidTimeFormat {
                field: "start_time",
                value: "yesterday".to_string()
            }
        );

        let err = resolve(&raw(&[("end_time", "2024-01-01T00:00:00")]), None, now()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimeFormat { field: "end_time", .. }));
    }

    #[test]
    fn test_skipped_local_time_is_rejected() {
        let err = resolve(&raw(&[("start_time", "2024-03-10 02:30:00")]), None, now()).unwrap_err();
        assert!(matches!(err, ValidationError::NonexistentLocalTime { .. }));
    }

    #[test]
    fn test_repeated_wall_time_widens_window() {
        let later_now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let filter = resolve(
            &raw(&[
                ("start_time", "2024-11-03 01:30:00"),
                ("end_time", "2024-11-03 01:30:00"),
            ]),
            None,
            later_now,
        )
        .unwrap();

        let start = filter.start_time.unwrap();
        let end = filter.end_time.unwrap();
        assert_eq!(start.to_rfc3339(), "2024-11-03T01:30:00-07:00");
        assert_eq!(end.to_rfc3339(), "2024-11-03T01:30:00-08:00");
        assert_eq!(end - start, chrono::TimeDelta::hours(1));
    }

    #[test]
    fn test_future_end_time_is_rejected() {
        let err = resolve(&raw(&[("end_time", "2024-06-02 00:00:00")]), None, now()).unwrap_err();
        assert_eq!(err, ValidationError::EndTimeInFuture("2024-06-02 00:00:00".to_string()));
    }

    #[test]
    fn test_inverted_window_is_accepted() {
        let filter = resolve(
            &raw(&[
                ("start_time", "2024-02-01 00:00:00"),
                ("end_time", "2024-01-01 00:00:00"),
            ]),
            None,
            now(),
        )
        .unwrap();
        assert!(filter.start_time > filter.end_time);
    }

    #[test]
    fn test_quantity_and_unit_fall_back() {
        for quantity in ["0", "-4", "lots", ""] {
            let filter = resolve(&raw(&[("granularity_quantity", quantity)]), None, now()).unwrap();
            assert_eq!(filter.granularity.quantity, 1, "quantity {quantity:?}");
        }

        let filter = resolve(&raw(&[("granularity_unit", "fortnights")]), None, now()).unwrap();
        assert_eq!(filter.granularity.unit, GranularityUnit::Hours);
    }

    #[test]
    fn test_prior_fills_missing_fields() {
        let prior = resolve(
            &raw(&[
                ("start_time", "2024-01-01 00:00:00"),
                ("granularity_quantity", "3"),
                ("granularity_unit", "days"),
                ("refresh", "true"),
            ]),
            None,
            now(),
        )
        .unwrap();

        let filter = resolve(&raw(&[("granularity_quantity", "2")]), Some(&prior), now()).unwrap();

        assert_eq!(filter.start_time, prior.start_time);
        assert_eq!(filter.granularity, Granularity::new(2, GranularityUnit::Days));
        assert!(!filter.refresh);
    }

    #[test]
    fn test_blank_field_clears_prior() {
        let prior = resolve(&raw(&[("start_time", "2024-01-01 00:00:00")]), None, now()).unwrap();
        let filter = resolve(&raw(&[("start_time", "")]), Some(&prior), now()).unwrap();
        assert_eq!(filter.start_time, None);
    }

    #[test]
    fn test_is_empty() {
        assert!(RawFilterParams::default().is_empty());
        assert!(!raw(&[("refresh", "")]).is_empty());
    }
}
