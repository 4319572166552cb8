use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Coarse classification of the sample spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series.ts")]
pub enum IntervalClass {
    #[serde(rename = "15min")]
    Min15,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "other")]
    Other,
}

impl IntervalClass {
    pub fn from_interval(interval: TimeDelta) -> Self {
        if interval == TimeDelta::minutes(15) {
            IntervalClass::Min15
        } else if interval == TimeDelta::hours(1) {
            IntervalClass::Hourly
        } else {
            IntervalClass::Other
        }
    }
}

/// Temporal resolution of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series.ts")]
pub struct IndexMeta {
    pub is_datetime: bool,
    /// Mean spacing of consecutive samples, rounded to whole minutes
    #[serde(with = "interval_seconds")]
    #[schema(value_type = Option<i64>)]
    #[ts(type = "number | null")]
    pub mean_interval: Option<TimeDelta>,
    pub interval_class: IntervalClass,
}

impl IndexMeta {
    /// Describe an index given in chronological order.
    pub fn from_timestamps(index: &[NaiveDateTime]) -> Self {
        let mean_interval = match (index.first(), index.last()) {
            // consecutive differences telescope, so their mean is the span over the gap count
            (Some(first), Some(last)) if index.len() > 1 => {
                let span = (*last - *first).num_seconds() as f64;
                let mean = span / (index.len() - 1) as f64;
                Some(TimeDelta::minutes((mean / 60.0).round() as i64))
            }
            _ => None,
        };
        Self {
            is_datetime: true,
            mean_interval,
            interval_class: mean_interval
                .map(IntervalClass::from_interval)
                .unwrap_or(IntervalClass::Other),
        }
    }

    pub fn is_hourly(&self) -> bool {
        self.interval_class == IntervalClass::Hourly
    }

    /// Samples are denser than one per hour
    pub fn is_finer_than_hourly(&self) -> bool {
        self.mean_interval
            .is_some_and(|interval| interval < TimeDelta::hours(1))
    }
}

mod interval_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(interval: &Option<TimeDelta>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match interval {
            Some(delta) => serializer.serialize_some(&delta.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<TimeDelta>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = Option::<i64>::deserialize(deserializer)?;
        Ok(seconds.map(TimeDelta::seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(step_minutes: i64, n: i64) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + TimeDelta::minutes(step_minutes * i))
            .collect()
    }

    #[test]
    fn test_interval_classes() {
        assert_eq!(
            IndexMeta::from_timestamps(&series(15, 96)).interval_class,
            IntervalClass::Min15
        );
        let hourly = IndexMeta::from_timestamps(&series(60, 48));
        assert!(hourly.is_hourly());
        assert!(!hourly.is_finer_than_hourly());
        let daily = IndexMeta::from_timestamps(&series(1440, 10));
        assert_eq!(daily.interval_class, IntervalClass::Other);
        assert_eq!(daily.mean_interval, Some(TimeDelta::days(1)));
    }

    #[test]
    fn test_single_row_has_no_interval() {
        let meta = IndexMeta::from_timestamps(&series(15, 1));
        assert_eq!(meta.mean_interval, None);
        assert_eq!(meta.interval_class, IntervalClass::Other);
    }

    #[test]
    fn test_json_shape() {
        let meta = IndexMeta::from_timestamps(&series(15, 4));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["mean_interval"], 900);
        assert_eq!(json["interval_class"], "15min");
        let back: IndexMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
