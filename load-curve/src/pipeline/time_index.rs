//! Building a clean chronological index from raw date/time input.

use chrono::{
    Datelike, DurationRound, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday,
};
use tracing::{debug, info};

use crate::general::error::{PipelineError, Result};
use crate::table::TimeSeriesTable;

// `%Y` also accepts two digits, so the `%y` variants must be tried first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%y", "%d.%m.%Y", "%d/%m/%y", "%d/%m/%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%y %H:%M:%S",
    "%d.%m.%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%y %H:%M",
    "%d/%m/%Y %H:%M",
];

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
}

pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(text, f).ok())
}

/// Parse a day-first timestamp.
///
/// Year-less values like `24.12. 18:15` are placed in `reference_year`, a bare
/// date means midnight.
pub fn parse_timestamp(text: &str, reference_year: i32) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Some(ts) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
    {
        return Some(ts);
    }
    if let Some(date) = parse_date(text) {
        return date.and_hms_opt(0, 0, 0);
    }
    // dd.mm. HH:MM
    let (day_month, time) = text.split_once(". ")?;
    let date = parse_date(&format!("{}.{}", day_month, reference_year))?;
    Some(date.and_time(parse_time(time)?))
}

pub fn round_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    ts.duration_round(TimeDelta::seconds(1)).unwrap_or(ts)
}

/// Index from separate date and time columns
pub fn build_index<S: AsRef<str>>(dates: &[S], times: &[S]) -> Result<Vec<NaiveDateTime>> {
    if dates.len() != times.len() {
        return Err(PipelineError::LengthMismatch {
            column: "time".to_string(),
            expected: dates.len(),
            actual: times.len(),
        });
    }
    dates
        .iter()
        .zip(times)
        .enumerate()
        .map(|(row, (date, time))| {
            let (date, time) = (date.as_ref(), time.as_ref());
            match (parse_date(date), parse_time(time)) {
                (Some(d), Some(t)) => Ok(round_to_seconds(d.and_time(t))),
                _ => Err(PipelineError::MalformedTimestamp {
                    row,
                    value: format!("{} {}", date, time),
                }),
            }
        })
        .collect()
}

/// Index from one column of timestamp strings
pub fn parse_index<S: AsRef<str>>(texts: &[S], reference_year: i32) -> Result<Vec<NaiveDateTime>> {
    texts
        .iter()
        .enumerate()
        .map(|(row, text)| {
            parse_timestamp(text.as_ref(), reference_year)
                .map(round_to_seconds)
                .ok_or_else(|| PipelineError::MalformedTimestamp {
                    row,
                    value: text.as_ref().to_string(),
                })
        })
        .collect()
}

/// Repair 12-hour times recorded without AM/PM.
///
/// An hour that drops while the date stays the same marks noon; from there on
/// 12 h are added until the date changes.
pub fn resolve_meridiem(index: &[NaiveDateTime]) -> Vec<NaiveDateTime> {
    let mut offset = TimeDelta::zero();
    let mut shifted = 0usize;
    let resolved: Vec<NaiveDateTime> = index
        .iter()
        .enumerate()
        .map(|(i, ts)| {
            if i > 0 {
                let prev = index[i - 1];
                if ts.date() != prev.date() {
                    offset = TimeDelta::zero();
                } else if ts.hour() < prev.hour() {
                    offset = TimeDelta::hours(12);
                }
            }
            if !offset.is_zero() {
                shifted += 1;
            }
            *ts + offset
        })
        .collect();
    if shifted > 0 {
        info!("12-hour clock: {} timestamps moved to the afternoon", shifted);
    }
    resolved
}

fn is_last_week_sunday(ts: &NaiveDateTime, month: u32) -> bool {
    ts.month() == month && ts.day() > 31 - 7 && ts.weekday() == Weekday::Sun
}

/// Remove the repeated hour of the autumn clock change (last Sunday in
/// October, 02:00 to 02:59 twice).
///
/// Only years where the flagged rows actually run backwards are touched. The
/// second half of the flagged block is removed and returned as its own table.
pub fn strip_dst_duplicate(table: &TimeSeriesTable) -> (TimeSeriesTable, TimeSeriesTable) {
    let index = table.index();
    let mut remove = vec![false; index.len()];

    for year in table.rows_per_year().into_keys() {
        if index
            .iter()
            .any(|ts| ts.year() == year && is_last_week_sunday(ts, 3) && ts.hour() == 3)
        {
            debug!("spring clock change found in {}", year);
        }

        let flagged: Vec<usize> = index
            .iter()
            .enumerate()
            .filter(|(_, ts)| ts.year() == year && is_last_week_sunday(ts, 10) && ts.hour() == 2)
            .map(|(p, _)| p)
            .collect();
        let runs_backwards = flagged.windows(2).any(|w| index[w[1]] < index[w[0]]);
        if !runs_backwards {
            continue;
        }

        // flagged positions p with first + n/2 <= p < first + n, kept in halves to stay integral
        let first = flagged[0];
        let n = flagged.len();
        for &p in &flagged {
            if 2 * p >= 2 * first + n && p < first + n {
                remove[p] = true;
            }
        }
        info!("autumn clock change found in {}", year);
    }

    let (kept, removed): (Vec<usize>, Vec<usize>) = (0..index.len()).partition(|&p| !remove[p]);
    if !removed.is_empty() {
        info!("{} rows of the repeated autumn hour removed", removed.len());
    }
    (table.take_rows(&kept), table.take_rows(&removed))
}

/// Drop rows whose timestamp already occurred; the first occurrence wins.
pub fn drop_duplicates(table: &TimeSeriesTable) -> (TimeSeriesTable, TimeSeriesTable) {
    let mut seen = std::collections::HashSet::new();
    let (kept, dropped): (Vec<usize>, Vec<usize>) =
        (0..table.len()).partition(|&p| seen.insert(table.index()[p]));
    if !dropped.is_empty() {
        info!("{} rows with duplicate timestamps removed", dropped.len());
    }
    (table.take_rows(&kept), table.take_rows(&dropped))
}

/// Stable sort of the rows by timestamp
pub fn sort_by_index(table: &TimeSeriesTable) -> TimeSeriesTable {
    let mut order: Vec<usize> = (0..table.len()).collect();
    order.sort_by_key(|&p| table.index()[p]);
    table.take_rows(&order)
}

/// A normalized table together with the rows taken out of it
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub table: TimeSeriesTable,
    /// Rows of the repeated autumn hour
    pub dst_removed: TimeSeriesTable,
    /// Later rows of duplicated timestamps
    pub duplicates: TimeSeriesTable,
}

/// Clock-change cleanup, duplicate removal and sorting.
///
/// The resulting index is strictly increasing.
pub fn normalize(table: &TimeSeriesTable) -> Result<Normalized> {
    if table.is_empty() {
        return Err(PipelineError::EmptyTable);
    }
    let (table, dst_removed) = strip_dst_duplicate(table);
    let (table, duplicates) = drop_duplicates(&table);
    Ok(Normalized {
        table: sort_by_index(&table),
        dst_removed,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::*;
    use indexmap::IndexMap;

    fn table_of(index: Vec<NaiveDateTime>) -> TimeSeriesTable {
        let values = (0..index.len()).map(|i| Some(i as f64)).collect();
        let mut columns = IndexMap::new();
        columns.insert("v".to_string(), values);
        TimeSeriesTable::new(index, columns).unwrap()
    }

    #[test]
    fn test_build_index() {
        let index = build_index(&["2023-01-01", "01.01.2023"], &["00:15", "12:30:00"]).unwrap();
        assert_eq!(index, vec![ts(2023, 1, 1, 0, 15), ts(2023, 1, 1, 12, 30)]);
    }

    #[test]
    fn test_malformed_timestamp_names_row() {
        let err = build_index(&["2023-01-01", "2023-02-31"], &["00:00", "00:00"]).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MalformedTimestamp {
                row: 1,
                value: "2023-02-31 00:00".to_string()
            }
        );
    }

    #[test]
    fn test_parse_index_formats() {
        let index = parse_index(&["24.12.2022 18:15", "2022-12-24 18:30:00", "24.12. 18:45"], 2020)
            .unwrap();
        assert_eq!(
            index,
            vec![ts(2022, 12, 24, 18, 15), ts(2022, 12, 24, 18, 30), ts(2020, 12, 24, 18, 45)]
        );
        assert!(parse_index(&["gestern"], 2020).is_err());
    }

    #[test]
    fn test_two_digit_years_are_in_this_century() {
        assert_eq!(parse_date("01.03.23"), NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(parse_date("01.03.2023"), NaiveDate::from_ymd_opt(2023, 3, 1));
        assert_eq!(
            build_index(&["24.10.23"], &["02:00"]).unwrap(),
            vec![ts(2023, 10, 24, 2, 0)]
        );
        assert_eq!(
            parse_index(&["24.10.23 02:00", "24.10.2023 02:15", "24/10/23 02:30"], 2020).unwrap(),
            vec![ts(2023, 10, 24, 2, 0), ts(2023, 10, 24, 2, 15), ts(2023, 10, 24, 2, 30)]
        );
    }

    #[test]
    fn test_resolve_meridiem() {
        let raw = vec![
            ts(2023, 1, 1, 11, 0),
            ts(2023, 1, 1, 12, 0),
            ts(2023, 1, 1, 1, 0),
            ts(2023, 1, 1, 11, 0),
            ts(2023, 1, 2, 0, 0),
            ts(2023, 1, 2, 1, 0),
        ];
        assert_eq!(
            resolve_meridiem(&raw),
            vec![
                ts(2023, 1, 1, 11, 0),
                ts(2023, 1, 1, 12, 0),
                ts(2023, 1, 1, 13, 0),
                ts(2023, 1, 1, 23, 0),
                ts(2023, 1, 2, 0, 0),
                ts(2023, 1, 2, 1, 0),
            ]
        );
    }

    #[test]
    fn test_autumn_hour_is_removed_once() {
        // 29 Oct 2023 is the last Sunday in October
        let mut index = range(ts(2023, 10, 29, 0, 0), 15, 12); // 00:00 .. 02:45
        index.extend(range(ts(2023, 10, 29, 2, 0), 15, 8)); // 02:00 .. 02:45 again, then 03:00 .. 03:45
        let table = table_of(index);

        let (clean, removed) = strip_dst_duplicate(&table);
        assert_eq!(removed.len(), 4);
        assert_eq!(clean.len(), 16);
        assert!(clean.is_strictly_increasing());
        // the first occurrence of 02:00 survives
        assert_eq!(clean.column("v").unwrap()[8], Some(8.0));
        assert_eq!(removed.column("v").unwrap()[0], Some(12.0));
    }

    #[test]
    fn test_spring_gap_removes_nothing() {
        // 26 Mar 2023: 02:00 is skipped
        let mut index = range(ts(2023, 3, 26, 0, 0), 60, 2);
        index.extend(range(ts(2023, 3, 26, 3, 0), 60, 4));
        let table = table_of(index);
        let (clean, removed) = strip_dst_duplicate(&table);
        assert!(removed.is_empty());
        assert_eq!(clean, table);
    }

    #[test]
    fn test_october_without_repeat_is_untouched() {
        let table = table_of(range(ts(2023, 10, 29, 0, 0), 60, 6));
        let (clean, removed) = strip_dst_duplicate(&table);
        assert!(removed.is_empty());
        assert_eq!(clean.len(), 6);
    }

    #[test]
    fn test_normalize_dedups_and_sorts() {
        let index = vec![
            ts(2023, 1, 1, 1, 0),
            ts(2023, 1, 1, 0, 0),
            ts(2023, 1, 1, 1, 0),
            ts(2023, 1, 1, 2, 0),
        ];
        let normalized = normalize(&table_of(index)).unwrap();
        assert!(normalized.table.is_strictly_increasing());
        assert_eq!(normalized.table.column("v").unwrap(), &[Some(1.0), Some(0.0), Some(3.0)]);
        assert_eq!(normalized.duplicates.len(), 1);
        assert_eq!(normalized.duplicates.column("v").unwrap(), &[Some(2.0)]);
    }

    #[test]
    fn test_normalize_empty_table() {
        assert_eq!(
            normalize(&TimeSeriesTable::default()).unwrap_err(),
            PipelineError::EmptyTable
        );
    }
}
