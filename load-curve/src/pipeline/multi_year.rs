//! Overlaying years and days on a common reference year.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use tracing::{debug, warn};

use super::ColumnMap;
use crate::table::TimeSeriesTable;

/// Years with more than `min_rows` rows, ascending
pub fn overlay_years(table: &TimeSeriesTable, min_rows: usize) -> Vec<i32> {
    table
        .rows_per_year()
        .into_iter()
        .filter(|(_, rows)| *rows > min_rows)
        .map(|(year, _)| year)
        .collect()
}

/// Slice out every requested year and shift it into `reference_year`.
///
/// `orgidx` keeps the source timestamps. Leap-day rows have no place in a
/// non-leap reference year and are dropped.
pub fn split_by_year(
    table: &TimeSeriesTable,
    years: &[i32],
    reference_year: i32,
) -> BTreeMap<i32, TimeSeriesTable> {
    let mut slices = BTreeMap::new();
    for &year in years {
        let slice = table.filter_rows(|ts| ts.year() == year);
        let (kept, index): (Vec<usize>, Vec<NaiveDateTime>) = slice
            .index()
            .iter()
            .enumerate()
            .filter_map(|(p, ts)| ts.with_year(reference_year).map(|shifted| (p, shifted)))
            .unzip();
        if kept.len() < slice.len() {
            warn!(
                "{}: {} leap-day row(s) dropped, {} has no 29 February",
                year,
                slice.len() - kept.len(),
                reference_year
            );
        }
        // reindexing keeps the order, the shift is the same for every row
        let shifted = slice.take_rows(&kept).reindexed(index);
        match shifted {
            Ok(shifted) => {
                debug!(year, rows = shifted.len(), "year slice");
                slices.insert(year, shifted);
            }
            Err(err) => warn!("{}: {}", year, err),
        }
    }
    slices
}

/// Key of a column in the overlay of `year`
pub fn year_key(column: &str, year: i32) -> String {
    format!("{} {}", column, year)
}

/// Per-year metadata clones `"<key> <year>"` with the year in the title.
///
/// Keys that already carry one of the years are skipped.
pub fn year_metas(metas: &ColumnMap, years: &[i32]) -> ColumnMap {
    let mut out = ColumnMap::new();
    for (key, meta) in metas {
        if years.iter().any(|y| key.contains(&y.to_string())) {
            continue;
        }
        for &year in years {
            out.insert(year_key(key, year), meta.derived(&format!(" {}", year)));
        }
    }
    out
}

/// Key of a day in the multi-day comparison, e.g. `03. Jan 2023`
pub fn day_key(date: NaiveDate) -> String {
    date.format("%d. %b %Y").to_string()
}

/// Cut out single days and move them onto 1 January of `reference_year`.
///
/// Days without data are skipped.
pub fn day_slices(
    table: &TimeSeriesTable,
    dates: &[NaiveDate],
    reference_year: i32,
) -> IndexMap<String, TimeSeriesTable> {
    let mut days = IndexMap::new();
    let Some(target) = NaiveDate::from_ymd_opt(reference_year, 1, 1) else {
        return days;
    };
    for &date in dates {
        let day = table.filter_rows(|ts| ts.date() == date);
        if day.is_empty() {
            warn!("{}: no data", date);
            continue;
        }
        let index = day.index().iter().map(|ts| target.and_time(ts.time())).collect();
        match day.reindexed(index) {
            Ok(day) => {
                days.insert(day_key(date), day);
            }
            Err(err) => warn!("{}: {}", date, err),
        }
    }
    days
}
