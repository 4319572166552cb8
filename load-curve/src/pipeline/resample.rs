//! Hourly, monthly and duration-curve views.

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use indexmap::IndexMap;
use meter_model::IndexMeta;
use tracing::{debug, warn};

use super::ColumnMap;
use crate::general::error::{PipelineError, Result};
use crate::table::{Column, DurationCurve, TimeSeriesTable};

/// Suffix of hourly columns
pub const HOURLY_SUFFIX: &str = " *h";

pub fn hourly_name(column: &str) -> String {
    if column.ends_with(HOURLY_SUFFIX) {
        column.to_string()
    } else {
        format!("{}{}", column, HOURLY_SUFFIX)
    }
}

fn is_mean(metas: &ColumnMap, column: &str) -> bool {
    match metas.get(column) {
        Some(meta) => meta.is_mean(),
        None => {
            warn!(column, "no metadata, summing");
            false
        }
    }
}

/// Sum or mean of the valid values; `None` if there are none
fn aggregate(values: impl Iterator<Item = Option<f64>>, mean: bool) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    match count {
        0 => None,
        _ if mean => Some(sum / count as f64),
        _ => Some(sum),
    }
}

fn floor_hour(ts: &NaiveDateTime) -> NaiveDateTime {
    ts.date()
        .and_hms_opt(ts.hour(), 0, 0)
        .unwrap_or(*ts)
}

/// Resample to hourly buckets.
///
/// A table that already is hourly comes back unchanged. Otherwise every column
/// `c` becomes `c *h`, summed or averaged according to its metadata, and
/// `metas` gains a derived entry for it. Rows must be in chronological order.
pub fn to_hourly(
    table: &TimeSeriesTable,
    metas: &mut ColumnMap,
    index_meta: &IndexMeta,
) -> Result<TimeSeriesTable> {
    if index_meta.is_hourly() {
        return Ok(table.clone());
    }
    let (Some(first), Some(last)) = (table.index().first(), table.index().last()) else {
        return Err(PipelineError::EmptyTable);
    };

    let start = floor_hour(first);
    let hours = ((floor_hour(last) - start).num_hours() + 1) as usize;
    let bucket_of = |ts: &NaiveDateTime| ((*ts - start).num_hours()) as usize;

    // rows per bucket as a range of positions
    let mut bounds = vec![(0usize, 0usize); hours];
    let mut pos = 0;
    for (bucket, bound) in bounds.iter_mut().enumerate() {
        let begin = pos;
        while pos < table.len() && bucket_of(&table.index()[pos]) == bucket {
            pos += 1;
        }
        *bound = (begin, pos);
    }

    let index: Vec<NaiveDateTime> = (0..hours)
        .map(|h| start + TimeDelta::hours(h as i64))
        .collect();

    let mut offset = TimeDelta::zero();
    let orgidx: Vec<NaiveDateTime> = index
        .iter()
        .zip(&bounds)
        .map(|(ts, &(begin, end))| {
            if begin < end {
                offset = table.orgidx()[begin] - table.index()[begin];
                table.orgidx()[begin]
            } else {
                *ts + offset
            }
        })
        .collect();

    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for (name, values) in table.columns() {
        let target = hourly_name(name);
        let mean = is_mean(metas, name);
        let resampled = bounds
            .iter()
            .map(|&(begin, end)| aggregate(values[begin..end].iter().copied(), mean))
            .collect();
        if target != *name {
            if let Some(meta) = metas.get(name) {
                let derived = meta.derived(HOURLY_SUFFIX);
                metas.insert(target.clone(), derived);
            }
        }
        columns.insert(target, resampled);
    }
    debug!(rows = table.len(), hours, "resampled to hourly");
    TimeSeriesTable::with_orgidx(index, orgidx, columns)
}

/// Make sure a table has at most hourly resolution
fn ensure_hourly(
    table: &TimeSeriesTable,
    metas: &mut ColumnMap,
    index_meta: &IndexMeta,
) -> Result<TimeSeriesTable> {
    if index_meta.is_finer_than_hourly() {
        to_hourly(table, metas, index_meta)
    } else {
        Ok(table.clone())
    }
}

/// Monthly aggregates, each month anchored on the 15th at midnight.
///
/// Energy and other summable quantities are summed, mean-unit columns
/// averaged. With `year_for_orgidx` the `orgidx` of every month points into
/// that year, otherwise it equals the index.
pub fn to_monthly(
    table: &TimeSeriesTable,
    metas: &mut ColumnMap,
    index_meta: &IndexMeta,
    year_for_orgidx: Option<i32>,
) -> Result<TimeSeriesTable> {
    let source = ensure_hourly(table, metas, index_meta)?;
    let (Some(first), Some(last)) = (source.index().first(), source.index().last()) else {
        return Err(PipelineError::EmptyTable);
    };

    let month_number = |ts: &NaiveDateTime| ts.year() * 12 + ts.month0() as i32;
    let first_month = month_number(first);
    let months = (month_number(last) - first_month + 1) as usize;

    let mut bounds = vec![(0usize, 0usize); months];
    let mut pos = 0;
    for (m, bound) in bounds.iter_mut().enumerate() {
        let begin = pos;
        while pos < source.len() && (month_number(&source.index()[pos]) - first_month) as usize == m {
            pos += 1;
        }
        *bound = (begin, pos);
    }

    let mut index = Vec::with_capacity(months);
    let mut orgidx = Vec::with_capacity(months);
    for m in 0..months as i32 {
        let n = first_month + m;
        let (year, month) = (n.div_euclid(12), n.rem_euclid(12) as u32 + 1);
        let anchor = mid_month(year, month)?;
        index.push(anchor);
        orgidx.push(match year_for_orgidx {
            Some(y) => mid_month(y, month)?,
            None => anchor,
        });
    }

    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for (name, values) in source.columns() {
        let mean = is_mean(metas, name);
        let aggregated = bounds
            .iter()
            .map(|&(begin, end)| aggregate(values[begin..end].iter().copied(), mean))
            .collect();
        columns.insert(name.clone(), aggregated);
    }
    debug!(months, "monthly aggregates");
    TimeSeriesTable::with_orgidx(index, orgidx, columns)
}

fn mid_month(year: i32, month: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 15)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| PipelineError::MalformedTimestamp {
            row: 0,
            value: format!("{:04}-{:02}-15", year, month),
        })
}

/// Every column sorted descending on its own, missing values last.
///
/// Rank `i` of column `c` keeps the timestamp it came from in
/// `c_orgidx`, so different columns are not aligned in time.
pub fn to_duration_curve(
    table: &TimeSeriesTable,
    metas: &mut ColumnMap,
    index_meta: &IndexMeta,
) -> Result<DurationCurve> {
    let source = ensure_hourly(table, metas, index_meta)?;
    let mut curve = DurationCurve {
        positions: (1..=source.len()).collect(),
        ..DurationCurve::default()
    };

    for (name, values) in source.columns() {
        let mut order: Vec<usize> = (0..values.len()).collect();
        // stable: equal values keep chronological order
        order.sort_by(|&a, &b| match (values[a], values[b]) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        curve
            .columns
            .insert(name.clone(), order.iter().map(|&p| values[p]).collect());
        curve.orgidx.insert(
            DurationCurve::orgidx_key(name),
            order.iter().map(|&p| source.orgidx()[p]).collect(),
        );
    }
    Ok(curve)
}
