//! Tabular summaries and chart annotations.

use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;

use super::ColumnMap;
use crate::table::{Column, TimeSeriesTable};

pub const MONTH_NAMES: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober",
    "November", "Dezember",
];

pub const TOTAL_LABEL: &str = "Summe";

/// Monthly values with a leading total row
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// `Summe`, then one label per month
    pub labels: Vec<String>,
    pub columns: IndexMap<String, Column>,
}

/// Summary of a monthly table.
///
/// The total row sums summable columns and averages mean-unit columns. Month
/// labels carry the year when the table spans more than one.
pub fn monthly_summary(monthly: &TimeSeriesTable, metas: &ColumnMap) -> MonthlySummary {
    let years: std::collections::BTreeSet<i32> =
        monthly.index().iter().map(|ts| ts.year()).collect();
    let mut labels = vec![TOTAL_LABEL.to_string()];
    labels.extend(monthly.index().iter().map(|ts| {
        let name = MONTH_NAMES[ts.month0() as usize];
        if years.len() > 1 {
            format!("{} {}", name, ts.year())
        } else {
            name.to_string()
        }
    }));

    let columns = monthly
        .columns()
        .iter()
        .map(|(name, values)| {
            let valid: Vec<f64> = values.iter().flatten().copied().collect();
            let mean = metas.get(name).is_some_and(|m| m.is_mean());
            let total = match (valid.is_empty(), mean) {
                (true, _) => None,
                (false, true) => Some(valid.iter().sum::<f64>() / valid.len() as f64),
                (false, false) => Some(valid.iter().sum()),
            };
            let mut column = Vec::with_capacity(values.len() + 1);
            column.push(total);
            column.extend(values.iter().copied());
            (name.clone(), column)
        })
        .collect();
    MonthlySummary { labels, columns }
}

/// One annotated point of a column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extreme {
    pub value: f64,
    /// Position in the charted index
    pub index: NaiveDateTime,
    /// Timestamp the value was sourced from
    pub orgidx: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremes {
    pub max: Extreme,
    pub min: Extreme,
}

/// Maximum and minimum of every column with at least one valid value.
///
/// The first occurrence wins on ties.
pub fn extremes(table: &TimeSeriesTable) -> IndexMap<String, Extremes> {
    let mut out = IndexMap::new();
    for (name, values) in table.columns() {
        let mut max: Option<(usize, f64)> = None;
        let mut min: Option<(usize, f64)> = None;
        for (p, value) in values.iter().enumerate() {
            let Some(v) = *value else { continue };
            if max.is_none_or(|(_, m)| v > m) {
                max = Some((p, v));
            }
            if min.is_none_or(|(_, m)| v < m) {
                min = Some((p, v));
            }
        }
        if let (Some((pmax, vmax)), Some((pmin, vmin))) = (max, min) {
            let point = |p: usize, value: f64| Extreme {
                value,
                index: table.index()[p],
                orgidx: table.orgidx()[p],
            };
            out.insert(
                name.clone(),
                Extremes {
                    max: point(pmax, vmax),
                    min: point(pmin, vmin),
                },
            );
        }
    }
    out
}

/// Largest absolute value over all columns, the upper bound for an outlier
/// cut-off.
pub fn absolute_max(table: &TimeSeriesTable) -> Option<f64> {
    table
        .columns()
        .values()
        .flatten()
        .flatten()
        .map(|v| v.abs())
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::*;
    use meter_model::ColumnMeta;

    #[test]
    fn test_monthly_summary() {
        let index = vec![ts(2023, 1, 15, 0, 0), ts(2023, 2, 15, 0, 0)];
        let mut columns = IndexMap::new();
        columns.insert("Bezug".to_string(), some(&[100.0, 50.0]));
        columns.insert("Temperatur".to_string(), some(&[2.0, 4.0]));
        let monthly = TimeSeriesTable::new(index, columns).unwrap();
        let mut metas = ColumnMap::new();
        metas.insert("Bezug".to_string(), ColumnMeta::with_unit("Bezug", " kWh"));
        metas.insert("Temperatur".to_string(), ColumnMeta::with_unit("Temperatur", " °C"));

        let summary = monthly_summary(&monthly, &metas);
        assert_eq!(summary.labels, vec!["Summe", "Januar", "Februar"]);
        assert_eq!(summary.columns["Bezug"], some(&[150.0, 100.0, 50.0]));
        assert_eq!(summary.columns["Temperatur"][0], Some(3.0));
    }

    #[test]
    fn test_extremes_report_source_timestamp() {
        let index = range(ts(2020, 1, 1, 0, 0), 60, 4);
        let orgidx = range(ts(2022, 1, 1, 0, 0), 60, 4);
        let mut columns = IndexMap::new();
        columns.insert("v".to_string(), vec![Some(3.0), None, Some(-1.0), Some(7.0)]);
        columns.insert("empty".to_string(), vec![None; 4]);
        let table = TimeSeriesTable::with_orgidx(index, orgidx, columns).unwrap();

        let found = extremes(&table);
        assert!(!found.contains_key("empty"));
        let v = found["v"];
        assert_eq!(v.max.value, 7.0);
        assert_eq!(v.max.orgidx, ts(2022, 1, 1, 3, 0));
        assert_eq!(v.min.value, -1.0);
        assert_eq!(v.min.index, ts(2020, 1, 1, 2, 0));
        assert_eq!(absolute_max(&table), Some(7.0));
    }
}
