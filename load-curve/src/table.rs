//! In-memory time series tables.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime};
use indexmap::IndexMap;

use crate::general::error::{PipelineError, Result};

/// Values of one column; `None` marks a missing reading
pub type Column = Vec<Option<f64>>;

/// Named numeric columns over a chronological index.
///
/// `orgidx` runs parallel to the index and holds the timestamp each row was
/// sourced from. It equals the index until a view remaps rows onto another
/// year.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeriesTable {
    index: Vec<NaiveDateTime>,
    orgidx: Vec<NaiveDateTime>,
    columns: IndexMap<String, Column>,
}

impl TimeSeriesTable {
    pub fn new(index: Vec<NaiveDateTime>, columns: IndexMap<String, Column>) -> Result<Self> {
        let orgidx = index.clone();
        Self::with_orgidx(index, orgidx, columns)
    }

    pub fn with_orgidx(
        index: Vec<NaiveDateTime>,
        orgidx: Vec<NaiveDateTime>,
        columns: IndexMap<String, Column>,
    ) -> Result<Self> {
        if orgidx.len() != index.len() {
            return Err(PipelineError::LengthMismatch {
                column: "orgidx".to_string(),
                expected: index.len(),
                actual: orgidx.len(),
            });
        }
        for (name, values) in &columns {
            if values.len() != index.len() {
                return Err(PipelineError::LengthMismatch {
                    column: name.clone(),
                    expected: index.len(),
                    actual: values.len(),
                });
            }
        }
        Ok(Self {
            index,
            orgidx,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn orgidx(&self) -> &[NaiveDateTime] {
        &self.orgidx
    }

    pub fn columns(&self) -> &IndexMap<String, Column> {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Add or replace a column. Replacing keeps the column's position.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Column) -> Result<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PipelineError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        self.columns.shift_remove(name)
    }

    /// Rename a column in place. Fails if `to` already names another column.
    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.columns.contains_key(to) {
            return Err(PipelineError::Import(format!(
                "Cannot rename '{}' to '{}': column exists",
                from, to
            )));
        }
        let position = self
            .columns
            .get_index_of(from)
            .ok_or_else(|| PipelineError::UnknownColumn(from.to_string()))?;
        if let Some(values) = self.columns.shift_remove(from) {
            self.columns.shift_insert(position, to.to_string(), values);
        }
        Ok(())
    }

    /// Table made of the rows at `positions`, in the given order
    pub fn take_rows(&self, positions: &[usize]) -> Self {
        let pick_ts = |src: &[NaiveDateTime]| positions.iter().map(|&p| src[p]).collect();
        Self {
            index: pick_ts(&self.index),
            orgidx: pick_ts(&self.orgidx),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), positions.iter().map(|&p| values[p]).collect()))
                .collect(),
        }
    }

    /// Rows whose index satisfies `keep`
    pub fn filter_rows(&self, keep: impl Fn(&NaiveDateTime) -> bool) -> Self {
        let positions: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, ts)| keep(ts))
            .map(|(p, _)| p)
            .collect();
        self.take_rows(&positions)
    }

    /// Replace the index, keeping `orgidx` and the values.
    pub fn reindexed(mut self, index: Vec<NaiveDateTime>) -> Result<Self> {
        if index.len() != self.index.len() {
            return Err(PipelineError::LengthMismatch {
                column: "index".to_string(),
                expected: self.index.len(),
                actual: index.len(),
            });
        }
        self.index = index;
        Ok(self)
    }

    /// Rows per calendar year, ascending by year
    pub fn rows_per_year(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for ts in &self.index {
            *counts.entry(ts.year()).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.index.windows(2).all(|w| w[0] < w[1])
    }

    /// Position of `ts` in a strictly increasing index
    pub fn position_of(&self, ts: &NaiveDateTime) -> Option<usize> {
        self.index.binary_search(ts).ok()
    }
}

/// A duration curve: every column sorted on its own, so rows are ranks, not
/// points in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DurationCurve {
    /// Ranks 1..=N
    pub positions: Vec<usize>,
    pub columns: IndexMap<String, Column>,
    /// Source timestamp per rank, keyed `<column>_orgidx`
    pub orgidx: IndexMap<String, Vec<NaiveDateTime>>,
}

impl DurationCurve {
    pub fn orgidx_key(column: &str) -> String {
        format!("{}_orgidx", column)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn orgidx_of(&self, column: &str) -> Option<&[NaiveDateTime]> {
        self.orgidx.get(&Self::orgidx_key(column)).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    fn sample() -> TimeSeriesTable {
        let index = range(ts(2023, 1, 1, 0, 0), 60, 3);
        let mut columns = IndexMap::new();
        columns.insert("a".to_string(), some(&[1.0, 2.0, 3.0]));
        columns.insert("b".to_string(), vec![None, Some(5.0), None]);
        TimeSeriesTable::new(index, columns).unwrap()
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut columns = IndexMap::new();
        columns.insert("a".to_string(), some(&[1.0]));
        let err = TimeSeriesTable::new(range(ts(2023, 1, 1, 0, 0), 60, 2), columns).unwrap_err();
        assert_eq!(
            err,
            PipelineError::LengthMismatch {
                column: "a".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut table = sample();
        table.rename_column("a", "Bezug").unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["Bezug", "b"]);
        assert!(table.rename_column("Bezug", "b").is_err());
        assert!(matches!(
            table.rename_column("x", "y"),
            Err(PipelineError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_take_and_filter_rows() {
        let table = sample();
        let picked = table.take_rows(&[2, 0]);
        assert_eq!(picked.column("a").unwrap(), &[Some(3.0), Some(1.0)]);
        assert_eq!(picked.orgidx()[0], ts(2023, 1, 1, 2, 0));

        let late = table.filter_rows(|t| *t >= ts(2023, 1, 1, 1, 0));
        assert_eq!(late.len(), 2);
        assert_eq!(late.column("b").unwrap(), &[Some(5.0), None]);
    }

    #[test]
    fn test_rows_per_year() {
        let index = vec![ts(2022, 12, 31, 23, 0), ts(2023, 1, 1, 0, 0), ts(2023, 1, 1, 1, 0)];
        let table = TimeSeriesTable::new(index, IndexMap::new()).unwrap();
        let counts = table.rows_per_year();
        assert_eq!(counts.get(&2022), Some(&1));
        assert_eq!(counts.get(&2023), Some(&2));
        assert!(table.is_strictly_increasing());
    }
}
