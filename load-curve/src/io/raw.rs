//! The table handed over by a spreadsheet import, before any cleaning.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use tracing::debug;

use crate::general::config::PipelineConfig;
use crate::general::error::{PipelineError, Result};
use crate::pipeline::time_index::{build_index, parse_index, resolve_meridiem, round_to_seconds};
use crate::table::{Column, TimeSeriesTable};

/// How the rows of an import are stamped
#[derive(Debug, Clone, PartialEq)]
pub enum RawIndex {
    Timestamps(Vec<NaiveDateTime>),
    /// Day-first timestamp strings
    Text(Vec<String>),
    /// Separate date and time-of-day columns
    DateTime { dates: Vec<String>, times: Vec<String> },
}

impl RawIndex {
    pub fn len(&self) -> usize {
        match self {
            RawIndex::Timestamps(v) => v.len(),
            RawIndex::Text(v) => v.len(),
            RawIndex::DateTime { dates, .. } => dates.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain_positions(&mut self, keep: &[bool]) {
        match self {
            RawIndex::Timestamps(v) => retain_mask(v, keep),
            RawIndex::Text(v) => retain_mask(v, keep),
            RawIndex::DateTime { dates, times } => {
                retain_mask(dates, keep);
                retain_mask(times, keep);
            }
        }
    }
}

/// Keep the elements whose position is flagged; positions past the mask go.
fn retain_mask<T>(v: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    v.retain(|_| {
        let k = keep.get(i).copied().unwrap_or(false);
        i += 1;
        k
    });
}

/// Row-major numeric import with one header and an optional unit per column
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub index: RawIndex,
    pub headers: Vec<String>,
    pub units: Vec<Option<String>>,
    pub rows: Vec<Vec<Option<f64>>>,
}

impl RawTable {
    /// Remove rows and columns without a single value.
    pub fn drop_empty(&mut self) {
        let keep_rows: Vec<bool> = self
            .rows
            .iter()
            .map(|row| row.iter().any(Option::is_some))
            .collect();
        self.index.retain_positions(&keep_rows);
        retain_mask(&mut self.rows, &keep_rows);

        let keep_cols: Vec<bool> = (0..self.headers.len())
            .map(|c| self.rows.iter().any(|row| row.get(c).is_some_and(Option::is_some)))
            .collect();
        let dropped = keep_cols.iter().filter(|k| !**k).count();
        if dropped > 0 {
            debug!(dropped, "empty columns removed");
        }
        retain_mask(&mut self.headers, &keep_cols);
        self.units.resize(keep_cols.len(), None);
        retain_mask(&mut self.units, &keep_cols);
        for row in &mut self.rows {
            row.resize(keep_cols.len(), None);
            retain_mask(row, &keep_cols);
        }
    }

    /// Headers made unique by numbering repeats
    pub fn unique_headers(&self) -> Vec<String> {
        let mut seen: IndexMap<String, usize> = IndexMap::new();
        self.headers
            .iter()
            .map(|h| {
                let count = seen.entry(h.clone()).or_insert(0);
                *count += 1;
                if *count == 1 {
                    h.clone()
                } else {
                    format!("{} {}", h, count)
                }
            })
            .collect()
    }

    /// Parse the index and transpose the rows into columns.
    ///
    /// Fails on the first unparsable timestamp.
    pub fn into_table(self, config: &PipelineConfig) -> Result<TimeSeriesTable> {
        if self.rows.is_empty() {
            return Err(PipelineError::EmptyTable);
        }
        if self.index.len() != self.rows.len() {
            return Err(PipelineError::LengthMismatch {
                column: "index".to_string(),
                expected: self.rows.len(),
                actual: self.index.len(),
            });
        }
        let headers = self.unique_headers();
        let mut index = match self.index {
            RawIndex::Timestamps(v) => v.into_iter().map(round_to_seconds).collect(),
            RawIndex::Text(texts) => parse_index(&texts, config.reference_year)?,
            RawIndex::DateTime { dates, times } => build_index(&dates, &times)?,
        };
        if config.twelve_hour_clock {
            index = resolve_meridiem(&index);
        }

        let columns: IndexMap<String, Column> = headers
            .into_iter()
            .enumerate()
            .map(|(c, header)| {
                let values = self.rows.iter().map(|row| row.get(c).copied().flatten()).collect();
                (header, values)
            })
            .collect();
        TimeSeriesTable::new(index, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::*;

    fn raw() -> RawTable {
        RawTable {
            index: RawIndex::Text(vec![
                "01.01.2023 00:00".to_string(),
                "01.01.2023 00:15".to_string(),
                "01.01.2023 00:30".to_string(),
            ]),
            headers: vec!["a".to_string(), "leer".to_string(), "a".to_string()],
            units: vec![Some("kWh".to_string()), None, None],
            rows: vec![
                vec![Some(1.0), None, Some(4.0)],
                vec![None, None, None],
                vec![Some(3.0), None, Some(6.0)],
            ],
        }
    }

    #[test]
    fn test_drop_empty_rows_and_columns() {
        let mut table = raw();
        table.drop_empty();
        assert_eq!(table.index.len(), 2);
        assert_eq!(table.headers, vec!["a", "a"]);
        assert_eq!(table.units, vec![Some("kWh".to_string()), None]);
        assert_eq!(table.rows[1], vec![Some(3.0), Some(6.0)]);
    }

    #[test]
    fn test_into_table() {
        let mut raw = raw();
        raw.drop_empty();
        let table = raw.into_table(&PipelineConfig::default()).unwrap();
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["a", "a 2"]);
        assert_eq!(table.index()[1], ts(2023, 1, 1, 0, 30));
        assert_eq!(table.column("a 2").unwrap(), &[Some(4.0), Some(6.0)]);
    }

    #[test]
    fn test_bad_timestamp_aborts() {
        let mut raw = raw();
        raw.index = RawIndex::Text(vec![
            "01.01.2023 00:00".to_string(),
            "kaputt".to_string(),
            "01.01.2023 00:30".to_string(),
        ]);
        assert_eq!(
            raw.into_table(&PipelineConfig::default()).unwrap_err(),
            PipelineError::MalformedTimestamp {
                row: 1,
                value: "kaputt".to_string()
            }
        );
    }

    #[test]
    fn test_date_and_time_columns() {
        let raw = RawTable {
            index: RawIndex::DateTime {
                dates: vec!["2023-01-01".to_string(), "2023-01-01".to_string()],
                times: vec!["11:00".to_string(), "01:00".to_string()],
            },
            headers: vec!["v".to_string()],
            units: vec![None],
            rows: vec![vec![Some(1.0)], vec![Some(2.0)]],
        };
        let config = PipelineConfig {
            twelve_hour_clock: true,
            ..PipelineConfig::default()
        };
        let table = raw.into_table(&config).unwrap();
        assert_eq!(table.index(), &[ts(2023, 1, 1, 11, 0), ts(2023, 1, 1, 13, 0)]);
    }
}
