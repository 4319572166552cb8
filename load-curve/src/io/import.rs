//! Reading the prefab workbook.
//!
//! The data sheet carries a marker cell (`↓ Index ↓`). Its row holds the
//! column headers, the row above the units, and its column the timestamps.
//! Data starts in the row below the marker.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, DataType, Range, Reader, Xlsx, open_workbook};
use tracing::{debug, info, warn};

use super::raw::{RawIndex, RawTable};
use crate::general::config::PipelineConfig;
use crate::pipeline::columns::find_unit;

/// Header that turns the column next to the index into a time-of-day column
const TIME_HEADERS: &[&str] = &["uhrzeit", "zeit"];

pub fn read_workbook(path: &Path, config: &PipelineConfig) -> Result<RawTable> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
    let range = workbook
        .worksheet_range(&config.sheet_name)
        .with_context(|| format!("Failed to read worksheet '{}'", config.sheet_name))?;
    let raw = parse_range(&range, &config.index_marker)?;
    info!(
        "{}: {} rows, {} columns imported",
        path.display(),
        raw.rows.len(),
        raw.headers.len()
    );
    Ok(raw)
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => other.as_string(),
    }
}

fn cell_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => parse_number(s),
        _ => None,
    }
}

/// Number from a cell text in German or English notation.
///
/// With a decimal comma, dots are thousands separators (`1.234,5`).
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.contains(',') {
        text.replace('.', "").replace(',', ".").parse().ok()
    } else {
        text.parse().ok()
    }
}

fn is_unreadable(cell: &Data) -> bool {
    matches!(cell, Data::String(s) if !s.trim().is_empty() && parse_number(s).is_none())
}

fn find_marker(range: &Range<Data>, marker: &str) -> Option<(usize, usize)> {
    range.rows().enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|cell| matches!(cell, Data::String(s) if s.trim() == marker))
            .map(|c| (r, c))
    })
}

/// Turn the used range of the data sheet into a [`RawTable`].
pub fn parse_range(range: &Range<Data>, marker: &str) -> Result<RawTable> {
    let (header_row, index_col) =
        find_marker(range, marker).ok_or_else(|| anyhow!("Marker cell '{}' not found", marker))?;
    let rows: Vec<&[Data]> = range.rows().collect();
    let header_cells = rows[header_row];

    let time_col = header_cells
        .get(index_col + 1)
        .and_then(cell_text)
        .filter(|h| TIME_HEADERS.contains(&h.to_lowercase().as_str()))
        .map(|_| index_col + 1);
    let first_value_col = time_col.map_or(index_col + 1, |c| c + 1);

    let value_cols: Vec<(usize, String)> = (first_value_col..header_cells.len())
        .filter_map(|c| cell_text(&header_cells[c]).map(|h| (c, h)))
        .collect();
    let headers = value_cols.iter().map(|(_, h)| h.clone()).collect();
    // the unit row sits right above the headers; otherwise any known unit above counts
    let units = value_cols
        .iter()
        .map(|(c, _)| {
            let above: Vec<String> = rows[..header_row]
                .iter()
                .rev()
                .filter_map(|row| row.get(*c).and_then(cell_text))
                .collect();
            header_row
                .checked_sub(1)
                .and_then(|r| rows[r].get(*c))
                .and_then(cell_text)
                .or_else(|| find_unit(&above))
        })
        .collect();

    let mut stamps = Vec::new();
    let mut texts = Vec::new();
    let mut times = Vec::new();
    let mut values = Vec::new();
    let mut unreadable = 0usize;
    for row in &rows[header_row + 1..] {
        let index_cell = row.get(index_col).unwrap_or(&Data::Empty);
        let row_values: Vec<Option<f64>> = value_cols
            .iter()
            .map(|(c, _)| row.get(*c).and_then(cell_value))
            .collect();
        if matches!(index_cell, Data::Empty) && row_values.iter().all(Option::is_none) {
            continue;
        }
        unreadable += value_cols
            .iter()
            .filter(|(c, _)| row.get(*c).is_some_and(is_unreadable))
            .count();
        match index_cell {
            Data::String(s) => texts.push(s.trim().to_string()),
            cell => match cell.as_datetime() {
                Some(ts) => {
                    stamps.push(ts);
                    texts.push(ts.format("%Y-%m-%d %H:%M:%S").to_string());
                }
                None => texts.push(cell_text(cell).unwrap_or_default()),
            },
        }
        if let Some(c) = time_col {
            let cell = row.get(c).unwrap_or(&Data::Empty);
            times.push(match cell.as_time() {
                Some(t) if !matches!(cell, Data::String(_)) => t.format("%H:%M:%S").to_string(),
                _ => cell_text(cell).unwrap_or_default(),
            });
        }
        values.push(row_values);
    }

    let index = if time_col.is_some() {
        let dates = texts
            .iter()
            .map(|t| t.split(' ').next().unwrap_or_default().to_string())
            .collect();
        RawIndex::DateTime { dates, times }
    } else if stamps.len() == texts.len() {
        RawIndex::Timestamps(stamps)
    } else {
        RawIndex::Text(texts)
    };
    debug!(header_row, index_col, columns = value_cols.len(), "marker found");
    if unreadable > 0 {
        warn!("{} cell(s) could not be read as numbers and are left empty", unreadable);
    }

    let mut raw = RawTable {
        index,
        headers,
        units,
        rows: values,
    };
    raw.drop_empty();
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::*;

    fn sheet(cells: &[(u32, u32, Data)]) -> Range<Data> {
        let mut range = Range::new((0, 0), (6, 4));
        for (r, c, v) in cells {
            range.set_value((*r, *c), v.clone());
        }
        range
    }

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    #[test]
    fn test_prefab_layout() {
        let range = sheet(&[
            (0, 0, s("Titel")),
            (1, 2, s("kWh")),
            (1, 3, s("°C")),
            (2, 1, s("↓ Index ↓")),
            (2, 2, s("1-1:1.29.0")),
            (2, 3, s("Temperatur")),
            (3, 1, s("01.01.2023 00:00")),
            (3, 2, Data::Float(1.5)),
            (3, 3, Data::Int(4)),
            (4, 1, s("01.01.2023 00:15")),
            (4, 2, s("2,5")),
        ]);
        let raw = parse_range(&range, "↓ Index ↓").unwrap();
        assert_eq!(raw.headers, vec!["1-1:1.29.0", "Temperatur"]);
        assert_eq!(raw.units, vec![Some("kWh".to_string()), Some("°C".to_string())]);
        assert_eq!(raw.rows, vec![vec![Some(1.5), Some(4.0)], vec![Some(2.5), None]]);

        let table = raw.into_table(&PipelineConfig::default()).unwrap();
        assert_eq!(table.index()[1], ts(2023, 1, 1, 0, 15));
    }

    #[test]
    fn test_separate_time_column() {
        let range = sheet(&[
            (0, 0, s("↓ Index ↓")),
            (0, 1, s("Uhrzeit")),
            (0, 2, s("Bezug")),
            (1, 0, s("2023-01-01")),
            (1, 1, s("00:15")),
            (1, 2, Data::Float(1.0)),
        ]);
        let raw = parse_range(&range, "↓ Index ↓").unwrap();
        assert_eq!(raw.headers, vec!["Bezug"]);
        assert_eq!(
            raw.index,
            RawIndex::DateTime {
                dates: vec!["2023-01-01".to_string()],
                times: vec!["00:15".to_string()],
            }
        );
    }

    #[test]
    fn test_unit_found_further_up() {
        let range = sheet(&[
            (0, 1, s("MWh")),
            (1, 1, s("Zählerstand")),
            (3, 0, s("↓ Index ↓")),
            (3, 1, s("Bezug")),
            (4, 0, s("2023-01-01 00:00")),
            (4, 1, Data::Float(3.0)),
        ]);
        let raw = parse_range(&range, "↓ Index ↓").unwrap();
        assert_eq!(raw.units, vec![Some("MWh".to_string())]);
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(parse_number("1.234,5"), Some(1234.5));
        assert_eq!(parse_number(" 2,5 "), Some(2.5));
        assert_eq!(parse_number("1234.5"), Some(1234.5));
        assert_eq!(parse_number("n/a"), None);

        let range = sheet(&[
            (0, 0, s("↓ Index ↓")),
            (0, 1, s("Bezug")),
            (0, 2, s("Temperatur")),
            (1, 0, s("2023-01-01 00:00")),
            (1, 1, s("1.234,5")),
            (2, 0, s("2023-01-01 00:15")),
            (2, 1, s("-")),
            (2, 2, Data::Float(3.0)),
        ]);
        let raw = parse_range(&range, "↓ Index ↓").unwrap();
        assert_eq!(raw.rows, vec![vec![Some(1234.5), None], vec![None, Some(3.0)]]);
        assert!(is_unreadable(&s("-")));
        assert!(!is_unreadable(&s(" ")));
    }

    #[test]
    fn test_missing_marker() {
        let range = sheet(&[(0, 0, s("Bezug"))]);
        assert!(parse_range(&range, "↓ Index ↓").is_err());
    }
}
