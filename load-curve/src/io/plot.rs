//! PNG line charts of tables and duration curves.
//!
//! Series go to the primary or first secondary y axis as assigned in the
//! column metadata. Columns on further axes are left out of the picture.

use std::ops::Range;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use meter_model::AxisId;
use plotters::prelude::*;
use tracing::{info, warn};

use crate::general::error::{PipelineError, Result};
use crate::pipeline::ColumnMap;
use crate::table::{DurationCurve, TimeSeriesTable};

const SIZE: (u32, u32) = (1400, 700);

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    /// Connected runs of points; missing values split a line
    pub segments: Vec<Vec<(f64, f64)>>,
    pub secondary: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub x_desc: String,
    /// Start of a time axis; x values are hours since then
    pub x_start: Option<NaiveDateTime>,
    pub primary_unit: Option<String>,
    pub secondary_unit: Option<String>,
    pub series: Vec<ChartSeries>,
}

/// Split at missing values, pairing each value with its x position.
pub fn segments(xs: &[f64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, v) in xs.iter().zip(values) {
        match v {
            Some(v) if v.is_finite() => current.push((*x, *v)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Value range of the points with 5% headroom; flat data gets a unit range.
pub fn value_range<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<Range<f64>> {
    let (lo, hi) = points.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| {
        (lo.min(*y), hi.max(*y))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    if hi - lo < f64::EPSILON {
        return Some(lo - 1.0..hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    Some(lo - pad..hi + pad)
}

fn axis_desc(unit: Option<&str>) -> String {
    match unit {
        Some(u) => format!("[{}]", u.trim()),
        None => String::new(),
    }
}

/// Sort columns onto the two drawable axes and note their units.
fn place_series(
    data: &mut ChartData,
    metas: &ColumnMap,
    columns: impl Iterator<Item = (String, Vec<Vec<(f64, f64)>>)>,
) {
    for (name, segs) in columns {
        let meta = metas.get(&name);
        let axis = meta.and_then(|m| m.y_axis).unwrap_or(AxisId::PRIMARY);
        let unit = meta.and_then(|m| m.unit_graph.clone());
        match axis.rank() {
            0 => {
                data.primary_unit = data.primary_unit.take().or(unit);
            }
            1 => {
                data.secondary_unit = data.secondary_unit.take().or(unit);
            }
            _ => {
                warn!(column = %name, axis = %axis, "only two y axes are drawn, column skipped");
                continue;
            }
        }
        data.series.push(ChartSeries {
            name,
            segments: segs,
            secondary: axis.rank() == 1,
        });
    }
}

pub fn table_chart(table: &TimeSeriesTable, metas: &ColumnMap, title: &str) -> ChartData {
    let start = table.index().first().copied();
    let xs: Vec<f64> = match start {
        Some(start) => table
            .index()
            .iter()
            .map(|ts| (*ts - start).num_seconds() as f64 / 3600.0)
            .collect(),
        None => Vec::new(),
    };
    let mut data = ChartData {
        title: title.to_string(),
        x_desc: "Zeit".to_string(),
        x_start: start,
        primary_unit: None,
        secondary_unit: None,
        series: Vec::new(),
    };
    let columns = table
        .columns()
        .iter()
        .map(|(name, values)| (name.clone(), segments(&xs, values)));
    place_series(&mut data, metas, columns);
    data
}

pub fn duration_chart(curve: &DurationCurve, metas: &ColumnMap, title: &str) -> ChartData {
    let xs: Vec<f64> = curve.positions.iter().map(|p| *p as f64).collect();
    let mut data = ChartData {
        title: title.to_string(),
        x_desc: "Stunden".to_string(),
        x_start: None,
        primary_unit: None,
        secondary_unit: None,
        series: Vec::new(),
    };
    let columns = curve
        .columns
        .iter()
        .map(|(name, values)| (name.clone(), segments(&xs, values)));
    place_series(&mut data, metas, columns);
    data
}

fn x_label(start: Option<NaiveDateTime>, x: f64) -> String {
    match start {
        Some(start) => {
            let ts = start + TimeDelta::seconds((x * 3600.0).round() as i64);
            ts.format("%d.%m.%y %H:%M").to_string()
        }
        None => format!("{:.0}", x),
    }
}

/// Draw the chart into a PNG file.
pub fn render(data: &ChartData, path: &Path) -> Result<()> {
    if data.series.is_empty() {
        return Err(PipelineError::Plot(format!("'{}' has nothing to draw", data.title)));
    }
    draw(data, path).map_err(|e| PipelineError::Plot(e.to_string()))?;
    info!("Chart saved as {}", path.display());
    Ok(())
}

fn draw(data: &ChartData, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let points = |secondary: bool| {
        data.series
            .iter()
            .filter(move |s| s.secondary == secondary)
            .flat_map(|s| s.segments.iter().flatten())
    };
    let x_range = points(false)
        .chain(points(true))
        .fold(None, |acc: Option<(f64, f64)>, (x, _)| match acc {
            Some((lo, hi)) => Some((lo.min(*x), hi.max(*x))),
            None => Some((*x, *x)),
        })
        .map(|(lo, hi)| if hi > lo { lo..hi } else { lo..lo + 1.0 })
        .unwrap_or(0.0..1.0);
    let y_range = value_range(points(false)).unwrap_or(0.0..1.0);
    let y2_range = value_range(points(true)).unwrap_or_else(|| y_range.clone());

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&data.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .right_y_label_area_size(80)
        .build_cartesian_2d(x_range.clone(), y_range)?
        .set_secondary_coord(x_range, y2_range);

    let start = data.x_start;
    let x_fmt = |x: &f64| x_label(start, *x);
    chart
        .configure_mesh()
        .x_desc(data.x_desc.as_str())
        .y_desc(axis_desc(data.primary_unit.as_deref()))
        .x_label_formatter(&x_fmt)
        .draw()?;
    if data.secondary_unit.is_some() {
        chart
            .configure_secondary_axes()
            .y_desc(axis_desc(data.secondary_unit.as_deref()))
            .draw()?;
    }

    for (i, series) in data.series.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        for (n, segment) in series.segments.iter().enumerate() {
            let line = LineSeries::new(segment.iter().copied(), style);
            let drawn = if series.secondary {
                chart.draw_secondary_series(line)?
            } else {
                chart.draw_series(line)?
            };
            if n == 0 {
                drawn.label(series.name.as_str()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 15, y)], Palette99::pick(i).stroke_width(2))
                });
            }
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::test_util::*;
    use indexmap::IndexMap;
    use meter_model::ColumnMeta;

    #[test]
    fn test_segments_split_at_gaps() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let values = [Some(1.0), None, Some(3.0), Some(4.0), Some(f64::NAN)];
        assert_eq!(
            segments(&xs, &values),
            vec![vec![(0.0, 1.0)], vec![(2.0, 3.0), (3.0, 4.0)]]
        );
    }

    #[test]
    fn test_value_range() {
        let points = [(0.0, 0.0), (1.0, 10.0)];
        assert_eq!(value_range(points.iter()), Some(-0.5..10.5));
        let flat = [(0.0, 2.0)];
        assert_eq!(value_range(flat.iter()), Some(1.0..3.0));
        assert_eq!(value_range([].iter()), None);
    }

    #[test]
    fn test_table_chart_axes() {
        let table = TimeSeriesTable::new(
            range(ts(2023, 1, 1, 0, 0), 60, 3),
            IndexMap::from([
                ("Bezug".to_string(), some(&[1.0, 2.0, 3.0])),
                ("Temperatur".to_string(), vec![Some(5.0), None, Some(4.0)]),
                ("Druck".to_string(), some(&[1.0, 1.0, 1.0])),
            ]),
        )
        .unwrap();
        let mut metas = ColumnMap::new();
        let mut bezug = ColumnMeta::with_unit("Bezug", " kWh");
        bezug.y_axis = Some(AxisId::PRIMARY);
        let mut temp = ColumnMeta::with_unit("Temperatur", " °C");
        temp.y_axis = Some(AxisId::from_rank(1));
        let mut druck = ColumnMeta::with_unit("Druck", " hPa");
        druck.y_axis = Some(AxisId::from_rank(2));
        metas.insert("Bezug".to_string(), bezug);
        metas.insert("Temperatur".to_string(), temp);
        metas.insert("Druck".to_string(), druck);

        let chart = table_chart(&table, &metas, "Lastgang");
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.primary_unit.as_deref(), Some(" kW"));
        assert_eq!(chart.secondary_unit.as_deref(), Some(" °C"));
        assert!(chart.series[1].secondary);
        assert_eq!(chart.series[1].segments.len(), 2);
        assert_eq!(chart.series[0].segments[0][2], (2.0, 3.0));
    }

    #[test]
    fn test_x_label() {
        assert_eq!(x_label(Some(ts(2023, 1, 1, 0, 0)), 25.0), "02.01.23 01:00");
        assert_eq!(x_label(None, 12.0), "12");
    }

    #[test]
    fn test_render_without_series_fails() {
        let chart = ChartData {
            title: "leer".to_string(),
            x_desc: String::new(),
            x_start: None,
            primary_unit: None,
            secondary_unit: None,
            series: Vec::new(),
        };
        let dir = tempfile::tempdir().unwrap();
        assert!(render(&chart, &dir.path().join("leer.png")).is_err());
    }
}
