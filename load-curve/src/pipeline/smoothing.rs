//! Savitzky–Golay smoothing and outlier cleaning of chart lines.

use tracing::debug;

use super::ColumnMap;
use super::gap_fill::{akima_fill, seconds_axis};
use crate::general::error::{PipelineError, Result};
use crate::table::{Column, TimeSeriesTable};

/// Suffix of smoothed columns
pub const SMOOTH_SUFFIX: &str = " (glatt)";

pub fn smoothed_name(column: &str) -> String {
    format!("{}{}", column, SMOOTH_SUFFIX)
}

fn force_odd(n: usize) -> usize {
    if n % 2 == 0 { n + 1 } else { n }
}

/// Largest and initial window for a chart whose longest line has `len` points
pub fn default_window(len: usize) -> (usize, usize) {
    let max = force_odd(len / 3);
    (max, force_odd(max / 5))
}

/// Filter weights for the centre point of a window: the first row of the
/// least-squares polynomial fit `(AᵀA)⁻¹Aᵀ`.
pub fn savgol_coefficients(window: usize, order: usize) -> Result<Vec<f64>> {
    if window % 2 == 0 || window <= order {
        return Err(PipelineError::Config(format!(
            "smoothing window must be odd and larger than the order, got {} / {}",
            window, order
        )));
    }
    let half = (window / 2) as f64;
    let scale = if half > 0.0 { half } else { 1.0 };
    let terms = order + 1;
    // positions scaled to [-1, 1] keep the normal equations well conditioned
    let powers: Vec<Vec<f64>> = (0..window)
        .map(|i| {
            let u = (i as f64 - half) / scale;
            (0..terms).map(|j| u.powi(j as i32)).collect()
        })
        .collect();

    let mut normal = vec![vec![0.0; terms + 1]; terms];
    for (r, row) in normal.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().take(terms).enumerate() {
            *cell = powers.iter().map(|p| p[r] * p[c]).sum();
        }
        row[terms] = if r == 0 { 1.0 } else { 0.0 };
    }
    let z = solve(normal)?;
    Ok(powers
        .iter()
        .map(|p| p.iter().zip(&z).map(|(a, b)| a * b).sum())
        .collect())
}

/// Gauss-Jordan elimination with partial pivoting on an augmented matrix
fn solve(mut m: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let n = m.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(PipelineError::Config("smoothing fit is singular".to_string()));
        }
        m.swap(col, pivot);
        let p = m[col][col];
        for v in m[col].iter_mut() {
            *v /= p;
        }
        for r in 0..n {
            if r != col {
                let f = m[r][col];
                if f != 0.0 {
                    for c in col..=n {
                        m[r][c] -= f * m[col][c];
                    }
                }
            }
        }
    }
    Ok(m.into_iter().map(|row| row[n]).collect())
}

/// Reflect a position into `0..len` without repeating the edge sample
fn mirror(mut i: isize, len: usize) -> usize {
    let last = len as isize - 1;
    if last <= 0 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

/// Savitzky–Golay filter over a gap-free series, mirrored at both ends
pub fn savgol_filter(values: &[f64], window: usize, order: usize) -> Result<Vec<f64>> {
    let coefficients = savgol_coefficients(window, order)?;
    let half = (window / 2) as isize;
    let len = values.len();
    Ok((0..len as isize)
        .map(|i| {
            coefficients
                .iter()
                .enumerate()
                .map(|(k, c)| c * values[mirror(i + k as isize - half, len)])
                .sum()
        })
        .collect())
}

/// Smooth one column after interpolating its gaps.
///
/// Only the stretch between the first and last valid value is filtered, the
/// edges stay missing.
pub fn smooth_column(
    table: &TimeSeriesTable,
    column: &str,
    window: usize,
    order: usize,
) -> Result<Column> {
    let values = table
        .column(column)
        .ok_or_else(|| PipelineError::UnknownColumn(column.to_string()))?;
    let filled = akima_fill(&seconds_axis(table.index()), values).values;

    let Some(first) = filled.iter().position(Option::is_some) else {
        return Ok(filled);
    };
    let last = filled.iter().rposition(Option::is_some).unwrap_or(first);
    let span: Vec<f64> = filled[first..=last].iter().map(|v| v.unwrap_or(0.0)).collect();
    // the window may not outgrow the series
    let longest = if span.len() % 2 == 0 { span.len() - 1 } else { span.len() };
    let window = window.min(longest);
    if window <= order {
        return Ok(filled);
    }
    let smooth = savgol_filter(&span, window, order)?;

    let mut out = vec![None; filled.len()];
    for (slot, value) in out[first..=last].iter_mut().zip(smooth) {
        *slot = Some(value);
    }
    Ok(out)
}

/// Add `<column> (glatt)` for every column that is not smoothed itself.
///
/// The smoothed lines share the metadata of their source.
pub fn add_smoothed(
    table: &mut TimeSeriesTable,
    metas: &mut ColumnMap,
    window: usize,
    order: usize,
) -> Result<()> {
    let sources: Vec<String> = table
        .column_names()
        .filter(|c| !c.ends_with(SMOOTH_SUFFIX))
        .map(str::to_string)
        .collect();
    for column in sources {
        let smooth = smooth_column(table, &column, window, order)?;
        let name = smoothed_name(&column);
        table.insert_column(name.clone(), smooth)?;
        if let Some(meta) = metas.get(&column) {
            let derived = meta.derived(SMOOTH_SUFFIX);
            metas.insert(name, derived);
        }
    }
    debug!(window, order, "smoothed lines added");
    Ok(())
}

/// Drop every smoothed column and its metadata
pub fn remove_smoothed(table: &mut TimeSeriesTable, metas: &mut ColumnMap) {
    let smoothed: Vec<String> = table
        .column_names()
        .filter(|c| c.contains(SMOOTH_SUFFIX.trim()))
        .map(str::to_string)
        .collect();
    for column in smoothed {
        table.remove_column(&column);
        metas.shift_remove(&column);
    }
}

/// Treat values above `cut_off` as missing and interpolate them again.
///
/// Returns the number of values replaced.
pub fn clean_outliers(table: &mut TimeSeriesTable, cut_off: f64) -> usize {
    let xs = seconds_axis(table.index());
    let names: Vec<String> = table.column_names().map(str::to_string).collect();
    let mut replaced = 0;
    for name in names {
        let Some(values) = table.column_mut(&name) else { continue };
        let masked: Column = values
            .iter()
            .map(|v| v.filter(|v| *v <= cut_off))
            .collect();
        let hits = masked.iter().zip(values.iter()).filter(|(m, v)| m != v).count();
        if hits > 0 {
            *values = akima_fill(&xs, &masked).values;
            replaced += hits;
        }
    }
    debug!(cut_off, replaced, "outliers cleaned");
    replaced
}
