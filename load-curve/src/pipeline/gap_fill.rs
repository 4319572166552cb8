//! Stall detection and shape-preserving gap interpolation.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::general::config::PipelineConfig;
use crate::general::error::PipelineError;
use crate::table::{Column, TimeSeriesTable};

/// Akima interpolation through the points `(xs[i], ys[i])`, `xs` strictly
/// increasing.
#[derive(Debug, Clone)]
pub struct Akima {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl Akima {
    /// `None` for fewer than two points
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n {
            return None;
        }
        let slopes = if n == 2 {
            let s = (ys[1] - ys[0]) / (xs[1] - xs[0]);
            vec![s, s]
        } else {
            akima_slopes(&xs, &ys)
        };
        Some(Self { xs, ys, slopes })
    }

    /// Value at `x`, `None` outside the data range
    pub fn eval(&self, x: f64) -> Option<f64> {
        let n = self.xs.len();
        if x < self.xs[0] || x > self.xs[n - 1] {
            return None;
        }
        let k = match self.xs.partition_point(|&xi| xi <= x) {
            0 => 0,
            p if p >= n => n - 2,
            p => p - 1,
        };
        Some(self.hermite(k, x))
    }

    fn hermite(&self, k: usize, x: f64) -> f64 {
        let h = self.xs[k + 1] - self.xs[k];
        let d = x - self.xs[k];
        let s = (self.ys[k + 1] - self.ys[k]) / h;
        let (t0, t1) = (self.slopes[k], self.slopes[k + 1]);
        let c2 = (3.0 * s - 2.0 * t0 - t1) / h;
        let c3 = (t0 + t1 - 2.0 * s) / (h * h);
        self.ys[k] + d * (t0 + d * (c2 + d * c3))
    }
}

/// Derivatives at the data points: weighted mean of the neighbouring secant
/// slopes, two slopes extrapolated on either side.
fn akima_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n + 3];
    for i in 0..n - 1 {
        m[i + 2] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]);
    }
    m[1] = 2.0 * m[2] - m[3];
    m[0] = 2.0 * m[1] - m[2];
    m[n + 1] = 2.0 * m[n] - m[n - 1];
    m[n + 2] = 2.0 * m[n + 1] - m[n];

    let dm: Vec<f64> = m.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    let max_weight = (0..n)
        .map(|i| dm[i + 2] + dm[i])
        .fold(f64::NEG_INFINITY, f64::max);

    (0..n)
        .map(|i| {
            let (w1, w2) = (dm[i + 2], dm[i]);
            if w1 + w2 > 1e-9 * max_weight {
                (w1 * m[i + 1] + w2 * m[i + 2]) / (w1 + w2)
            } else {
                0.5 * (m[i + 3] + m[i])
            }
        })
        .collect()
}

/// Seconds since the first timestamp, the x axis for interpolation
pub fn seconds_axis(index: &[NaiveDateTime]) -> Vec<f64> {
    match index.first() {
        Some(first) => index
            .iter()
            .map(|ts| (*ts - *first).num_milliseconds() as f64 / 1000.0)
            .collect(),
        None => Vec::new(),
    }
}

/// Outcome of interpolating one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFill {
    pub values: Column,
    pub filled: usize,
    /// Missing values without points on both sides
    pub unbracketed: usize,
}

/// Fill missing values between valid ones; edge gaps stay missing.
pub fn akima_fill(xs: &[f64], values: &[Option<f64>]) -> ColumnFill {
    let (known_x, known_y): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(values)
        .filter_map(|(x, v)| v.filter(|v| v.is_finite()).map(|v| (*x, v)))
        .unzip();
    let missing = values.iter().filter(|v| !v.is_some_and(f64::is_finite)).count();

    let Some(akima) = Akima::new(known_x, known_y) else {
        return ColumnFill {
            values: values.to_vec(),
            filled: 0,
            unbracketed: missing,
        };
    };

    let mut filled = 0;
    let values: Column = xs
        .iter()
        .zip(values)
        .map(|(x, v)| match v {
            Some(v) if v.is_finite() => Some(*v),
            _ => {
                let y = akima.eval(*x);
                if y.is_some() {
                    filled += 1;
                }
                y
            }
        })
        .collect();
    ColumnFill {
        values,
        filled,
        unbracketed: missing - filled,
    }
}

/// Mark repeated readings as missing.
///
/// A value equal to its predecessor counts as a stalled sensor. Runs of more
/// than `exemption` equal values are taken as genuine flat readings and kept.
pub fn mark_stalls(values: &[Option<f64>], exemption: Option<usize>) -> (Column, usize) {
    let mut marked = values.to_vec();
    let mut stalls = 0;
    let mut start = 0;
    while start < values.len() {
        let mut end = start + 1;
        while end < values.len() && values[start].is_some() && values[end] == values[start] {
            end += 1;
        }
        let run = end - start;
        let exempt = exemption.is_some_and(|limit| run > limit);
        if run > 1 && !exempt {
            for value in &mut marked[start + 1..end] {
                *value = None;
            }
            stalls += run - 1;
        }
        start = end;
    }
    (marked, stalls)
}

/// Cleans every column of a table independently
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapFiller {
    pub stall_as_gap: bool,
    pub stall_run_exemption: Option<usize>,
}

impl Default for GapFiller {
    fn default() -> Self {
        Self {
            stall_as_gap: true,
            stall_run_exemption: None,
        }
    }
}

impl GapFiller {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            stall_as_gap: config.stall_as_gap,
            stall_run_exemption: config.stall_run_exemption,
        }
    }

    /// Filled table plus one `EmptyInterpolationWindow` per column that kept
    /// missing values at its edges.
    pub fn fill(&self, table: &TimeSeriesTable) -> (TimeSeriesTable, Vec<PipelineError>) {
        let xs = seconds_axis(table.index());
        let mut out = table.clone();
        let mut diagnostics = Vec::new();

        for (name, values) in table.columns() {
            let (values, stalls) = if self.stall_as_gap {
                mark_stalls(values, self.stall_run_exemption)
            } else {
                (values.clone(), 0)
            };
            let result = akima_fill(&xs, &values);
            debug!(
                column = %name,
                stalls,
                filled = result.filled,
                "gaps interpolated"
            );
            if result.unbracketed > 0 {
                diagnostics.push(PipelineError::EmptyInterpolationWindow {
                    column: name.clone(),
                    missing: result.unbracketed,
                });
            }
            if let Some(column) = out.column_mut(name) {
                *column = result.values;
            }
        }
        info!(
            "gap filling done, {} column(s) keep missing edge values",
            diagnostics.len()
        );
        (out, diagnostics)
    }
}

/// Fill with stall detection switched on or off
pub fn fill(table: &TimeSeriesTable, stall_as_gap: bool) -> (TimeSeriesTable, Vec<PipelineError>) {
    GapFiller {
        stall_as_gap,
        ..GapFiller::default()
    }
    .fill(table)
}
