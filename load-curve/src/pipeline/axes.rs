//! Assignment of chart y-axes by unit.

use std::collections::HashMap;

use indexmap::IndexMap;
use meter_model::{AxisId, ColumnMeta};

use super::ColumnMap;

/// Distinct units by descending frequency; ties keep first-seen order.
pub fn rank_units<'a>(units: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut first_seen: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for unit in units {
        let count = counts.entry(unit).or_insert(0);
        if *count == 0 {
            first_seen.push(unit);
        }
        *count += 1;
    }
    // stable sort keeps first-seen order among equal counts
    first_seen.sort_by(|a, b| counts[b].cmp(&counts[a]));
    first_seen.into_iter().map(str::to_string).collect()
}

/// Units in axis order and the axis of every column
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisAssignment {
    pub units: Vec<String>,
    pub axes: IndexMap<String, AxisId>,
}

impl AxisAssignment {
    pub fn unit_of(&self, axis: AxisId) -> Option<&str> {
        self.units.get(axis.rank()).map(String::as_str)
    }
}

/// The most frequent charted unit gets `y`, the next ones `y2`, `y3`, ...
/// Columns without unit get no axis.
pub fn assign_axes<'a>(columns: impl IntoIterator<Item = (&'a str, &'a ColumnMeta)>) -> AxisAssignment {
    let columns: Vec<(&str, &ColumnMeta)> = columns.into_iter().collect();
    let units = rank_units(columns.iter().filter_map(|(_, m)| m.unit_graph.as_deref()));

    let axes = columns
        .iter()
        .filter_map(|(key, meta)| {
            let unit = meta.unit_graph.as_deref()?;
            let rank = units.iter().position(|u| u == unit)?;
            Some((key.to_string(), AxisId::from_rank(rank)))
        })
        .collect();
    AxisAssignment { units, axes }
}

/// Assign axes over all of `metas` and store them in `y_axis`.
pub fn apply_axes(metas: &mut ColumnMap) -> AxisAssignment {
    let assignment = assign_axes(metas.iter().map(|(k, m)| (k.as_str(), m)));
    for (key, meta) in metas.iter_mut() {
        meta.y_axis = assignment.axes.get(key).copied();
    }
    assignment
}
