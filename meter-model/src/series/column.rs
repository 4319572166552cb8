use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use super::axis::AxisId;
use crate::obis::units::{graph_unit, is_mean_unit};

/// How readings of a column are combined when several of them fall into one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series.ts")]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationPolicy {
    /// Energy, volume and other quantities measured per period
    Sum,
    /// Power, temperature and other instantaneous quantities
    Mean,
}

impl AggregationPolicy {
    pub fn for_unit(unit_data: Option<&str>) -> Self {
        if is_mean_unit(unit_data) {
            AggregationPolicy::Mean
        } else {
            AggregationPolicy::Sum
        }
    }
}

/// Metadata of one column of a time series table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./series.ts")]
pub struct ColumnMeta {
    /// Header exactly as found in the import
    pub orig_title: String,
    /// Decoded OBIS code, e.g. `1-1:1.29.3`
    pub code: Option<String>,
    pub quantity_code: Option<String>,
    pub measure_code: Option<String>,
    pub display_title: String,
    pub long_title: String,
    /// Unit as measured, with leading space
    pub unit_data: Option<String>,
    /// Unit as charted, with leading space
    pub unit_graph: Option<String>,
    pub aggregation_policy: AggregationPolicy,
    #[schema(value_type = Option<String>)]
    #[ts(type = "string | null")]
    pub y_axis: Option<AxisId>,
}

impl ColumnMeta {
    /// Metadata for a header that carries no decodable code
    pub fn plain(header: &str) -> Self {
        Self {
            orig_title: header.to_string(),
            code: None,
            quantity_code: None,
            measure_code: None,
            display_title: header.to_string(),
            long_title: header.to_string(),
            unit_data: None,
            unit_graph: None,
            aggregation_policy: AggregationPolicy::Sum,
            y_axis: None,
        }
    }

    /// Metadata for a plain column with a known unit
    pub fn with_unit(header: &str, unit_data: &str) -> Self {
        let mut meta = Self::plain(header);
        meta.set_unit(Some(unit_data.to_string()));
        meta
    }

    /// Replace the measured unit; the charted unit and the aggregation policy
    /// always follow from it.
    pub fn set_unit(&mut self, unit_data: Option<String>) {
        self.unit_graph = graph_unit(unit_data.as_deref());
        self.aggregation_policy = AggregationPolicy::for_unit(unit_data.as_deref());
        self.unit_data = unit_data;
    }

    pub fn is_mean(&self) -> bool {
        self.aggregation_policy == AggregationPolicy::Mean
    }

    /// Clone for a derived view, with `suffix` appended to both titles.
    ///
    /// The axis slot is not carried over, derived views get their own
    /// assignment.
    pub fn derived(&self, suffix: &str) -> Self {
        let mut meta = self.clone();
        meta.display_title = format!("{}{}", self.display_title, suffix);
        meta.long_title = format!("{}{}", self.long_title, suffix);
        meta.y_axis = None;
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_unit_derives_graph_unit_and_policy() {
        let mut meta = ColumnMeta::plain("Bezug");
        assert_eq!(meta.unit_graph, None);
        assert_eq!(meta.aggregation_policy, AggregationPolicy::Sum);

        meta.set_unit(Some(" kWh".to_string()));
        assert_eq!(meta.unit_graph.as_deref(), Some(" kW"));
        assert_eq!(meta.aggregation_policy, AggregationPolicy::Sum);

        meta.set_unit(Some(" kW".to_string()));
        assert_eq!(meta.unit_graph.as_deref(), Some(" kW"));
        assert!(meta.is_mean());

        meta.set_unit(Some(" °C".to_string()));
        assert_eq!(meta.unit_graph.as_deref(), Some(" °C"));
        assert!(meta.is_mean());
    }

    #[test]
    fn test_derived_clone() {
        let mut meta = ColumnMeta::with_unit("Bezug", " kWh");
        meta.y_axis = Some(AxisId::PRIMARY);
        let hourly = meta.derived(" *h");
        assert_eq!(hourly.display_title, "Bezug *h");
        assert_eq!(hourly.unit_graph.as_deref(), Some(" kW"));
        assert_eq!(hourly.y_axis, None);
        assert_eq!(hourly.orig_title, "Bezug");
    }

    #[test]
    fn test_json_shape() {
        let mut meta = ColumnMeta::with_unit("Temperatur", " °C");
        meta.y_axis = Some(AxisId::from_rank(1));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["aggregation_policy"], "MEAN");
        assert_eq!(json["y_axis"], "y2");
        let back: ColumnMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
