pub mod obis;
pub mod series;
pub mod weather;

pub use obis::catalog::{MeasureKind, QuantityKind, measure_kind, quantity_kind};
pub use obis::units::{graph_unit, is_known_unit, is_mean_unit};
pub use series::axis::AxisId;
pub use series::column::{AggregationPolicy, ColumnMeta};
pub use series::index::{IndexMeta, IntervalClass};
