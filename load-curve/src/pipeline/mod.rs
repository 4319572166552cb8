pub mod axes;
pub mod columns;
pub mod gap_fill;
pub mod multi_year;
pub mod resample;
pub mod session;
pub mod smoothing;
pub mod summary;
pub mod time_index;

use indexmap::IndexMap;
use meter_model::ColumnMeta;

/// Column metadata keyed by table column name
pub type ColumnMap = IndexMap<String, ColumnMeta>;
