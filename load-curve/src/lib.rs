pub mod general;
pub mod io;
pub mod pipeline;
pub mod table;

pub use general::{PipelineConfig, PipelineError, Result};
pub use io::{RawIndex, RawTable};
pub use pipeline::session::Session;
pub use table::{DurationCurve, TimeSeriesTable};
