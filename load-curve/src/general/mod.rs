pub mod config;
pub mod error;
pub mod logging;

pub use config::{PipelineConfig, WeatherConfig};
pub use error::{PipelineError, Result};
