use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, Result};

/// Settings of one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reference_year: i32,                 // Year all multi-year and multi-day views are mapped onto
    pub fill_gaps: bool,                     // Interpolate missing values after import
    pub stall_as_gap: bool,                  // Treat a repeated reading as a stalled sensor
    pub stall_run_exemption: Option<usize>,  // Runs longer than this many equal values are kept
    pub twelve_hour_clock: bool,             // Source writes 12-hour times without AM/PM
    pub min_rows_per_year: usize,            // A year needs more rows than this to be offered
    pub sheet_name: String,                  // Worksheet of the import workbook
    pub index_marker: String,                // Cell text marking the header row and index column
    pub smoothing_order: usize,              // Polynomial order of the smoothing filter
    pub weather: WeatherConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_year: 2020,
            fill_gaps: true,
            stall_as_gap: true,
            stall_run_exemption: None,
            twelve_hour_clock: false,
            min_rows_per_year: 50,
            sheet_name: "Daten".to_string(),
            index_marker: "↓ Index ↓".to_string(),
            smoothing_order: 3,
            weather: WeatherConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub data_threshold: f64,          // Minimum share of valid observations of a station
    pub max_station_distance_km: f64, // Search radius around the site
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            data_threshold: 0.85,
            max_station_distance_km: 700.0,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if chrono::NaiveDate::from_ymd_opt(self.reference_year, 1, 1).is_none() {
            return Err(PipelineError::Config(format!(
                "reference_year {} out of range",
                self.reference_year
            )));
        }
        if !(0.0..=1.0).contains(&self.weather.data_threshold) {
            return Err(PipelineError::Config(format!(
                "weather.data_threshold must be within 0..1, got {}",
                self.weather.data_threshold
            )));
        }
        if self.stall_run_exemption == Some(0) {
            return Err(PipelineError::Config(
                "stall_run_exemption must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
