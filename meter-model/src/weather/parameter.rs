//! Meteorological parameters offered by the weather providers.
//!
//! Both providers name their columns differently; the catalog maps every
//! provider code to one German title so that data from several stations can be
//! merged column-wise.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Source of weather observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./weather.ts")]
pub enum Provider {
    Dwd,
    Meteostat,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Dwd => "DWD",
            Provider::Meteostat => "Meteostat",
        }
    }
}

/// Grouping of parameters for selection lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./weather.ts")]
pub enum Category {
    Temperatures,
    SunAndWind,
    HumidityPressurePrecipitation,
    CloudsAndVisibility,
}

impl Category {
    pub fn title(&self) -> &'static str {
        match self {
            Category::Temperatures => "Temperaturen",
            Category::SunAndWind => "Sonne und Wind",
            Category::HumidityPressurePrecipitation => "Feuchte, Luftdruck, Niederschlag",
            Category::CloudsAndVisibility => "Bewölkung und Sichtweite",
        }
    }

    /// Category of a DWD parameter, derived from its name prefix
    pub fn for_dwd_code(code: &str) -> Option<Self> {
        if code.starts_with("temperature") {
            Some(Category::Temperatures)
        } else if ["rad", "sun", "win"].iter().any(|p| code.starts_with(p)) {
            Some(Category::SunAndWind)
        } else if ["humidity", "pressure", "precipit"]
            .iter()
            .any(|p| code.starts_with(p))
        {
            Some(Category::HumidityPressurePrecipitation)
        } else if ["cloud", "visib"].iter().any(|p| code.starts_with(p)) {
            Some(Category::CloudsAndVisibility)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./weather.ts")]
pub struct WeatherParameter {
    /// Column code used by the provider
    pub code: String,
    pub provider: Provider,
    /// German column title used after renaming
    pub title: String,
    pub unit: Option<String>,
    pub category: Option<Category>,
}

/// Code of the outdoor air temperature at the German weather service
pub const AIR_TEMPERATURE: &str = "temperature_air_mean_200";

/// Titles selected for download when nothing else is chosen
pub const DEFAULT_PARAMETERS: &[&str] = &[
    "Lufttemperatur in 2 m Höhe",
    "Globalstrahlung",
    "Windgeschwindigkeit",
    "Windrichtung",
];

// (code, title, unit, category)
const METEOSTAT_CODES: &[(&str, &str, &str, Category)] = &[
    ("TEMP", "Lufttemperatur in 2 m Höhe", "°C", Category::Temperatures),
    ("DWPT", "Taupunkt", "°C", Category::Temperatures),
    ("PRCP", "Niederschlag", "mm", Category::HumidityPressurePrecipitation),
    ("WDIR", "Windrichtung", "°", Category::SunAndWind),
    ("WSPD", "Windgeschwindigkeit", "km/h", Category::SunAndWind),
    ("WPGT", "max. Windböe", "km/h", Category::SunAndWind),
    ("RHUM", "rel. Luftfeuchtigkeit", "%", Category::HumidityPressurePrecipitation),
    ("PRES", "Luftdruck (Meereshöhe)", "hPa", Category::HumidityPressurePrecipitation),
    ("SNOW", "Schneehöhe", "m", Category::HumidityPressurePrecipitation),
    ("TSUN", "Sonnenstunden", "min", Category::SunAndWind),
];

// (code, title)
const DWD_NAMES: &[(&str, &str)] = &[
    ("temperature_air_mean_200", "Lufttemperatur in 2 m Höhe"),
    ("temperature_soil_mean_002", "Erdbodentemperatur in 2 cm Tiefe"),
    ("temperature_soil_mean_005", "Erdbodentemperatur in 5 cm Tiefe"),
    ("temperature_soil_mean_010", "Erdbodentemperatur in 10 cm Tiefe"),
    ("temperature_soil_mean_020", "Erdbodentemperatur in 20 cm Tiefe"),
    ("temperature_soil_mean_050", "Erdbodentemperatur in 50 cm Tiefe"),
    ("temperature_soil_mean_100", "Erdbodentemperatur in 100 cm Tiefe"),
    ("temperature_dew_point_mean_200", "Taupunkttemperatur in 2 m Höhe"),
    ("temperature_wet_mean_200", "Feuchtetemperatur"),
    ("radiation_global", "Globalstrahlung"),
    ("radiation_sky_short_wave_diffuse", "diffuse Strahlung"),
    ("radiation_sky_long_wave", "atmosphärische Gegenstrahlung"),
    ("sunshine_duration", "Sonnenscheindauer"),
    ("sun_zenith_angle", "Zenitwinkel der Sonne"),
    ("wind_speed", "Windgeschwindigkeit"),
    ("wind_direction", "Windrichtung"),
    ("wind_gust_max", "stärkste Windböe"),
    ("humidity", "relative Feuchte"),
    ("humidity_absolute", "absolute Feuchte"),
    ("pressure_air_sea_level", "Luftdruck auf Meereshöhe"),
    ("pressure_vapor", "Dampfdruck"),
    ("pressure_air_site", "Luftdruck auf Stationshöhe"),
    ("precipitation_height", "Niederschlagshöhe"),
    ("precipitation_form", "Niederschlagsart"),
    ("precipitation_indicator", "Niederschlagsindikator"),
    ("cloud_cover_total", "Gesamtbedeckungsgrad"),
    ("cloud_cover_total_indicator", "Gesamtbedeckungsgrad Index"),
    ("cloud_cover_layer1", "Bedeckungsgrad der 1. Schicht"),
    ("cloud_cover_layer2", "Bedeckungsgrad der 2. Schicht"),
    ("cloud_cover_layer3", "Bedeckungsgrad der 3. Schicht"),
    ("cloud_cover_layer4", "Bedeckungsgrad der 4. Schicht"),
    ("cloud_height_layer1", "Wolkenhöhe der 1. Schicht"),
    ("cloud_height_layer2", "Wolkenhöhe der 2. Schicht"),
    ("cloud_height_layer3", "Wolkenhöhe der 3. Schicht"),
    ("cloud_height_layer4", "Wolkenhöhe der 4. Schicht"),
    ("cloud_type_layer1", "Wolkenart der 1. Schicht"),
    ("cloud_type_layer2", "Wolkenart der 2. Schicht"),
    ("cloud_type_layer3", "Wolkenart der 3. Schicht"),
    ("cloud_type_layer4", "Wolkenart der 4. Schicht"),
    ("visibility_range", "Sichtweite"),
    ("visibility_range_indicator", "Sichtweite Index"),
];

/// Units the German weather service reports in its non-SI setting
fn dwd_unit(code: &str) -> Option<&'static str> {
    if code.starts_with("temperature") {
        Some("°C")
    } else if code.starts_with("radiation") {
        Some("J/cm²")
    } else if code == "wind_direction" {
        Some("°")
    } else if code.starts_with("wind") {
        Some("m/s")
    } else if code == "humidity" {
        Some("%")
    } else if code.starts_with("pressure") {
        Some("hPa")
    } else if code == "precipitation_height" {
        Some("mm")
    } else if code == "sunshine_duration" {
        Some("min")
    } else {
        None
    }
}

static PARAMETERS: LazyLock<HashMap<String, WeatherParameter>> = LazyLock::new(|| {
    let meteostat = METEOSTAT_CODES
        .iter()
        .map(|(code, title, unit, category)| WeatherParameter {
            code: code.to_string(),
            provider: Provider::Meteostat,
            title: title.to_string(),
            unit: Some(unit.to_string()),
            category: Some(*category),
        });
    let dwd = DWD_NAMES.iter().map(|(code, title)| WeatherParameter {
        code: code.to_string(),
        provider: Provider::Dwd,
        title: title.to_string(),
        unit: dwd_unit(code).map(str::to_string),
        category: Category::for_dwd_code(code),
    });
    dwd.chain(meteostat).map(|p| (p.code.clone(), p)).collect()
});

/// Look up a provider code. Meteostat codes are matched case-insensitively,
/// the provider delivers them in lower case.
pub fn parameter(code: &str) -> Option<&'static WeatherParameter> {
    PARAMETERS
        .get(code)
        .or_else(|| PARAMETERS.get(&code.to_uppercase()))
}

/// German title for a provider column code
pub fn title_for_code(code: &str) -> Option<&'static str> {
    parameter(code).map(|p| p.title.as_str())
}

/// Every parameter that belongs to one of the selection categories
pub fn all_parameters() -> Vec<&'static WeatherParameter> {
    let mut params: Vec<_> = PARAMETERS
        .values()
        .filter(|p| p.category.is_some())
        .collect();
    params.sort_by(|a, b| a.code.cmp(&b.code));
    params
}

/// Whether a column title stems from a weather provider
pub fn is_weather_title(title: &str) -> bool {
    PARAMETERS.values().any(|p| title.contains(p.title.as_str()))
}
