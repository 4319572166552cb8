use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use super::parameter::Provider;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A weather station as listed by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export, export_to = "./weather.ts")]
pub struct Station {
    pub id: String,
    pub provider: Provider,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation above sea level in m
    pub elevation: Option<f64>,
}

impl Station {
    /// Great-circle distance to a location in km
    pub fn distance_km(&self, latitude: f64, longitude: f64) -> f64 {
        haversine_km(self.latitude, self.longitude, latitude, longitude)
    }

    /// Key unique across providers, e.g. `DWD_05822`
    pub fn key(&self) -> String {
        format!("{}_{}", self.provider.name(), self.id)
    }
}

pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine() {
        // Berlin to Hamburg is about 255 km
        let d = haversine_km(52.52, 13.405, 53.551, 9.993);
        assert!((d - 255.0).abs() < 5.0, "distance was {d}");
        assert_eq!(haversine_km(50.0, 8.0, 50.0, 8.0), 0.0);
    }

    #[test]
    fn test_station_key() {
        let station = Station {
            id: "05822".to_string(),
            provider: Provider::Dwd,
            name: "Zwiesel".to_string(),
            latitude: 49.0,
            longitude: 13.2,
            elevation: Some(612.0),
        };
        assert_eq!(station.key(), "DWD_05822");
        assert!(station.distance_km(49.0, 13.2) < 1e-9);
    }
}
