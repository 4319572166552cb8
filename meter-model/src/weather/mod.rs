pub mod parameter;
pub mod station;

pub use parameter::{Category, Provider, WeatherParameter, AIR_TEMPERATURE, DEFAULT_PARAMETERS};
pub use station::Station;
