//! Unit conventions shared by every view.
//!
//! Units are stored the way they are appended to numbers on screen, i.e. with a
//! leading space (`" kWh"`, `" °C"`).

/// Energy unit that is charted as average power.
pub const ENERGY_UNIT: &str = " kWh";
/// Power unit used on the chart for [`ENERGY_UNIT`] columns.
pub const POWER_UNIT: &str = " kW";

/// Units whose readings are averaged, not summed, when several readings fall
/// into one bucket.
pub const MEAN_UNITS: &[&str] = &[
    " °c", " °C", " w", " W", " kw", " kW", " KW", " mw", " mW", " MW", " m³", " m³/h", " pa/m",
    " Pa/m", " m/s",
];

/// Units recognised when scanning a spreadsheet column for its unit cell.
pub const KNOWN_UNITS: &[&str] = &[
    "W", "kW", "MW", "Wh", "kWh", "MWh", "Wh/a", "kWh/a", "MWh/a", "g", "kg", "Mg", "t",
];

/// Unit shown on the chart for a column measured in `unit_data`.
///
/// Energy per period (` kWh`) is displayed as the implied average power (` kW`),
/// every other unit is displayed as measured.
pub fn graph_unit(unit_data: Option<&str>) -> Option<String> {
    match unit_data {
        Some(ENERGY_UNIT) => Some(POWER_UNIT.to_string()),
        other => other.map(str::to_string),
    }
}

/// Whether readings in this unit are averaged instead of summed.
pub fn is_mean_unit(unit_data: Option<&str>) -> bool {
    unit_data.is_some_and(|u| MEAN_UNITS.contains(&u))
}

/// Case-insensitive match against [`KNOWN_UNITS`].
pub fn is_known_unit(text: &str) -> bool {
    let text = text.trim();
    KNOWN_UNITS.iter().any(|u| u.eq_ignore_ascii_case(text))
}

/// Bring a unit cell from a spreadsheet into the stored form.
///
/// Empty cells yield `None`. The `kwh`/`KWH` spellings are folded into
/// [`ENERGY_UNIT`] so the energy-to-power rule applies to them as well.
pub fn normalize_unit(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.eq_ignore_ascii_case("kwh") {
        return Some(ENERGY_UNIT.to_string());
    }
    Some(format!(" {trimmed}"))
}
