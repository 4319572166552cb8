//! Decoding of column headers into [`ColumnMeta`].
//!
//! Headers that contain an OBIS electricity code (`*1-*:*.*`, e.g.
//! `Bezug 1-1:1.29.3` or `(1-1:2.5.3)`) are labelled from the catalog, every
//! other header is taken verbatim and stays without unit until a unit row
//! supplies one.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use meter_model::obis::units::{is_known_unit, normalize_unit};
use meter_model::{ColumnMeta, measure_kind, quantity_kind};
use tracing::{debug, warn};

use crate::general::error::PipelineError;

/// Code parts of a header matching the OBIS pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObisCode {
    /// Full code without parentheses, e.g. `1-1:1.29.3`
    pub code: String,
    pub quantity: String,
    pub measure: String,
}

impl ObisCode {
    /// Match `header` against `*1-*:*.*` and split out the code parts.
    pub fn parse(header: &str) -> Option<Self> {
        let start = header.find("1-")?;
        let rest = &header[start..];
        let colon = rest.find(':')?;
        let after_colon = &rest[colon + 1..];
        if !after_colon.contains('.') {
            return None;
        }
        let code: String = rest.chars().filter(|c| *c != '(' && *c != ')').collect();
        let mut segments = after_colon.split(':').next().unwrap_or(after_colon).split('.');
        let quantity = segments.next()?.trim().to_string();
        let measure = segments.next()?.trim().to_string();
        Some(Self {
            code: code.trim().to_string(),
            quantity,
            measure,
        })
    }

    fn pair(&self) -> String {
        format!("{}.{}", self.quantity, self.measure)
    }
}

/// Result of decoding a header row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// Metadata per original header, in header order
    pub columns: IndexMap<String, ColumnMeta>,
    /// Columns that matched the pattern but could not be labelled
    pub degraded: Vec<PipelineError>,
}

/// Decode every header. Pure: the same headers always give the same result.
pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Resolution {
    let codes: Vec<Option<ObisCode>> = headers.iter().map(|h| ObisCode::parse(h.as_ref())).collect();

    // quantity codes that occur with more than one measure kind get the code in their title
    let mut pairs_per_quantity: HashMap<&str, HashSet<String>> = HashMap::new();
    for code in codes.iter().flatten() {
        pairs_per_quantity
            .entry(code.quantity.as_str())
            .or_default()
            .insert(code.pair());
    }

    let mut resolution = Resolution::default();
    for (header, code) in headers.iter().zip(&codes) {
        let header = header.as_ref();
        let meta = match code {
            None => ColumnMeta::plain(header),
            Some(code) => {
                let ambiguous = pairs_per_quantity
                    .get(code.quantity.as_str())
                    .is_some_and(|pairs| pairs.len() > 1);
                match decode(header, code, ambiguous) {
                    Ok((meta, None)) => meta,
                    Ok((meta, Some(err))) => {
                        warn!("{}", err);
                        resolution.degraded.push(err);
                        meta
                    }
                    Err(err) => {
                        warn!("{}", err);
                        resolution.degraded.push(err);
                        let mut meta = ColumnMeta::plain(header);
                        meta.code = Some(code.code.clone());
                        meta.quantity_code = Some(code.quantity.clone());
                        meta.measure_code = Some(code.measure.clone());
                        meta
                    }
                }
            }
        };
        debug!(header, title = %meta.display_title, unit = ?meta.unit_data, "column decoded");
        resolution.columns.insert(header.to_string(), meta);
    }
    resolution
}

/// Label a coded header from the catalog.
///
/// An unknown quantity code fails the column. An unknown measure kind only
/// costs the label, the unit still comes from the quantity and the returned
/// diagnostic is recorded next to the metadata.
fn decode(
    header: &str,
    code: &ObisCode,
    ambiguous: bool,
) -> Result<(ColumnMeta, Option<PipelineError>), PipelineError> {
    let unknown = |c: &str| PipelineError::UnknownQuantityCode {
        column: header.to_string(),
        code: c.to_string(),
    };
    let quantity = quantity_kind(&code.quantity).ok_or_else(|| unknown(&code.quantity))?;
    let measure = measure_kind(&code.measure);

    let mut meta = ColumnMeta::plain(header);
    meta.code = Some(code.code.clone());
    meta.quantity_code = Some(code.quantity.clone());
    meta.measure_code = Some(code.measure.clone());
    meta.display_title = if ambiguous {
        format!("{} ({})", quantity.short_label, code.code)
    } else {
        quantity.short_label.to_string()
    };
    meta.long_title = match measure {
        Some(measure) => format!(
            "{} [{}] - {} ({})",
            quantity.label, quantity.unit, measure.label, code.code
        ),
        None => format!("{} [{}] ({})", quantity.label, quantity.unit, code.code),
    };
    meta.set_unit(normalize_unit(quantity.unit));
    let diagnostic = measure.is_none().then(|| unknown(&code.measure));
    Ok((meta, diagnostic))
}

/// Override decoded units with the unit row of the import.
///
/// Empty unit cells leave the decoded unit in place.
pub fn apply_units(columns: &mut IndexMap<String, ColumnMeta>, units: &[Option<String>]) {
    for (meta, unit) in columns.values_mut().zip(units) {
        if let Some(unit) = unit.as_deref().and_then(normalize_unit) {
            if meta.unit_data.as_deref() != Some(unit.as_str()) {
                debug!(column = %meta.orig_title, unit = %unit, "unit from unit row");
            }
            meta.set_unit(Some(unit));
        }
    }
}

/// Table keys for the decoded columns: the display title, with the original
/// header appended where two columns would end up with the same title.
///
/// The returned metadata has `display_title` set to its key.
pub fn keyed_by_title(columns: IndexMap<String, ColumnMeta>) -> Vec<(String, String, ColumnMeta)> {
    let mut title_count: HashMap<String, usize> = HashMap::new();
    for meta in columns.values() {
        *title_count.entry(meta.display_title.clone()).or_insert(0) += 1;
    }

    let mut used: HashSet<String> = HashSet::new();
    let mut keyed = Vec::with_capacity(columns.len());
    for (header, mut meta) in columns {
        let mut key = if title_count.get(&meta.display_title).copied().unwrap_or(0) > 1
            && meta.display_title != header
        {
            format!("{} ({})", meta.display_title, header)
        } else {
            meta.display_title.clone()
        };
        let base = key.clone();
        let mut n = 2;
        while used.contains(&key) {
            key = format!("{} {}", base, n);
            n += 1;
        }
        used.insert(key.clone());
        meta.display_title = key.clone();
        keyed.push((header, key, meta));
    }
    keyed
}

/// First cell that names a known unit, compared case-insensitively
pub fn find_unit<S: AsRef<str>>(cells: &[S]) -> Option<String> {
    cells
        .iter()
        .map(|c| c.as_ref().trim())
        .find(|c| is_known_unit(c))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_model::AggregationPolicy;

    #[test]
    fn test_parse_obis_code() {
        let code = ObisCode::parse("Lieferung (1-1:2.5.3)").unwrap();
        assert_eq!(code.code, "1-1:2.5.3");
        assert_eq!(code.quantity, "2");
        assert_eq!(code.measure, "5");

        let code = ObisCode::parse("1-1:1.29.3").unwrap();
        assert_eq!(code.quantity, "1");
        assert_eq!(code.measure, "29");

        assert_eq!(ObisCode::parse("Temperatur"), None);
        assert_eq!(ObisCode::parse("1-1:129"), None);
        assert_eq!(ObisCode::parse("Zeit 12:30"), None);
    }

    #[test]
    fn test_resolve_obis_and_plain() {
        let resolution = resolve(&["1-1:1.29.3", "Temperatur"]);
        assert!(resolution.degraded.is_empty());

        let bezug = &resolution.columns["1-1:1.29.3"];
        assert_eq!(bezug.display_title, "Bezug");
        assert_eq!(bezug.unit_data.as_deref(), Some(" kWh"));
        assert_eq!(bezug.unit_graph.as_deref(), Some(" kW"));
        assert_eq!(bezug.aggregation_policy, AggregationPolicy::Sum);
        assert_eq!(
            bezug.long_title,
            "Wirkleistung (+) [kWh] - Zeit Integral 5 – Lastprofil Aufzeichnungsperiode 1 (1-1:1.29.3)"
        );

        let temp = &resolution.columns["Temperatur"];
        assert_eq!(temp.display_title, "Temperatur");
        assert_eq!(temp.unit_data, None);
        assert_eq!(temp.code, None);
    }

    #[test]
    fn test_same_quantity_different_measure_gets_code() {
        let resolution = resolve(&["1-1:1.29.0", "1-1:1.8.0", "1-1:2.29.0"]);
        assert_eq!(resolution.columns["1-1:1.29.0"].display_title, "Bezug (1-1:1.29.0)");
        assert_eq!(resolution.columns["1-1:1.8.0"].display_title, "Bezug (1-1:1.8.0)");
        assert_eq!(resolution.columns["1-1:2.29.0"].display_title, "Lieferung");
    }

    #[test]
    fn test_same_pair_twice_is_not_ambiguous() {
        let resolution = resolve(&["A 1-1:1.29.0", "B 1-2:1.29.0"]);
        assert_eq!(resolution.columns["A 1-1:1.29.0"].display_title, "Bezug");
        assert_eq!(resolution.columns["B 1-2:1.29.0"].display_title, "Bezug");
    }

    #[test]
    fn test_unknown_code_degrades_column() {
        let resolution = resolve(&["1-1:99.29.0", "1-1:1.29.0"]);
        assert_eq!(resolution.degraded.len(), 1);
        assert_eq!(
            resolution.degraded[0],
            PipelineError::UnknownQuantityCode {
                column: "1-1:99.29.0".to_string(),
                code: "99".to_string()
            }
        );
        let degraded = &resolution.columns["1-1:99.29.0"];
        assert_eq!(degraded.display_title, "1-1:99.29.0");
        assert_eq!(degraded.unit_data, None);
        assert_eq!(degraded.quantity_code.as_deref(), Some("99"));
        assert_eq!(resolution.columns["1-1:1.29.0"].display_title, "Bezug");
    }

    #[test]
    fn test_unknown_measure_keeps_quantity_unit() {
        let resolution = resolve(&["1-1:1.99.0"]);
        assert_eq!(
            resolution.degraded,
            vec![PipelineError::UnknownQuantityCode {
                column: "1-1:1.99.0".to_string(),
                code: "99".to_string()
            }]
        );
        let meta = &resolution.columns["1-1:1.99.0"];
        assert_eq!(meta.display_title, "Bezug");
        assert_eq!(meta.long_title, "Wirkleistung (+) [kWh] (1-1:1.99.0)");
        assert_eq!(meta.unit_data.as_deref(), Some(" kWh"));
        assert_eq!(meta.unit_graph.as_deref(), Some(" kW"));
        assert_eq!(meta.aggregation_policy, AggregationPolicy::Sum);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let headers = ["1-1:1.29.0", "1-1:1.8.0", "Lieferung (1-1:2.5.3)", "Temperatur"];
        assert_eq!(resolve(&headers), resolve(&headers));
    }

    #[test]
    fn test_unit_row_overrides() {
        let mut resolution = resolve(&["Verbrauch", "1-1:1.29.0", "Leistung"]);
        apply_units(
            &mut resolution.columns,
            &[Some("KWH".to_string()), None, Some("kW".to_string())],
        );
        assert_eq!(resolution.columns["Verbrauch"].unit_graph.as_deref(), Some(" kW"));
        assert_eq!(resolution.columns["1-1:1.29.0"].unit_data.as_deref(), Some(" kWh"));
        assert!(resolution.columns["Leistung"].is_mean());
    }

    #[test]
    fn test_keyed_by_title_resolves_clashes() {
        let resolution = resolve(&["A 1-1:1.29.0", "B 1-2:1.29.0", "Temperatur"]);
        let keyed = keyed_by_title(resolution.columns);
        let keys: Vec<&str> = keyed.iter().map(|(_, k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Bezug (A 1-1:1.29.0)", "Bezug (B 1-2:1.29.0)", "Temperatur"]);
        assert_eq!(keyed[0].2.display_title, "Bezug (A 1-1:1.29.0)");
        assert_eq!(keyed[0].0, "A 1-1:1.29.0");
    }

    #[test]
    fn test_find_unit() {
        assert_eq!(find_unit(&["Zähler", "kwh", "12"]).as_deref(), Some("kwh"));
        assert_eq!(find_unit(&["Zähler", "12"]), None);
    }
}
