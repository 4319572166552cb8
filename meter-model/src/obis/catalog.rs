//! Static OBIS lookup tables for electricity meters (medium `1`).
//!
//! An OBIS identifier such as `1-1:1.29.3` reads
//! `<medium>-<channel>:<quantity>.<measure kind>.<tariff>`. The quantity table
//! ("Messgröße") carries the physical unit, the measure kind table ("Messart")
//! only labels.

use std::collections::HashMap;
use std::sync::LazyLock;

/// A physical quantity of the OBIS electricity code scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityKind {
    pub code: &'static str,
    /// Full German label, e.g. "Wirkleistung (+)".
    pub label: &'static str,
    /// Unit as measured, without leading space.
    pub unit: &'static str,
    /// Short label used as chart title, e.g. "Bezug".
    pub short_label: &'static str,
}

impl QuantityKind {
    const fn new(
        code: &'static str,
        label: &'static str,
        unit: &'static str,
        short_label: &'static str,
    ) -> Self {
        Self {
            code,
            label,
            unit,
            short_label,
        }
    }
}

/// The kind of measurement (instantaneous, cumulative, load profile, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureKind {
    pub code: &'static str,
    pub label: &'static str,
    pub short_label: &'static str,
}

impl MeasureKind {
    const fn new(code: &'static str, label: &'static str, short_label: &'static str) -> Self {
        Self {
            code,
            label,
            short_label,
        }
    }
}

const QUANTITY_KINDS: &[QuantityKind] = &[
    QuantityKind::new("1", "Wirkleistung (+)", "kWh", "Bezug"),
    QuantityKind::new("2", "Wirkleistung (-)", "kWh", "Lieferung"),
    QuantityKind::new("3", "Blindenergie (+)", "kvarh", "Blinden. Bezug"),
    QuantityKind::new("4", "Blindenergie (-)", "kvarh", "Blinden. Lieferung"),
    QuantityKind::new("5", "Blindenergie QI", "kvarh", "Blinden. QI"),
    QuantityKind::new("6", "Blindenergie QII", "kvarh", "Blinden. QII"),
    QuantityKind::new("7", "Blindenergie QIII", "kvarh", "Blinden. QIII"),
    QuantityKind::new("8", "Blindenergie QIV", "kvarh", "Blinden. QIV"),
    QuantityKind::new("9", "Scheinenergie (+)", "kVA", "Scheinen. Bezug"),
    QuantityKind::new("10", "Scheinenergie (-)", "kVA", "Scheinen. Lieferung"),
    QuantityKind::new("11", "Strom", "A", "Strom"),
    QuantityKind::new("12", "Spannung", "V", "Spannung"),
    QuantityKind::new("13", "Leistungsfaktor Durchschnitt", "-", "P-Faktor"),
    QuantityKind::new("14", "Frequenz", "Hz", "Frequenz"),
    QuantityKind::new("15", "Wirkenergie QI+QII+QIII+QIV", "kWh", "Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("16", "Wirkenergie QI+QII+QIII+QIV", "kWh", "Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("17", "Wirkenergie QI", "kWh", "Wirken. QI"),
    QuantityKind::new("18", "Wirkenergie QII", "kWh", "Wirken. QII"),
    QuantityKind::new("19", "Wirkenergie QIII", "kWh", "Wirken. QIII"),
    QuantityKind::new("20", "Wirkenergie QIV", "kWh", "Wirken. QIV"),
    QuantityKind::new("21", "Wirkenergie L1 (+)", "kWh", "L1 Bezug"),
    QuantityKind::new("22", "Wirkenergie L1 (-)", "kWh", "L1 Lieferung"),
    QuantityKind::new("23", "Blindenergie L1 (+)", "kvarh", "L1 Blinden. Bezug"),
    QuantityKind::new("24", "Blindenergie L1 (-)", "kvarh", "L1 Blinden. Lieferung"),
    QuantityKind::new("25", "Blindenergie L1 QI", "kvarh", "L1 Blinden. QI"),
    QuantityKind::new("26", "Blindenergie L1 QII", "kvarh", "L1 Blinden. QII"),
    QuantityKind::new("27", "Blindenergie L1 QIII", "kvarh", "L1 Blinden. QIII"),
    QuantityKind::new("28", "Blindenergie L1 QIV", "kvarh", "L1 Blinden. QIV"),
    QuantityKind::new("29", "Scheinenergie L1 (+)", "kVA", "L1 Scheinen. Bezug"),
    QuantityKind::new("30", "Scheinenergie L1 (-)", "kVA", "L1 Scheinen. Lieferung"),
    QuantityKind::new("31", "I L1", "A", "L1 Strom"),
    QuantityKind::new("32", "U PH-N L1", "V", "L1 Spannung"),
    QuantityKind::new("33", "Leistungsfaktor L1", "-", "L1 P-Faktor"),
    QuantityKind::new("34", "Frequenz L1", "Hz", "L1 Frequenz"),
    QuantityKind::new("35", "Wirkenergie L1 QI+QII+QIII+QIV", "kWh", "L1 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("36", "Wirkenergie L1 QI+QII+QIII+QIV", "kWh", "L1 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("37", "Wirkenergie L1 QI", "kWh", "L1 Wirken. QI"),
    QuantityKind::new("38", "Wirkenergie L1 QII", "kWh", "L1 Wirken. QII"),
    QuantityKind::new("39", "Wirkenergie L1 QIII", "kWh", "L1 Wirken. QIII"),
    QuantityKind::new("40", "Wirkenergie L1 QIV", "kWh", "L1 Wirken. QIV"),
    QuantityKind::new("41", "Wirkenergie L2 (+)", "kWh", "L2 Bezug"),
    QuantityKind::new("42", "Wirkenergie L2 (-)", "kWh", "L2 Lieferung"),
    QuantityKind::new("43", "Blindenergie L2 (+)", "kvarh", "L2 Blinden. Bezug"),
    QuantityKind::new("44", "Blindenergie L2 (-)", "kvarh", "L2 Blinden. Lieferung"),
    QuantityKind::new("45", "Blindenergie L2 QI", "kvarh", "L2 Blinden. QI"),
    QuantityKind::new("46", "Blindenergie L2 QII", "kvarh", "L2 Blinden. QII"),
    QuantityKind::new("47", "Blindenergie L2 QIII", "kvarh", "L2 Blinden. QIII"),
    QuantityKind::new("48", "Blindenergie L2 QIV", "kvarh", "L2 Blinden. QIV"),
    QuantityKind::new("49", "Scheinenergie L2 (+)", "kVA", "L2 Scheinen. Bezug"),
    QuantityKind::new("50", "Scheinenergie L2 (-)", "kVA", "L2 Scheinen. Lieferung"),
    QuantityKind::new("51", "I L2", "A", "L2 Strom"),
    QuantityKind::new("52", "U PH-N L2", "V", "L2 Spannung"),
    QuantityKind::new("53", "Leistungsfaktor L2", "-", "L2 P-Faktor"),
    QuantityKind::new("54", "Frequenz L2", "Hz", "L2 Frequenz"),
    QuantityKind::new("55", "Wirkenergie L2 QI+QII+QIII+QIV", "kWh", "L2 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("56", "Wirkenergie L2 QI+QII+QIII+QIV", "kWh", "L2 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("57", "Wirkenergie L2 QI", "kWh", "L2 Wirken. QI"),
    QuantityKind::new("58", "Wirkenergie L2 QII", "kWh", "L2 Wirken. QII"),
    QuantityKind::new("59", "Wirkenergie L2 QIII", "kWh", "L2 Wirken. QIII"),
    QuantityKind::new("60", "Wirkenergie L2 QIV", "kWh", "L2 Wirken. QIV"),
    QuantityKind::new("61", "Wirkenergie L3 (+)", "kWh", "L3 Bezug"),
    QuantityKind::new("62", "Wirkenergie L3 (-)", "kWh", "L3 Lieferung"),
    QuantityKind::new("63", "Blindenergie L3 (+)", "kvarh", "L3 Blinden. Bezug"),
    QuantityKind::new("64", "Blindenergie L3 (-)", "kvarh", "L3 Blinden. Lieferung"),
    QuantityKind::new("65", "Blindenergie L3 QI", "kvarh", "L3 Blinden. QI"),
    QuantityKind::new("66", "Blindenergie L3 QII", "kvarh", "L3 Blinden. QII"),
    QuantityKind::new("67", "Blindenergie L3 QIII", "kvarh", "L3 Blinden. QIII"),
    QuantityKind::new("68", "Blindenergie L3 QIV", "kvarh", "L3 Blinden. QIV"),
    QuantityKind::new("69", "Scheinenergie L3 (+)", "kVA", "L3 Scheinen. Bezug"),
    QuantityKind::new("70", "Scheinenergie L3 (-)", "kVA", "L3 Scheinen. Lieferung"),
    QuantityKind::new("71", "I L3", "A", "L3 Strom"),
    QuantityKind::new("72", "U PH-N L3", "V", "L3 Spannung"),
    QuantityKind::new("73", "Leistungsfaktor L3", "-", "L3 P-Faktor"),
    QuantityKind::new("74", "Frequenz L3", "Hz", "L3 Frequenz"),
    QuantityKind::new("75", "Wirkenergie L3 QI+QII+QIII+QIV", "kWh", "L3 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("76", "Wirkenergie L3 QI+QII+QIII+QIV", "kWh", "L3 Wirken. QI+QII+QIII+QIV"),
    QuantityKind::new("77", "Wirkenergie L3 QI", "kWh", "L3 Wirken. QI"),
    QuantityKind::new("78", "Wirkenergie L3 QII", "kWh", "L3 Wirken. QII"),
    QuantityKind::new("79", "Wirkenergie L3 QIII", "kWh", "L3 Wirken. QIII"),
    QuantityKind::new("80", "Wirkenergie L3 QIV", "kWh", "L3 Wirken. QIV"),
    QuantityKind::new("81", "Phasenwinkel", "-", "Phasenwinkel"),
    QuantityKind::new("82", "Einheitslose Mengen (z.B. Impulse)", "-", "Einheitslose Mengen"),
    QuantityKind::new("91", "I Neutralleiter", "A", "N Strom"),
    QuantityKind::new("92", "U Neutralleiter", "V", "N Spannung"),
];

const MEASURE_KINDS: &[MeasureKind] = &[
    MeasureKind::new("0", "Mittelwert Abrechnungsperiode (seit letztem Reset)", "Mittel"),
    MeasureKind::new("1", "Kumulativ Minimum 1", "min"),
    MeasureKind::new("2", "Kumulativ Maximum 1", "max"),
    MeasureKind::new("3", "Minimum 1", "min"),
    MeasureKind::new("4", "Aktueller Mittelwert 1", "Mittel"),
    MeasureKind::new("5", "Letzter Mittelwert 1", "Mittel"),
    MeasureKind::new("6", "Maximum 1", "max"),
    MeasureKind::new("7", "Momentanwert", "Momentanwert"),
    MeasureKind::new("8", "Zeit Integral 1 - Zählerstand", "Zählerstand"),
    MeasureKind::new("9", "Zeit Integral 2 – Verbrauch / Vorschub", "Verbrauch"),
    MeasureKind::new("10", "Zeit Integral 3", "Integral"),
    MeasureKind::new("11", "Kumulativ Minimum 2", "min"),
    MeasureKind::new("12", "Kumulativ Maximum 2", "max"),
    MeasureKind::new("13", "Minimum 2", "min"),
    MeasureKind::new("14", "Aktueller Mittelwert 2", "Mittel"),
    MeasureKind::new("15", "Letzter Mittelwert 2", "Mittel"),
    MeasureKind::new("16", "Maximum 2", "max"),
    MeasureKind::new("17", "Momentanwert 2", "Momentanwert"),
    MeasureKind::new("18", "Zeit Integral 2 1 - Zählerstand", "Zählerstand"),
    MeasureKind::new("19", "Zeit Integral 2 2 – Verbrauch / Vorschub", "Verbrauch"),
    MeasureKind::new("20", "Zeit Integral 3 2", "Integral"),
    MeasureKind::new("21", "Kumulativ Minimum 3", "min"),
    MeasureKind::new("22", "Kumulativ Maximum 3", "max"),
    MeasureKind::new("23", "Minimum 3", "min"),
    MeasureKind::new("24", "Aktueller Mittelwert 3", "Mittel"),
    MeasureKind::new("25", "Letzter Mittelwert 3", "Mittel"),
    MeasureKind::new("26", "Maximum 3", "max"),
    MeasureKind::new("27", "Aktueller Mittelwert 5", "Mittel"),
    MeasureKind::new("28", "Aktueller Mittelwert 6", "Mittel"),
    MeasureKind::new("29", "Zeit Integral 5 – Lastprofil Aufzeichnungsperiode 1", "Lastprofil"),
    MeasureKind::new("30", "Zeit Integral 6 – Lastprofil Aufzeichnungsperiode 2", "Lastprofil"),
    MeasureKind::new("31", "Untere Grenzwertschwelle", "Grenzwertschwelle u"),
    MeasureKind::new("32", "Unterer Grenzwert Ereigniszähler", "Grenzwert Zähler u"),
    MeasureKind::new("33", "Unterer Grenzwert Dauer", "Grenzwert Dauer u"),
    MeasureKind::new("34", "Unterer Grenzwert Größe", "Grenzwert Größe u"),
    MeasureKind::new("35", "Oberer Grenzwertschwelle", "Grenzwertschwelle o"),
    MeasureKind::new("36", "Oberer Grenzwert Ereigniszähler", "Grenzwert Zähler o"),
    MeasureKind::new("37", "Oberer Grenzwert Dauer", "Grenzwert Dauer o"),
    MeasureKind::new("38", "Oberer Grenzwert Größe", "Grenzwert Größe o"),
    MeasureKind::new("58", "Zeit Integral 4 – Test Zeit Integral", "Test Zeit Integral"),
    MeasureKind::new("131", "Schichtwert", "Schichtwert"),
    MeasureKind::new("132", "Tageswert", "Tageswert"),
    MeasureKind::new("133", "Wochenwert", "Wochenwert"),
    MeasureKind::new("134", "Monatswert", "Monatswert"),
    MeasureKind::new("135", "Quartalswert", "Quartalswert"),
    MeasureKind::new("136", "Jahreswert", "Jahreswert"),
];

static QUANTITY_LOOKUP: LazyLock<HashMap<&'static str, &'static QuantityKind>> =
    LazyLock::new(|| QUANTITY_KINDS.iter().map(|q| (q.code, q)).collect());

static MEASURE_LOOKUP: LazyLock<HashMap<&'static str, &'static MeasureKind>> =
    LazyLock::new(|| MEASURE_KINDS.iter().map(|m| (m.code, m)).collect());

/// Look up a quantity ("Messgröße") by its numeric code.
pub fn quantity_kind(code: &str) -> Option<&'static QuantityKind> {
    QUANTITY_LOOKUP.get(code.trim()).copied()
}

/// Look up a measure kind ("Messart") by its numeric code.
pub fn measure_kind(code: &str) -> Option<&'static MeasureKind> {
    MEASURE_LOOKUP.get(code.trim()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_lookup() {
        let bezug = quantity_kind("1").unwrap();
        assert_eq!(bezug.short_label, "Bezug");
        assert_eq!(bezug.unit, "kWh");

        let voltage = quantity_kind("32").unwrap();
        assert_eq!(voltage.unit, "V");
        assert_eq!(voltage.short_label, "L1 Spannung");
    }

    #[test]
    fn test_measure_lookup() {
        assert_eq!(measure_kind("29").unwrap().short_label, "Lastprofil");
        assert_eq!(measure_kind("8").unwrap().short_label, "Zählerstand");
        assert_eq!(measure_kind(" 5 ").unwrap().short_label, "Mittel");
    }

    #[test]
    fn test_unknown_codes() {
        assert!(quantity_kind("83").is_none());
        assert!(quantity_kind("").is_none());
        assert!(measure_kind("99").is_none());
    }

    #[test]
    fn test_codes_are_unique() {
        assert_eq!(QUANTITY_LOOKUP.len(), QUANTITY_KINDS.len());
        assert_eq!(MEASURE_LOOKUP.len(), MEASURE_KINDS.len());
    }
}
