//! One analysis session: the normalized table, its metadata and the derived
//! views computed from it.
//!
//! Every method that changes the table takes `&mut self`, so two pipeline runs
//! can never work on the same session at once. Derived views are caches; any
//! change to the table drops them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use indexmap::IndexMap;
use meter_model::obis::units::normalize_unit;
use meter_model::weather::parameter::{all_parameters, is_weather_title, title_for_code};
use meter_model::weather::AIR_TEMPERATURE;
use meter_model::{ColumnMeta, IndexMeta};
use tracing::{debug, info, warn};

use super::ColumnMap;
use super::axes::{AxisAssignment, apply_axes};
use super::columns::{apply_units, keyed_by_title, resolve};
use super::gap_fill::GapFiller;
use super::multi_year::{day_slices, overlay_years, split_by_year, year_key, year_metas};
use super::resample::{to_duration_curve, to_hourly, to_monthly};
use super::smoothing::{add_smoothed, clean_outliers, default_window, remove_smoothed};
use super::summary::{Extremes, MonthlySummary, absolute_max, extremes, monthly_summary};
use super::time_index::normalize;
use crate::general::config::PipelineConfig;
use crate::general::error::{PipelineError, Result};
use crate::io::raw::RawTable;
use crate::io::weather::{reindex_column, spacing};
use crate::table::{DurationCurve, TimeSeriesTable};

/// Column the outdoor temperature is overlaid as
pub const TEMPERATURE_COLUMN: &str = "Temperatur";
const TEMPERATURE_FALLBACK: &str = "Temperatur (Wetterdaten)";
const TEMPERATURE_UNIT: &str = " °C";

#[derive(Debug, Clone, Default)]
struct ViewCache {
    hourly: Option<TimeSeriesTable>,
    duration_curve: Option<DurationCurve>,
    monthly: Option<TimeSeriesTable>,
    multi_year: Option<BTreeMap<i32, TimeSeriesTable>>,
    multi_year_duration: Option<BTreeMap<i32, DurationCurve>>,
    multi_year_monthly: Option<BTreeMap<i32, TimeSeriesTable>>,
    days: Option<(Vec<NaiveDate>, IndexMap<String, TimeSeriesTable>)>,
}

#[derive(Debug, Clone)]
pub struct Session {
    config: PipelineConfig,
    table: TimeSeriesTable,
    metas: ColumnMap,
    index_meta: IndexMeta,
    years: Vec<i32>,
    axes: AxisAssignment,
    dst_removed: TimeSeriesTable,
    duplicates: TimeSeriesTable,
    diagnostics: Vec<PipelineError>,
    weather_columns: Vec<String>,
    cache: ViewCache,
}

impl Session {
    /// Run the import pipeline on a raw table.
    ///
    /// Fails on structural problems (no rows, unparsable timestamps). Column
    /// level problems end up in [`Session::diagnostics`].
    pub fn from_raw(mut raw: RawTable, config: PipelineConfig) -> Result<Self> {
        raw.drop_empty();
        let headers = raw.unique_headers();
        let units = raw.units.clone();
        let table = raw.into_table(&config)?;

        let normalized = normalize(&table)?;

        let mut resolution = resolve(&headers);
        apply_units(&mut resolution.columns, &units);
        let mut diagnostics = resolution.degraded;
        for degraded in &diagnostics {
            warn!("{}", degraded);
        }

        let mut source = normalized.table;
        let mut columns = IndexMap::new();
        let mut metas = ColumnMap::new();
        for (header, key, meta) in keyed_by_title(resolution.columns) {
            let values = source
                .remove_column(&header)
                .ok_or_else(|| PipelineError::UnknownColumn(header.clone()))?;
            columns.insert(key.clone(), values);
            metas.insert(key, meta);
        }
        let mut table =
            TimeSeriesTable::with_orgidx(source.index().to_vec(), source.orgidx().to_vec(), columns)?;

        if config.fill_gaps {
            let (filled, fill_diagnostics) = GapFiller::from_config(&config).fill(&table);
            table = filled;
            diagnostics.extend(fill_diagnostics);
        }

        let index_meta = IndexMeta::from_timestamps(table.index());
        let years = overlay_years(&table, config.min_rows_per_year);
        let axes = apply_axes(&mut metas);
        info!(
            rows = table.len(),
            columns = metas.len(),
            interval = ?index_meta.interval_class,
            "session ready, years {:?}", years
        );

        Ok(Self {
            config,
            table,
            metas,
            index_meta,
            years,
            axes,
            dst_removed: normalized.dst_removed,
            duplicates: normalized.duplicates,
            diagnostics,
            weather_columns: Vec::new(),
            cache: ViewCache::default(),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn table(&self) -> &TimeSeriesTable {
        &self.table
    }

    /// Metadata of the table columns and of every derived column computed so far
    pub fn metas(&self) -> &ColumnMap {
        &self.metas
    }

    pub fn index_meta(&self) -> &IndexMeta {
        &self.index_meta
    }

    /// Years with enough rows for the multi-year views
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn axes(&self) -> &AxisAssignment {
        &self.axes
    }

    pub fn dst_removed(&self) -> &TimeSeriesTable {
        &self.dst_removed
    }

    pub fn duplicates(&self) -> &TimeSeriesTable {
        &self.duplicates
    }

    pub fn diagnostics(&self) -> &[PipelineError] {
        &self.diagnostics
    }

    pub fn weather_columns(&self) -> &[String] {
        &self.weather_columns
    }

    /// Drop every derived view.
    pub fn invalidate(&mut self) {
        self.cache = ViewCache::default();
    }

    /// Metadata of the given columns with axes assigned among just them
    pub fn chart_metas<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> ColumnMap {
        let mut subset: ColumnMap = columns
            .into_iter()
            .filter_map(|c| self.metas.get(c).map(|m| (c.to_string(), m.clone())))
            .collect();
        apply_axes(&mut subset);
        subset
    }

    fn table_metas(&self) -> ColumnMap {
        self.metas
            .iter()
            .filter(|(key, _)| self.table.has_column(key))
            .map(|(key, meta)| (key.clone(), meta.clone()))
            .collect()
    }

    pub fn hourly(&mut self) -> Result<&TimeSeriesTable> {
        let hourly = match self.cache.hourly.take() {
            Some(hourly) => hourly,
            None => to_hourly(&self.table, &mut self.metas, &self.index_meta)?,
        };
        Ok(self.cache.hourly.insert(hourly))
    }

    pub fn duration_curve(&mut self) -> Result<&DurationCurve> {
        let curve = match self.cache.duration_curve.take() {
            Some(curve) => curve,
            None => to_duration_curve(&self.table, &mut self.metas, &self.index_meta)?,
        };
        Ok(self.cache.duration_curve.insert(curve))
    }

    pub fn monthly(&mut self) -> Result<&TimeSeriesTable> {
        let monthly = match self.cache.monthly.take() {
            Some(monthly) => monthly,
            None => to_monthly(&self.table, &mut self.metas, &self.index_meta, None)?,
        };
        Ok(self.cache.monthly.insert(monthly))
    }

    pub fn monthly_summary(&mut self) -> Result<MonthlySummary> {
        self.monthly()?;
        let monthly = self.cache.monthly.as_ref().ok_or(PipelineError::EmptyTable)?;
        Ok(monthly_summary(monthly, &self.metas))
    }

    /// One table per overlay year, shifted into the reference year, with the
    /// columns renamed to `<column> <year>`.
    pub fn multi_year(&mut self) -> Result<&BTreeMap<i32, TimeSeriesTable>> {
        let slices = match self.cache.multi_year.take() {
            Some(slices) => slices,
            None => self.build_multi_year()?,
        };
        Ok(self.cache.multi_year.insert(slices))
    }

    fn build_multi_year(&mut self) -> Result<BTreeMap<i32, TimeSeriesTable>> {
        for (key, meta) in year_metas(&self.table_metas(), &self.years) {
            self.metas.entry(key).or_insert(meta);
        }
        let mut slices = split_by_year(&self.table, &self.years, self.config.reference_year);
        for (year, slice) in slices.iter_mut() {
            let names: Vec<String> = slice.column_names().map(str::to_string).collect();
            for name in names {
                slice.rename_column(&name, &year_key(&name, *year))?;
            }
        }
        Ok(slices)
    }

    /// Duration curve of every overlay year
    pub fn multi_year_duration_curves(&mut self) -> Result<&BTreeMap<i32, DurationCurve>> {
        let curves = match self.cache.multi_year_duration.take() {
            Some(curves) => curves,
            None => {
                let slices = self.multi_year()?.clone();
                let mut curves = BTreeMap::new();
                for (year, slice) in &slices {
                    curves.insert(
                        *year,
                        to_duration_curve(slice, &mut self.metas, &self.index_meta)?,
                    );
                }
                curves
            }
        };
        Ok(self.cache.multi_year_duration.insert(curves))
    }

    /// Monthly aggregates of every overlay year; `orgidx` points back into the
    /// source year.
    pub fn multi_year_monthly(&mut self) -> Result<&BTreeMap<i32, TimeSeriesTable>> {
        let monthly = match self.cache.multi_year_monthly.take() {
            Some(monthly) => monthly,
            None => {
                let slices = self.multi_year()?.clone();
                let mut monthly = BTreeMap::new();
                for (year, slice) in &slices {
                    monthly.insert(
                        *year,
                        to_monthly(slice, &mut self.metas, &self.index_meta, Some(*year))?,
                    );
                }
                monthly
            }
        };
        Ok(self.cache.multi_year_monthly.insert(monthly))
    }

    /// The given days, each moved onto 1 January of the reference year
    pub fn days(&mut self, dates: &[NaiveDate]) -> &IndexMap<String, TimeSeriesTable> {
        let days = match self.cache.days.take() {
            Some((cached, days)) if cached == dates => days,
            _ => day_slices(&self.table, dates, self.config.reference_year),
        };
        &self.cache.days.insert((dates.to_vec(), days)).1
    }

    pub fn extremes(&self) -> IndexMap<String, Extremes> {
        extremes(&self.table)
    }

    /// Replace values above `cut_off` by interpolation. Returns the number of
    /// replaced values.
    pub fn clean_outliers(&mut self, cut_off: f64) -> usize {
        if absolute_max(&self.table).is_none_or(|max| cut_off >= max) {
            debug!(cut_off, "cut-off above every value");
            return 0;
        }
        let replaced = clean_outliers(&mut self.table, cut_off);
        if replaced > 0 {
            info!(replaced, cut_off, "outliers replaced");
            self.invalidate();
        }
        replaced
    }

    /// Add smoothed lines. Without a window the default start window for the
    /// table length is used.
    pub fn smooth(&mut self, window: Option<usize>) -> Result<()> {
        remove_smoothed(&mut self.table, &mut self.metas);
        let window = window.unwrap_or_else(|| default_window(self.table.len()).1);
        add_smoothed(
            &mut self.table,
            &mut self.metas,
            window,
            self.config.smoothing_order,
        )?;
        self.invalidate();
        Ok(())
    }

    pub fn remove_smoothing(&mut self) {
        remove_smoothed(&mut self.table, &mut self.metas);
        self.invalidate();
    }

    /// Put the outdoor air temperature of a weather table next to the meter
    /// data.
    ///
    /// The temperature is matched by timestamp, or interpolated when the meter
    /// data is finer than hourly. Returns the name of the new column.
    pub fn overlay_temperature(&mut self, weather: &TimeSeriesTable) -> Result<String> {
        let title = title_for_code(AIR_TEMPERATURE).unwrap_or(AIR_TEMPERATURE);
        let source = if weather.has_column(title) {
            title
        } else {
            AIR_TEMPERATURE
        };
        let name = if self.table.has_column(TEMPERATURE_COLUMN)
            && !self.weather_columns.iter().any(|c| c == TEMPERATURE_COLUMN)
        {
            TEMPERATURE_FALLBACK
        } else {
            TEMPERATURE_COLUMN
        };

        let mut meta = ColumnMeta::with_unit(name, TEMPERATURE_UNIT);
        meta.long_title = title.to_string();
        self.insert_weather_column(weather, source, name, meta)?;
        Ok(name.to_string())
    }

    /// Put weather columns under their German titles next to the meter data.
    pub fn overlay_weather(&mut self, weather: &TimeSeriesTable, titles: &[&str]) -> Result<()> {
        for title in titles {
            if !is_weather_title(title) {
                return Err(PipelineError::UnknownColumn(title.to_string()));
            }
            let unit = all_parameters()
                .into_iter()
                .find(|p| p.title == *title)
                .and_then(|p| p.unit.as_deref())
                .and_then(normalize_unit);
            let mut meta = ColumnMeta::plain(title);
            meta.set_unit(unit);
            self.insert_weather_column(weather, title, title, meta)?;
        }
        Ok(())
    }

    fn insert_weather_column(
        &mut self,
        weather: &TimeSeriesTable,
        source: &str,
        name: &str,
        meta: ColumnMeta,
    ) -> Result<()> {
        let interpolate = self.index_meta.is_finer_than_hourly();
        let values = reindex_column(weather, source, self.table.index(), interpolate)?;
        let matched = values.iter().filter(|v| v.is_some()).count();
        debug!(
            column = name,
            matched,
            interpolate,
            spacing = ?spacing(weather),
            "weather column reindexed"
        );
        if matched == 0 {
            warn!("'{}' does not overlap the meter data", source);
        }

        self.table.insert_column(name, values)?;
        self.metas.insert(name.to_string(), meta);
        if !self.weather_columns.iter().any(|c| c == name) {
            self.weather_columns.push(name.to_string());
        }
        self.reassign_axes();
        self.invalidate();
        Ok(())
    }

    /// Drop every overlaid weather column.
    pub fn remove_weather(&mut self) {
        for column in std::mem::take(&mut self.weather_columns) {
            self.table.remove_column(&column);
            self.metas.shift_remove(&column);
        }
        self.reassign_axes();
        self.invalidate();
    }

    fn reassign_axes(&mut self) {
        let mut table_metas = self.table_metas();
        self.axes = apply_axes(&mut table_metas);
        for (key, meta) in table_metas {
            self.metas.insert(key, meta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::raw::RawIndex;
    use crate::table::test_util::*;
    use chrono::{Datelike, NaiveDateTime, TimeDelta};
    use meter_model::{AxisId, IntervalClass};

    fn raw(
        index: Vec<NaiveDateTime>,
        headers: &[&str],
        units: &[Option<&str>],
        columns: &[Vec<Option<f64>>],
    ) -> RawTable {
        let rows = (0..index.len())
            .map(|r| columns.iter().map(|c| c[r]).collect())
            .collect();
        RawTable {
            index: RawIndex::Timestamps(index),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            units: units.iter().map(|u| u.map(str::to_string)).collect(),
            rows,
        }
    }

    fn quarter_hour_session() -> Session {
        let index = range(ts(2023, 3, 1, 0, 0), 15, 96 * 3);
        let energy: Vec<Option<f64>> = (0..index.len()).map(|i| Some(1.0 + (i % 4) as f64)).collect();
        let power: Vec<Option<f64>> = (0..index.len()).map(|i| Some((i % 8) as f64)).collect();
        Session::from_raw(
            raw(index, &["1-1:1.29.0", "Leistung"], &[None, Some("kW")], &[energy, power]),
            PipelineConfig {
                stall_as_gap: false,
                ..PipelineConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_from_raw_keys_columns_by_title() {
        let session = quarter_hour_session();
        let names: Vec<&str> = session.table().column_names().collect();
        let energy_key = names[0];
        assert_ne!(energy_key, "1-1:1.29.0");
        assert_eq!(session.metas()[energy_key].orig_title, "1-1:1.29.0");
        assert_eq!(session.metas()[energy_key].unit_data.as_deref(), Some(" kWh"));
        assert_eq!(session.metas()["Leistung"].unit_graph.as_deref(), Some(" kW"));
        assert_eq!(session.index_meta().interval_class, IntervalClass::Min15);
        // kWh is charted as kW, so both share the primary axis
        assert_eq!(session.axes().units, vec![" kW"]);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_hourly_view_is_cached_and_derived() {
        let mut session = quarter_hour_session();
        let energy_key = session.table().column_names().next().unwrap().to_string();
        let hourly = session.hourly().unwrap().clone();
        assert_eq!(hourly.len(), 72);
        let energy = hourly.column(&format!("{} *h", energy_key)).unwrap();
        assert_eq!(energy[0], Some(1.0 + 2.0 + 3.0 + 4.0));
        let power = hourly.column("Leistung *h").unwrap();
        assert_eq!(power[0], Some(1.5));
        assert!(session.metas().contains_key("Leistung *h"));
        assert_eq!(session.hourly().unwrap(), &hourly);
    }

    #[test]
    fn test_monthly_summary() {
        let mut session = quarter_hour_session();
        let summary = session.monthly_summary().unwrap();
        assert_eq!(summary.labels, vec!["Summe", "März"]);
        let power = &summary.columns["Leistung *h"];
        assert_eq!(power[0], Some(3.5));
    }

    #[test]
    fn test_missing_timestamps_are_fatal() {
        let raw = RawTable {
            index: RawIndex::Text(vec!["01.01.2023 00:00".to_string(), "kaputt".to_string()]),
            headers: vec!["a".to_string()],
            units: vec![None],
            rows: vec![vec![Some(1.0)], vec![Some(2.0)]],
        };
        let err = Session::from_raw(raw, PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedTimestamp { row: 1, .. }));
    }

    #[test]
    fn test_multi_year_views() {
        let index = range(ts(2021, 1, 1, 0, 0), 60, 2 * 8760);
        let n = index.len();
        let values: Vec<Option<f64>> = (0..n).map(|i| Some((i % 24) as f64 + 1.0)).collect();
        let mut session = Session::from_raw(
            raw(index, &["Bezug"], &[Some("kWh")], &[values]),
            PipelineConfig {
                stall_as_gap: false,
                reference_year: 2020,
                ..PipelineConfig::default()
            },
        )
        .unwrap();
        assert_eq!(session.years(), &[2021, 2022]);

        let slices = session.multi_year().unwrap().clone();
        let y2021 = &slices[&2021];
        assert!(y2021.has_column("Bezug 2021"));
        assert_eq!(y2021.index()[0].year(), 2020);
        assert_eq!(y2021.orgidx()[0].year(), 2021);
        assert!(session.metas().contains_key("Bezug 2022"));

        let monthly = session.multi_year_monthly().unwrap().clone();
        let jan_2022 = &monthly[&2022];
        assert_eq!(jan_2022.index()[0], ts(2020, 1, 15, 0, 0));
        assert_eq!(jan_2022.orgidx()[0], ts(2022, 1, 15, 0, 0));

        let curves = session.multi_year_duration_curves().unwrap();
        assert_eq!(curves[&2021].column("Bezug 2021").unwrap()[0], Some(24.0));
    }

    #[test]
    fn test_days() {
        let mut session = quarter_hour_session();
        let days = session.days(&[NaiveDate::from_ymd_opt(2023, 3, 2).unwrap()]).clone();
        let day = &days["02. Mar 2023"];
        assert_eq!(day.len(), 96);
        assert_eq!(day.index()[0], ts(2020, 1, 1, 0, 0));
        assert_eq!(day.orgidx()[0], ts(2023, 3, 2, 0, 0));
    }

    #[test]
    fn test_overlay_and_remove_temperature() {
        let mut session = quarter_hour_session();
        let start = ts(2023, 3, 1, 0, 0);
        let weather_index: Vec<NaiveDateTime> =
            (0..72).map(|h| start + TimeDelta::hours(h)).collect();
        let temps: Vec<Option<f64>> = (0..72).map(|h| Some(h as f64)).collect();
        let weather = TimeSeriesTable::new(
            weather_index,
            IndexMap::from([("Lufttemperatur in 2 m Höhe".to_string(), temps)]),
        )
        .unwrap();
        session.hourly().unwrap();

        let name = session.overlay_temperature(&weather).unwrap();
        assert_eq!(name, TEMPERATURE_COLUMN);
        let column = session.table().column(TEMPERATURE_COLUMN).unwrap();
        // quarter-hourly rows between the hourly readings are interpolated
        assert!((column[2].unwrap() - 0.5).abs() < 1e-9);
        assert!(session.metas()[TEMPERATURE_COLUMN].is_mean());
        assert_eq!(session.axes().units, vec![" kW", " °C"]);
        assert_eq!(session.metas()[TEMPERATURE_COLUMN].y_axis, Some(AxisId::from_rank(1)));
        assert!(session.cache.hourly.is_none());

        session.remove_weather();
        assert!(!session.table().has_column(TEMPERATURE_COLUMN));
        assert_eq!(session.axes().units, vec![" kW"]);
    }

    #[test]
    fn test_smoothing_and_outliers() {
        let mut session = quarter_hour_session();
        session.smooth(Some(9)).unwrap();
        assert!(session.table().has_column("Leistung (glatt)"));
        session.smooth(Some(9)).unwrap();
        let smoothed = session
            .table()
            .column_names()
            .filter(|c| c.ends_with("(glatt)"))
            .count();
        assert_eq!(smoothed, 2);
        session.remove_smoothing();
        assert!(!session.table().has_column("Leistung (glatt)"));

        assert_eq!(session.clean_outliers(1000.0), 0);
        assert!(session.clean_outliers(6.5) > 0);
        let max = session.extremes()["Leistung"].max.value;
        assert!(max <= 6.5 + 1e-9);
    }
}
