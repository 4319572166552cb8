//! Weather observations from external providers, merged into one table.
//!
//! The provider clients themselves live outside this crate; they only have to
//! implement [`WeatherProvider`].

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use indexmap::IndexMap;
use meter_model::weather::parameter::{all_parameters, title_for_code};
use meter_model::weather::{Provider, Station};
use tracing::{debug, info, warn};

use crate::general::config::WeatherConfig;
use crate::general::error::{PipelineError, Result};
use crate::pipeline::gap_fill::{Akima, seconds_axis};
use crate::table::{Column, TimeSeriesTable};

/// A DWD station this much farther away than the nearest candidate is still preferred
const DWD_PREFERENCE_KM: f64 = 3.6;

pub trait WeatherProvider {
    fn provider(&self) -> Provider;

    fn stations(&self) -> Result<Vec<Station>>;

    /// Hourly observations of `station`, one column per provider code
    fn observations(
        &self,
        station: &Station,
        parameters: &[&str],
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<TimeSeriesTable>;
}

/// Observations of one parameter from the station that was picked for it
#[derive(Debug, Clone, PartialEq)]
pub struct StationMatch {
    pub station: Station,
    pub distance_km: f64,
    /// Share of the expected hourly values that are present
    pub coverage: f64,
    pub table: TimeSeriesTable,
}

/// Number of hourly values between `start` and `end`, both included
pub fn expected_hours(start: NaiveDateTime, end: NaiveDateTime) -> usize {
    usize::try_from((end - start).num_hours() + 1).unwrap_or(0)
}

/// Nearest station within reach whose observations of `parameter` cover at
/// least `data_threshold` of the window.
pub fn closest_station(
    provider: &dyn WeatherProvider,
    latitude: f64,
    longitude: f64,
    parameter: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    config: &WeatherConfig,
) -> Result<Option<StationMatch>> {
    let mut candidates: Vec<(f64, Station)> = provider
        .stations()?
        .into_iter()
        .map(|s| (s.distance_km(latitude, longitude), s))
        .filter(|(d, _)| *d <= config.max_station_distance_km)
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let expected = expected_hours(start, end).max(1);
    for (distance_km, station) in candidates {
        let table = provider.observations(&station, &[parameter], start, end)?;
        let present = table
            .column(parameter)
            .map_or(0, |values| values.iter().filter(|v| v.is_some()).count());
        let coverage = present as f64 / expected as f64;
        if coverage < config.data_threshold {
            debug!(
                station = %station.key(),
                coverage,
                "station skipped for {}", parameter
            );
            continue;
        }
        info!(
            "{}: station {} ({}) at {:.1} km, coverage {:.0}%",
            parameter,
            station.name,
            station.key(),
            distance_km,
            coverage * 100.0
        );
        return Ok(Some(StationMatch {
            station,
            distance_km,
            coverage,
            table,
        }));
    }
    Ok(None)
}

/// Rename provider codes to their German titles. Unknown codes are kept.
pub fn rename_to_titles(mut table: TimeSeriesTable) -> Result<TimeSeriesTable> {
    let codes: Vec<String> = table.column_names().map(str::to_string).collect();
    for code in codes {
        if let Some(title) = title_for_code(&code) {
            if title != code && !table.has_column(title) {
                table.rename_column(&code, title)?;
            }
        }
    }
    Ok(table)
}

/// Union of the indices; a column name already taken by an earlier table wins.
pub fn merge(tables: &[TimeSeriesTable]) -> Result<TimeSeriesTable> {
    let index: Vec<NaiveDateTime> = tables
        .iter()
        .flat_map(|t| t.index().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for table in tables {
        for (name, values) in table.columns() {
            if columns.contains_key(name) {
                debug!(column = %name, "duplicate weather column ignored");
                continue;
            }
            let mut merged = vec![None; index.len()];
            for (ts, value) in table.index().iter().zip(values) {
                if let Ok(p) = index.binary_search(ts) {
                    merged[p] = *value;
                }
            }
            columns.insert(name.clone(), merged);
        }
    }
    TimeSeriesTable::new(index, columns)
}

/// Window from 1 Jan of `first_year` to 31 Dec 23:59 of `last_year`
pub fn year_window(first_year: i32, last_year: i32) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let start = NaiveDate::from_ymd_opt(first_year, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));
    let end = NaiveDate::from_ymd_opt(last_year, 12, 31).and_then(|d| d.and_hms_opt(23, 59, 0));
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Ok((start, end)),
        _ => Err(PipelineError::Weather(format!(
            "Invalid year range {}..{}",
            first_year, last_year
        ))),
    }
}

pub fn clip_to_years(table: &TimeSeriesTable, first_year: i32, last_year: i32) -> TimeSeriesTable {
    table.filter_rows(|ts| (first_year..=last_year).contains(&ts.year()))
}

/// Weather table of a session plus the station used per column title
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherData {
    pub table: TimeSeriesTable,
    pub stations: IndexMap<String, (Station, f64)>,
}

/// Fetch the parameters with the given titles from every provider that offers
/// them and merge the results.
///
/// When several providers offer a title, the nearest station wins, but a DWD
/// station is taken if it is at most [`DWD_PREFERENCE_KM`] farther away.
pub fn fetch_weather(
    providers: &[&dyn WeatherProvider],
    latitude: f64,
    longitude: f64,
    titles: &[&str],
    years: (i32, i32),
    config: &WeatherConfig,
) -> Result<WeatherData> {
    let (start, end) = year_window(years.0, years.1)?;
    let parameters = all_parameters();

    let mut tables = Vec::new();
    let mut stations = IndexMap::new();
    for title in titles {
        let mut matches: Vec<(String, StationMatch)> = Vec::new();
        for provider in providers {
            let offered = parameters
                .iter()
                .filter(|p| p.title == *title && p.provider == provider.provider());
            for param in offered {
                if let Some(found) = closest_station(
                    *provider, latitude, longitude, &param.code, start, end, config,
                )? {
                    matches.push((param.code.clone(), found));
                }
            }
        }
        let Some((code, chosen)) = pick_station(matches) else {
            warn!("No station with enough data for '{}'", title);
            continue;
        };

        let mut table = chosen.table.clone();
        let extra: Vec<String> = table
            .column_names()
            .filter(|c| *c != code)
            .map(str::to_string)
            .collect();
        for column in extra {
            table.remove_column(&column);
        }
        table.rename_column(&code, title)?;
        stations.insert(title.to_string(), (chosen.station, chosen.distance_km));
        tables.push(table);
    }

    if tables.is_empty() {
        return Err(PipelineError::Weather(
            "No weather station delivered data".to_string(),
        ));
    }
    let table = clip_to_years(&merge(&tables)?, years.0, years.1);
    Ok(WeatherData { table, stations })
}

fn pick_station(matches: Vec<(String, StationMatch)>) -> Option<(String, StationMatch)> {
    let nearest = matches
        .iter()
        .map(|(_, m)| m.distance_km)
        .min_by(|a, b| a.total_cmp(b))?;
    let dwd = matches.iter().position(|(_, m)| {
        m.station.provider == Provider::Dwd && m.distance_km <= nearest + DWD_PREFERENCE_KM
    });
    let pos = dwd.or_else(|| matches.iter().position(|(_, m)| m.distance_km == nearest))?;
    matches.into_iter().nth(pos)
}

/// Values of `column` at the timestamps of `target`.
///
/// With `interpolate` the values are Akima-interpolated between the source
/// timestamps, otherwise only exact timestamp matches are taken.
pub fn reindex_column(
    source: &TimeSeriesTable,
    column: &str,
    target: &[NaiveDateTime],
    interpolate: bool,
) -> Result<Column> {
    let values = source
        .column(column)
        .ok_or_else(|| PipelineError::UnknownColumn(column.to_string()))?;

    if !interpolate {
        return Ok(target
            .iter()
            .map(|ts| source.position_of(ts).and_then(|p| values[p]))
            .collect());
    }

    let (Some(origin), Some(first_target)) = (source.index().first(), target.first()) else {
        return Ok(vec![None; target.len()]);
    };
    let origin = (*origin).min(*first_target);
    let offset = |ts: &NaiveDateTime| (*ts - origin).num_milliseconds() as f64 / 1000.0;
    let (xs, ys): (Vec<f64>, Vec<f64>) = source
        .index()
        .iter()
        .zip(values)
        .filter_map(|(ts, v)| v.map(|v| (offset(ts), v)))
        .unzip();
    let Some(akima) = Akima::new(xs, ys) else {
        return Ok(vec![None; target.len()]);
    };
    Ok(target.iter().map(|ts| akima.eval(offset(ts))).collect())
}

/// Timestamp spacing of a weather table, for logging
pub fn spacing(table: &TimeSeriesTable) -> Option<TimeDelta> {
    let xs = seconds_axis(table.index());
    let last = xs.last()?;
    (xs.len() > 1).then(|| TimeDelta::seconds((last / (xs.len() - 1) as f64).round() as i64))
}
