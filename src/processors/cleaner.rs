use crate::models::{HourlySeries, Measurement, Pollutant};
use crate::readers::{RawRecord, StationRegistry};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Row-level tallies from one cleaning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub total_rows: usize,
    pub accepted_rows: usize,
    pub null_values: usize,
    pub invalid_values: usize,
    pub negative_values: usize,
    pub invalid_timestamps: usize,
    pub outside_day: usize,
    pub invalid_station_ids: usize,
    pub unknown_stations: usize,
    pub unknown_pollutants: usize,
    pub duplicates: usize,
    pub daily_resolution_series: usize,
}

impl CleaningStats {
    pub fn rejected_rows(&self) -> usize {
        self.total_rows - self.accepted_rows - self.null_values
    }
}

pub type SeriesKey = (String, Pollutant);

/// Output of the cleaner: one series per station and pollutant seen on the day.
#[derive(Debug, Clone)]
pub struct CleanedData {
    pub date: NaiveDate,
    pub series: BTreeMap<SeriesKey, HourlySeries>,
    pub stats: CleaningStats,
}

impl CleanedData {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            series: BTreeMap::new(),
            stats: CleaningStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.values().all(HourlySeries::is_empty)
    }

    pub fn get(&self, station_id: &str, pollutant: Pollutant) -> Option<&HourlySeries> {
        self.series.get(&(station_id.to_string(), pollutant))
    }

    pub fn stations(&self) -> BTreeSet<&str> {
        self.series.keys().map(|(s, _)| s.as_str()).collect()
    }
}

pub struct Cleaner {
    date: NaiveDate,
}

impl Cleaner {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    /// Coerce raw rows into hourly series for the cleaner's day.
    ///
    /// With a registry, rows for stations not in it are dropped. Later rows
    /// for an already filled hour replace earlier ones.
    pub fn clean(&self, records: &[RawRecord], registry: Option<&StationRegistry>) -> CleanedData {
        let mut data = CleanedData::empty(self.date);
        let mut rows_per_series: BTreeMap<SeriesKey, SeriesRows> = BTreeMap::new();
        data.stats.total_rows = records.len();

        for record in records {
            let Some(station_id) = coerce_station_id(&record.station_id) else {
                data.stats.invalid_station_ids += 1;
                continue;
            };

            if registry.is_some_and(|r| r.get(&station_id).is_none()) {
                data.stats.unknown_stations += 1;
                continue;
            }

            let Some(pollutant) =
                coerce_u32(&record.variable_id).and_then(Pollutant::from_variable_id)
            else {
                data.stats.unknown_pollutants += 1;
                continue;
            };

            let Some(timestamp) = coerce_timestamp(&record.reftime) else {
                data.stats.invalid_timestamps += 1;
                continue;
            };

            if timestamp.date() != self.date {
                data.stats.outside_day += 1;
                continue;
            }

            // The station reported this pollutant even if the value is missing
            let key = (station_id.clone(), pollutant);
            let rows = rows_per_series.entry(key).or_default();
            rows.rows += 1;

            let value = match coerce_value(&record.value) {
                ValueState::Missing => {
                    data.stats.null_values += 1;
                    continue;
                }
                ValueState::Invalid => {
                    data.stats.invalid_values += 1;
                    continue;
                }
                ValueState::Valid(v) if v < 0.0 => {
                    data.stats.negative_values += 1;
                    continue;
                }
                ValueState::Valid(v) => v,
            };

            rows.readings.push(Measurement::new(station_id, pollutant, timestamp, value));
        }

        for ((station_id, pollutant), rows) in rows_per_series {
            let series = self.build_series(&station_id, pollutant, &rows, &mut data.stats);
            data.series.insert((station_id, pollutant), series);
        }

        debug!(
            date = %self.date,
            rows = data.stats.total_rows,
            accepted = data.stats.accepted_rows,
            series = data.series.len(),
            "Cleaned datastore rows"
        );

        data
    }

    fn build_series(
        &self,
        station_id: &str,
        pollutant: Pollutant,
        rows: &SeriesRows,
        stats: &mut CleaningStats,
    ) -> HourlySeries {
        if let Some(value) = rows.daily_value(pollutant) {
            stats.accepted_rows += 1;
            stats.daily_resolution_series += 1;
            return HourlySeries::from_daily_value(station_id, pollutant, self.date, value);
        }

        let mut series = HourlySeries::new(station_id.to_string(), pollutant, self.date);
        for reading in &rows.readings {
            if series.set(reading.hour(), reading.value) {
                stats.duplicates += 1;
            } else {
                stats.accepted_rows += 1;
            }
        }
        series
    }
}

/// Every in-day row seen for one series, and the usable readings among them.
#[derive(Debug, Default)]
struct SeriesRows {
    rows: usize,
    readings: Vec<Measurement>,
}

impl SeriesRows {
    /// Particulate matter reported once per day arrives as a single midnight
    /// row. An hourly series with nulls for the other hours is not one.
    fn daily_value(&self, pollutant: Pollutant) -> Option<f64> {
        match self.readings.as_slice() {
            [only] if self.rows == 1 && pollutant.may_report_daily() => {
                (only.hour() == 0 && only.timestamp.minute() == 0).then_some(only.value)
            }
            _ => None,
        }
    }
}

/// Ids may arrive as strings or numbers, including integral floats
fn coerce_station_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                Some(i.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| format!("{:.0}", f))
            }
        }
        _ => None,
    }
}

fn coerce_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

#[derive(Debug, PartialEq)]
enum ValueState {
    Missing,
    Invalid,
    Valid(f64),
}

fn coerce_value(value: &Value) -> ValueState {
    let parsed = match value {
        Value::Null => return ValueState::Missing,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return ValueState::Missing;
            }
            // Decimal commas show up in some exports
            s.replace(',', ".").parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => ValueState::Valid(v),
        _ => ValueState::Invalid,
    }
}
