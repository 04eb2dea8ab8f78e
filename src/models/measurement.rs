use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pollutant {
    Pm10,
    Pm25,
    No2,
    So2,
    Co,
    O3,
    Benzene,
}

impl Pollutant {
    pub const ALL: [Pollutant; 7] = [
        Pollutant::Pm10,
        Pollutant::Pm25,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::Co,
        Pollutant::So2,
        Pollutant::Benzene,
    ];

    /// Parameter identifier used by the regional datastore
    pub fn variable_id(&self) -> u32 {
        match self {
            Pollutant::So2 => 1,
            Pollutant::Pm10 => 5,
            Pollutant::O3 => 7,
            Pollutant::No2 => 8,
            Pollutant::Co => 10,
            Pollutant::Benzene => 20,
            Pollutant::Pm25 => 111,
        }
    }

    pub fn from_variable_id(id: u32) -> Option<Self> {
        Self::ALL.iter().find(|p| p.variable_id() == id).copied()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "PM10",
            Pollutant::Pm25 => "PM2.5",
            Pollutant::No2 => "NO2",
            Pollutant::So2 => "SO2",
            Pollutant::Co => "CO",
            Pollutant::O3 => "O3",
            Pollutant::Benzene => "Benzene",
        }
    }

    pub fn units(&self) -> &'static str {
        match self {
            Pollutant::Co => "mg/m³",
            _ => "µg/m³",
        }
    }

    /// Particulate matter is commonly published as a single daily value
    pub fn may_report_daily(&self) -> bool {
        matches!(self, Pollutant::Pm10 | Pollutant::Pm25)
    }

    /// Short lowercase key used in file names and JSON output
    pub fn slug(&self) -> &'static str {
        match self {
            Pollutant::Pm10 => "pm10",
            Pollutant::Pm25 => "pm25",
            Pollutant::No2 => "no2",
            Pollutant::So2 => "so2",
            Pollutant::Co => "co",
            Pollutant::O3 => "o3",
            Pollutant::Benzene => "c6h6",
        }
    }
}

impl fmt::Display for Pollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One hourly reading after type coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub station_id: String,
    pub pollutant: Pollutant,
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Measurement {
    pub fn new(
        station_id: String,
        pollutant: Pollutant,
        timestamp: NaiveDateTime,
        value: f64,
    ) -> Self {
        Self {
            station_id,
            pollutant,
            timestamp,
            value,
        }
    }

    pub fn hour(&self) -> usize {
        self.timestamp.hour() as usize
    }
}

/// Hourly slots for one station, pollutant and day.
///
/// Slot `h` holds the reading timestamped `h:00`. `daily_value` is set when
/// the source reports the pollutant once per day rather than hourly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySeries {
    pub station_id: String,
    pub pollutant: Pollutant,
    pub date: NaiveDate,
    pub hours: [Option<f64>; HOURS_PER_DAY],
    pub daily_value: Option<f64>,
}

impl HourlySeries {
    pub fn new(station_id: String, pollutant: Pollutant, date: NaiveDate) -> Self {
        Self {
            station_id,
            pollutant,
            date,
            hours: [None; HOURS_PER_DAY],
            daily_value: None,
        }
    }

    pub fn from_hours(
        station_id: &str,
        pollutant: Pollutant,
        date: NaiveDate,
        hours: [Option<f64>; HOURS_PER_DAY],
    ) -> Self {
        Self {
            station_id: station_id.to_string(),
            pollutant,
            date,
            hours,
            daily_value: None,
        }
    }

    pub fn from_daily_value(
        station_id: &str,
        pollutant: Pollutant,
        date: NaiveDate,
        value: f64,
    ) -> Self {
        let mut series = Self::new(station_id.to_string(), pollutant, date);
        series.daily_value = Some(value);
        series
    }

    /// Stores a reading, returning true if the slot was already occupied
    pub fn set(&mut self, hour: usize, value: f64) -> bool {
        let slot = &mut self.hours[hour];
        let replaced = slot.is_some();
        *slot = Some(value);
        replaced
    }

    pub fn valid_hours(&self) -> usize {
        self.hours.iter().filter(|v| v.is_some()).count()
    }

    pub fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.hours.iter().filter_map(|v| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.daily_value.is_none() && self.valid_hours() == 0
    }

    pub fn is_daily(&self) -> bool {
        self.daily_value.is_some()
    }
}
