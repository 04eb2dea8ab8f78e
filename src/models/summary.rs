use crate::models::{Pollutant, Station, ThresholdRule};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// A statistic that may be missing. Absence is never reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evaluated<T> {
    Available { value: T },
    /// Some data exist but not enough to produce a valid result
    Insufficient { valid: usize, required: usize },
    NoData,
}

impl<T> Evaluated<T> {
    pub fn available(value: T) -> Self {
        Evaluated::Available { value }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Evaluated::Available { value } => Some(value),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Evaluated::Available { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Evaluated<U> {
        match self {
            Evaluated::Available { value } => Evaluated::Available { value: f(value) },
            Evaluated::Insufficient { valid, required } => {
                Evaluated::Insufficient { valid, required }
            }
            Evaluated::NoData => Evaluated::NoData,
        }
    }
}

impl Evaluated<f64> {
    /// Formats to one decimal, or a short marker when unavailable
    pub fn display(&self) -> String {
        match self {
            Evaluated::Available { value } => format!("{:.1}", value),
            Evaluated::Insufficient { .. } => "n.v.".to_string(),
            Evaluated::NoData => "n.d.".to_string(),
        }
    }
}

/// Outcome of one threshold rule: a flag for daily means, a count otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceedanceResult {
    Flag { exceeded: bool },
    Count { exceedances: u32, windows: u32 },
}

impl ExceedanceResult {
    pub fn exceeded(&self) -> bool {
        match self {
            ExceedanceResult::Flag { exceeded } => *exceeded,
            ExceedanceResult::Count { exceedances, .. } => *exceedances > 0,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            ExceedanceResult::Flag { exceeded } => u32::from(*exceeded),
            ExceedanceResult::Count { exceedances, .. } => *exceedances,
        }
    }
}

impl fmt::Display for ExceedanceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceedanceResult::Flag { exceeded: true } => write!(f, "yes"),
            ExceedanceResult::Flag { exceeded: false } => write!(f, "no"),
            ExceedanceResult::Count { exceedances, .. } => write!(f, "{}", exceedances),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdCheck {
    pub rule: ThresholdRule,
    pub result: Evaluated<ExceedanceResult>,
}

impl ThresholdCheck {
    pub fn exceeded(&self) -> bool {
        self.result.value().is_some_and(|r| r.exceeded())
    }

    pub fn display(&self) -> String {
        match &self.result {
            Evaluated::Available { value } => value.to_string(),
            Evaluated::Insufficient { .. } => "n.v.".to_string(),
            Evaluated::NoData => "n.d.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub station: Station,
    pub pollutant: Pollutant,
    pub date: NaiveDate,
    pub valid_hours: usize,
    pub daily_resolution: bool,
    pub min: Evaluated<f64>,
    pub max: Evaluated<f64>,
    pub mean: Evaluated<f64>,
    pub max_3h_mean: Evaluated<f64>,
    pub max_8h_mean: Evaluated<f64>,
    pub checks: Vec<ThresholdCheck>,
}

impl DailySummary {
    pub fn has_data(&self) -> bool {
        self.daily_resolution || self.valid_hours > 0
    }

    pub fn any_exceedance(&self) -> bool {
        self.checks.iter().any(|c| c.exceeded())
    }

    pub fn check(&self, rule_id: &str) -> Option<&ThresholdCheck> {
        self.checks.iter().find(|c| c.rule.id == rule_id)
    }
}

/// All station summaries of one pollutant for a province and day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantTable {
    pub pollutant: Pollutant,
    pub date: NaiveDate,
    pub rows: Vec<DailySummary>,
}

impl PollutantTable {
    pub fn new(pollutant: Pollutant, date: NaiveDate) -> Self {
        Self {
            pollutant,
            date,
            rows: Vec::new(),
        }
    }

    pub fn reporting_stations(&self) -> usize {
        self.rows.iter().filter(|r| r.has_data()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.reporting_stations() == 0
    }

    /// Rows with at least one exceedance for the given rule
    pub fn exceeding(&self, rule_id: &str) -> Vec<&DailySummary> {
        self.rows
            .iter()
            .filter(|r| r.check(rule_id).is_some_and(|c| c.exceeded()))
            .collect()
    }
}
