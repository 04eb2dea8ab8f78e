//! Regulatory thresholds (Directive 2008/50/EC, D.Lgs. 155/2010).
//!
//! Every comparison is strict: a value equal to the limit is not an
//! exceedance.

use crate::models::Pollutant;
use serde::Serialize;
use std::fmt;

/// How hourly values are reduced before comparing against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "hours", rename_all = "snake_case")]
pub enum Aggregation {
    /// Each valid hour is compared individually; the result is a count of hours.
    HourlyValue,
    /// Mean of the day; the result is a single flag.
    DailyMean,
    /// Every hour of a window of consecutive hours must exceed; the result
    /// counts windows.
    Sustained(usize),
    /// Moving average over consecutive hours; the result counts windows.
    MovingAverage(usize),
}

impl Aggregation {
    pub fn describe(&self) -> String {
        match self {
            Aggregation::HourlyValue => "hourly value".to_string(),
            Aggregation::DailyMean => "daily mean".to_string(),
            Aggregation::Sustained(h) => format!("{} consecutive hours", h),
            Aggregation::MovingAverage(h) => format!("{}-hour moving average", h),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    LimitValue,
    TargetValue,
    InformationThreshold,
    AlertThreshold,
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThresholdKind::LimitValue => "limit value",
            ThresholdKind::TargetValue => "target value",
            ThresholdKind::InformationThreshold => "information threshold",
            ThresholdKind::AlertThreshold => "alert threshold",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdRule {
    pub id: &'static str,
    pub pollutant: Pollutant,
    pub kind: ThresholdKind,
    pub aggregation: Aggregation,
    pub limit: f64,
}

impl ThresholdRule {
    pub fn is_flag(&self) -> bool {
        matches!(self.aggregation, Aggregation::DailyMean)
    }

    /// e.g. "NO2 alert threshold: 400 µg/m³ over 3 consecutive hours"
    pub fn describe(&self) -> String {
        format!(
            "{} {}: {} {} ({})",
            self.pollutant.display_name(),
            self.kind,
            self.limit,
            self.pollutant.units(),
            self.aggregation.describe()
        )
    }
}

pub const REGULATORY_RULES: [ThresholdRule; 10] = [
    ThresholdRule {
        id: "pm10_daily_limit",
        pollutant: Pollutant::Pm10,
        kind: ThresholdKind::LimitValue,
        aggregation: Aggregation::DailyMean,
        limit: 50.0,
    },
    ThresholdRule {
        id: "no2_hourly_limit",
        pollutant: Pollutant::No2,
        kind: ThresholdKind::LimitValue,
        aggregation: Aggregation::HourlyValue,
        limit: 200.0,
    },
    ThresholdRule {
        id: "no2_alert",
        pollutant: Pollutant::No2,
        kind: ThresholdKind::AlertThreshold,
        aggregation: Aggregation::Sustained(3),
        limit: 400.0,
    },
    ThresholdRule {
        id: "so2_hourly_limit",
        pollutant: Pollutant::So2,
        kind: ThresholdKind::LimitValue,
        aggregation: Aggregation::HourlyValue,
        limit: 350.0,
    },
    ThresholdRule {
        id: "so2_daily_limit",
        pollutant: Pollutant::So2,
        kind: ThresholdKind::LimitValue,
        aggregation: Aggregation::DailyMean,
        limit: 125.0,
    },
    ThresholdRule {
        id: "so2_alert",
        pollutant: Pollutant::So2,
        kind: ThresholdKind::AlertThreshold,
        aggregation: Aggregation::Sustained(3),
        limit: 500.0,
    },
    ThresholdRule {
        id: "co_8h_limit",
        pollutant: Pollutant::Co,
        kind: ThresholdKind::LimitValue,
        aggregation: Aggregation::MovingAverage(8),
        limit: 10.0,
    },
    ThresholdRule {
        id: "o3_8h_target",
        pollutant: Pollutant::O3,
        kind: ThresholdKind::TargetValue,
        aggregation: Aggregation::MovingAverage(8),
        limit: 120.0,
    },
    ThresholdRule {
        id: "o3_information",
        pollutant: Pollutant::O3,
        kind: ThresholdKind::InformationThreshold,
        aggregation: Aggregation::HourlyValue,
        limit: 180.0,
    },
    ThresholdRule {
        id: "o3_alert",
        pollutant: Pollutant::O3,
        kind: ThresholdKind::AlertThreshold,
        aggregation: Aggregation::Sustained(3),
        limit: 240.0,
    },
];

pub fn rules_for(pollutant: Pollutant) -> impl Iterator<Item = &'static ThresholdRule> {
    REGULATORY_RULES
        .iter()
        .filter(move |r| r.pollutant == pollutant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_per_pollutant() {
        assert_eq!(rules_for(Pollutant::Pm10).count(), 1);
        assert_eq!(rules_for(Pollutant::No2).count(), 2);
        assert_eq!(rules_for(Pollutant::So2).count(), 3);
        assert_eq!(rules_for(Pollutant::Co).count(), 1);
        assert_eq!(rules_for(Pollutant::O3).count(), 3);
        assert_eq!(rules_for(Pollutant::Pm25).count(), 0);
        assert_eq!(rules_for(Pollutant::Benzene).count(), 0);
    }

    #[test]
    fn test_rule_ids_unique() {
        let mut ids: Vec<_> = REGULATORY_RULES.iter().map(|r| r.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), REGULATORY_RULES.len());
    }

    #[test]
    fn test_describe() {
        let rule = rules_for(Pollutant::No2)
            .find(|r| r.kind == ThresholdKind::AlertThreshold)
            .unwrap();
        assert_eq!(
            rule.describe(),
            "NO2 alert threshold: 400 µg/m³ (3 consecutive hours)"
        );
        assert!(!rule.is_flag());
    }
}
