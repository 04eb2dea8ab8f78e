use crate::models::{HourlySeries, Pollutant};
use crate::processors::cleaner::{CleanedData, CleaningStats};
use crate::utils::constants::*;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub stats: CleaningStats,
    pub violations: Vec<DataViolation>,
    pub station_statistics: BTreeMap<String, StationStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataViolation {
    pub station_id: String,
    pub pollutant: Pollutant,
    pub hour: Option<usize>,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationType {
    Implausible,
    SuspiciousJump,
    LowCoverage,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StationStatistics {
    pub series: usize,
    pub valid_hours: usize,
    pub daily_values: usize,
    pub low_coverage_series: usize,
}

/// Values above these are treated as instrument faults
fn plausible_max(pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Pm10 | Pollutant::Pm25 => MAX_PLAUSIBLE_PM,
        Pollutant::No2 => MAX_PLAUSIBLE_NO2,
        Pollutant::So2 => MAX_PLAUSIBLE_SO2,
        Pollutant::Co => MAX_PLAUSIBLE_CO,
        Pollutant::O3 => MAX_PLAUSIBLE_O3,
        Pollutant::Benzene => MAX_PLAUSIBLE_BENZENE,
    }
}

/// Hour-to-hour changes larger than this are flagged
fn jump_threshold(pollutant: Pollutant) -> f64 {
    match pollutant {
        Pollutant::Co => CO_JUMP_THRESHOLD,
        Pollutant::Benzene => BENZENE_JUMP_THRESHOLD,
        _ => DEFAULT_JUMP_THRESHOLD,
    }
}

pub struct IntegrityChecker {
    required_hours: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            required_hours: MIN_VALID_HOURS,
        }
    }

    pub fn with_required_hours(required_hours: usize) -> Self {
        Self { required_hours }
    }

    /// Check plausibility and completeness of cleaned series.
    /// Violations are reported, never dropped: real monitoring data has
    /// sensor faults that should be visible in the bulletin.
    pub fn check_integrity(&self, data: &CleanedData) -> IntegrityReport {
        let mut report = IntegrityReport {
            stats: data.stats.clone(),
            violations: Vec::new(),
            station_statistics: BTreeMap::new(),
        };

        for series in data.series.values() {
            let stats = report
                .station_statistics
                .entry(series.station_id.clone())
                .or_default();
            stats.series += 1;
            stats.valid_hours += series.valid_hours();

            if series.is_daily() {
                stats.daily_values += 1;
            } else if series.valid_hours() < self.required_hours {
                stats.low_coverage_series += 1;
            }

            self.check_series(series, &mut report.violations);
        }

        report
    }

    fn check_series(&self, series: &HourlySeries, violations: &mut Vec<DataViolation>) {
        let pollutant = series.pollutant;

        if let Some(value) = series.daily_value {
            if value > plausible_max(pollutant) {
                violations.push(self.violation(
                    series,
                    None,
                    ViolationType::Implausible,
                    format!(
                        "daily value {:.1} {} exceeds plausible maximum",
                        value,
                        pollutant.units()
                    ),
                ));
            }
            return;
        }

        if !series.is_empty() && series.valid_hours() < self.required_hours {
            violations.push(self.violation(
                series,
                None,
                ViolationType::LowCoverage,
                format!(
                    "only {} of 24 hourly values valid (need {})",
                    series.valid_hours(),
                    self.required_hours
                ),
            ));
        }

        let mut previous: Option<(usize, f64)> = None;
        for (hour, slot) in series.hours.iter().enumerate() {
            let Some(value) = *slot else {
                continue;
            };

            if value > plausible_max(pollutant) {
                violations.push(self.violation(
                    series,
                    Some(hour),
                    ViolationType::Implausible,
                    format!("{:.1} {} exceeds plausible maximum", value, pollutant.units()),
                ));
            }

            // Only adjacent hours are compared; gaps reset the comparison
            if let Some((prev_hour, prev_value)) = previous {
                let jump = (value - prev_value).abs();
                if prev_hour + 1 == hour && jump > jump_threshold(pollutant) {
                    violations.push(self.violation(
                        series,
                        Some(hour),
                        ViolationType::SuspiciousJump,
                        format!(
                            "jumped {:.1} {} from {:02}:00 to {:02}:00",
                            jump,
                            pollutant.units(),
                            prev_hour,
                            hour
                        ),
                    ));
                }
            }
            previous = Some((hour, value));
        }
    }

    fn violation(
        &self,
        series: &HourlySeries,
        hour: Option<usize>,
        violation_type: ViolationType,
        details: String,
    ) -> DataViolation {
        DataViolation {
            station_id: series.station_id.clone(),
            pollutant: series.pollutant,
            hour,
            violation_type,
            details,
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let stats = &report.stats;
        let mut summary = String::new();

        summary.push_str("=== Data Integrity Report ===\n");
        summary.push_str(&format!("Total Rows: {}\n", stats.total_rows));
        summary.push_str(&format!(
            "Accepted Rows: {} ({:.1}%)\n",
            stats.accepted_rows,
            percentage(stats.accepted_rows, stats.total_rows)
        ));
        summary.push_str(&format!("Missing Values: {}\n", stats.null_values));
        summary.push_str(&format!(
            "Rejected Rows: {} (invalid value {}, negative {}, bad timestamp {}, outside day {}, \
             unknown station {}, unknown pollutant {}, duplicate hour {})\n",
            stats.rejected_rows(),
            stats.invalid_values,
            stats.negative_values,
            stats.invalid_timestamps,
            stats.outside_day,
            stats.unknown_stations + stats.invalid_station_ids,
            stats.unknown_pollutants,
            stats.duplicates
        ));
        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. Station {} {}: {}\n",
                    i + 1,
                    violation.station_id,
                    violation.pollutant,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}
