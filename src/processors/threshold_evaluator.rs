use crate::models::{
    rules_for, Aggregation, DailySummary, Evaluated, ExceedanceResult, HourlySeries, Pollutant,
    PollutantTable, Station, ThresholdCheck, ThresholdRule, HOURS_PER_DAY,
};
use crate::processors::cleaner::CleanedData;
use crate::processors::rolling::{
    count_above, longest_valid_run, max_defined, moving_averages, window_minimums,
};
use crate::utils::constants::DEFAULT_MIN_COVERAGE;
use tracing::debug;

/// Reduces hourly series to daily statistics and regulatory verdicts.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdEvaluator {
    min_coverage: f64,
}

impl ThresholdEvaluator {
    pub fn new() -> Self {
        Self {
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }

    pub fn with_min_coverage(min_coverage: f64) -> Self {
        Self {
            min_coverage: min_coverage.clamp(0.0, 1.0),
        }
    }

    /// Valid hours needed for a daily mean: 18 at the default 75%
    pub fn required_hours(&self) -> usize {
        let hours = (self.min_coverage * HOURS_PER_DAY as f64).ceil() as usize;
        hours.clamp(1, HOURS_PER_DAY)
    }

    pub fn daily_mean(&self, series: &HourlySeries) -> Evaluated<f64> {
        if let Some(value) = series.daily_value {
            return Evaluated::available(value);
        }

        let valid = series.valid_hours();
        if valid == 0 {
            return Evaluated::NoData;
        }

        let required = self.required_hours();
        if valid < required {
            return Evaluated::Insufficient { valid, required };
        }

        Evaluated::available(series.valid_values().sum::<f64>() / valid as f64)
    }

    pub fn evaluate_rule(
        &self,
        rule: &ThresholdRule,
        series: &HourlySeries,
    ) -> Evaluated<ExceedanceResult> {
        match rule.aggregation {
            Aggregation::DailyMean => self.daily_mean(series).map(|mean| ExceedanceResult::Flag {
                exceeded: mean > rule.limit,
            }),
            Aggregation::HourlyValue => {
                let valid = series.valid_hours();
                if valid == 0 {
                    return Evaluated::NoData;
                }
                let exceedances = series.valid_values().filter(|v| *v > rule.limit).count();
                Evaluated::available(ExceedanceResult::Count {
                    exceedances: exceedances as u32,
                    windows: valid as u32,
                })
            }
            Aggregation::Sustained(width) => {
                windowed_count(&series.hours, width, rule.limit, window_minimums)
            }
            Aggregation::MovingAverage(width) => {
                windowed_count(&series.hours, width, rule.limit, moving_averages)
            }
        }
    }

    /// Statistics and all applicable rule checks for one station series
    pub fn summarize(&self, station: &Station, series: &HourlySeries) -> DailySummary {
        let checks = rules_for(series.pollutant)
            .map(|rule| ThresholdCheck {
                rule: *rule,
                result: self.evaluate_rule(rule, series),
            })
            .collect();

        let (min, max) = match series.daily_value {
            Some(value) => (Evaluated::available(value), Evaluated::available(value)),
            None => (extreme(series, f64::min), extreme(series, f64::max)),
        };

        DailySummary {
            station: station.clone(),
            pollutant: series.pollutant,
            date: series.date,
            valid_hours: series.valid_hours(),
            daily_resolution: series.is_daily(),
            min,
            max,
            mean: self.daily_mean(series),
            max_3h_mean: max_window_mean(&series.hours, 3),
            max_8h_mean: max_window_mean(&series.hours, 8),
            checks,
        }
    }

    /// One table per pollutant, rows in station order. Stations that never
    /// reported a pollutant are left out of its table; pollutants nobody
    /// reported get no table.
    pub fn build_tables(&self, stations: &[Station], cleaned: &CleanedData) -> Vec<PollutantTable> {
        let mut tables = Vec::new();

        for pollutant in Pollutant::ALL {
            let mut table = PollutantTable::new(pollutant, cleaned.date);
            for station in stations {
                if let Some(series) = cleaned.get(&station.station_id, pollutant) {
                    table.rows.push(self.summarize(station, series));
                }
            }

            if !table.rows.is_empty() {
                debug!(
                    pollutant = %pollutant,
                    stations = table.rows.len(),
                    reporting = table.reporting_stations(),
                    "Built pollutant table"
                );
                tables.push(table);
            }
        }

        tables
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn extreme(series: &HourlySeries, pick: fn(f64, f64) -> f64) -> Evaluated<f64> {
    series
        .valid_values()
        .reduce(pick)
        .map_or(Evaluated::NoData, Evaluated::available)
}

fn windowed_count(
    hours: &[Option<f64>],
    width: usize,
    limit: f64,
    reduce: fn(&[Option<f64>], usize) -> Vec<Option<f64>>,
) -> Evaluated<ExceedanceResult> {
    let valid = longest_valid_run(hours);
    if valid == 0 {
        return Evaluated::NoData;
    }

    let (windows, exceedances) = count_above(&reduce(hours, width), limit);
    if windows == 0 {
        return Evaluated::Insufficient {
            valid,
            required: width,
        };
    }

    Evaluated::available(ExceedanceResult::Count {
        exceedances,
        windows,
    })
}

fn max_window_mean(hours: &[Option<f64>], width: usize) -> Evaluated<f64> {
    let valid = longest_valid_run(hours);
    if valid == 0 {
        return Evaluated::NoData;
    }

    match max_defined(&moving_averages(hours, width)) {
        Some(value) => Evaluated::available(value),
        None => Evaluated::Insufficient {
            valid,
            required: width,
        },
    }
}
