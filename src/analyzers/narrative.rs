use crate::models::{rules_for, Aggregation, DailySummary, Evaluated, PollutantTable, ThresholdRule};
use crate::processors::ProvinceReport;

/// Plain-language account of a province's day.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub headline: String,
    pub paragraphs: Vec<String>,
}

pub struct NarrativeBuilder;

impl NarrativeBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, report: &ProvinceReport) -> Narrative {
        let date = report.date.format("%d/%m/%Y");
        let province = report.province.display_name();

        if !report.has_data() {
            return Narrative {
                headline: format!("No data available for {} on {}.", province, date),
                paragraphs: Vec::new(),
            };
        }

        let headline = format!(
            "On {}, {} of {} monitoring stations in the province of {} reported data.",
            date,
            report.reporting_stations(),
            report.stations.len(),
            province
        );

        let mut paragraphs = Vec::new();
        for table in &report.tables {
            let rules: Vec<&ThresholdRule> = rules_for(table.pollutant).collect();
            if rules.is_empty() || table.is_empty() {
                continue;
            }
            for rule in rules {
                paragraphs.push(self.describe_rule(table, rule));
            }
        }

        Narrative {
            headline,
            paragraphs,
        }
    }

    fn describe_rule(&self, table: &PollutantTable, rule: &ThresholdRule) -> String {
        let subject = format!(
            "{} {} ({} {}, {})",
            rule.pollutant.display_name(),
            rule.kind,
            rule.limit,
            rule.pollutant.units(),
            rule.aggregation.describe()
        );

        let exceeding = table.exceeding(rule.id);
        if !exceeding.is_empty() {
            let stations: Vec<String> = exceeding
                .iter()
                .map(|row| describe_exceedance(row, rule))
                .collect();
            return format!("{}: exceeded at {}.", subject, stations.join(", "));
        }

        let evaluated = table
            .rows
            .iter()
            .filter_map(|row| row.check(rule.id))
            .filter(|check| check.result.is_available())
            .count();

        if evaluated == 0 {
            format!("{}: insufficient data to evaluate.", subject)
        } else {
            format!(
                "{}: no exceedances at the {} station{} evaluated.",
                subject,
                evaluated,
                if evaluated == 1 { "" } else { "s" }
            )
        }
    }
}

impl Default for NarrativeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_exceedance(row: &DailySummary, rule: &ThresholdRule) -> String {
    let name = &row.station.name;
    match row.check(rule.id).map(|c| &c.result) {
        Some(Evaluated::Available { value }) if !rule.is_flag() => {
            let unit = if matches!(rule.aggregation, Aggregation::HourlyValue) {
                "hour"
            } else {
                "window"
            };
            let count = value.count();
            format!("{} ({} {}{})", name, count, unit, if count == 1 { "" } else { "s" })
        }
        _ => match &row.mean {
            Evaluated::Available { value } => format!("{} (mean {:.1})", name, value),
            _ => name.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HourlySeries, Pollutant, Province, Station, HOURS_PER_DAY};
    use crate::processors::{BulletinPipeline, CleanedData, ThresholdEvaluator};
    use crate::readers::StationRegistry;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn station(id: &str, name: &str) -> Station {
        Station::new(id.to_string(), name.to_string(), "Bologna".to_string(), Province::Bologna)
    }

    fn report_with(series: Vec<HourlySeries>) -> ProvinceReport {
        let stations = vec![station("1", "Giardini Margherita"), station("2", "Porta San Felice")];
        let pipeline = BulletinPipeline::new(
            StationRegistry::new(stations.clone()),
            ThresholdEvaluator::new(),
        );
        let mut report = pipeline.process_records(Province::Bologna, day(), &[]).unwrap();

        let mut data = CleanedData::empty(day());
        for s in series {
            data.series.insert((s.station_id.clone(), s.pollutant), s);
        }
        report.tables = ThresholdEvaluator::new().build_tables(&stations, &data);
        report.data = data;
        report
    }

    #[test]
    fn test_no_data_headline() {
        let narrative = NarrativeBuilder::new().build(&report_with(vec![]));
        assert_eq!(narrative.headline, "No data available for Bologna on 15/01/2024.");
        assert!(narrative.paragraphs.is_empty());
    }

    #[test]
    fn test_exceedances_named_with_counts() {
        let mut hours = [Some(150.0); HOURS_PER_DAY];
        hours[8] = Some(230.0);
        hours[9] = Some(240.0);
        let report = report_with(vec![
            HourlySeries::from_hours("1", Pollutant::No2, day(), hours),
            HourlySeries::from_hours("2", Pollutant::No2, day(), [Some(90.0); HOURS_PER_DAY]),
        ]);

        let narrative = NarrativeBuilder::new().build(&report);
        assert!(narrative.headline.contains("2 of 2 monitoring stations"));
        assert_eq!(
            narrative.paragraphs[0],
            "NO2 limit value (200 µg/m³, hourly value): \
             exceeded at Giardini Margherita (2 hours)."
        );
        assert_eq!(
            narrative.paragraphs[1],
            "NO2 alert threshold (400 µg/m³, 3 consecutive hours): \
             no exceedances at the 2 stations evaluated."
        );
    }

    #[test]
    fn test_insufficient_data_is_reported() {
        let mut hours = [None; HOURS_PER_DAY];
        hours[3] = Some(40.0);
        let report =
            report_with(vec![HourlySeries::from_hours("1", Pollutant::Pm10, day(), hours)]);

        let narrative = NarrativeBuilder::new().build(&report);
        assert_eq!(
            narrative.paragraphs,
            vec![
                "PM10 limit value (50 µg/m³, daily mean): insufficient data to evaluate."
                    .to_string()
            ]
        );
    }
}
