use crate::error::{BulletinError, Result};
use crate::models::{rules_for, Aggregation, HourlySeries, PollutantTable, HOURS_PER_DAY};
use crate::processors::CleanedData;
use crate::utils::constants::{CHART_HEIGHT, CHART_WIDTH};
use plotters::prelude::*;

const PALETTE: [RGBColor; 6] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(23, 190, 207),
];

const LIMIT_COLOR: RGBColor = RGBColor(214, 39, 40);

fn chart_error<E: std::fmt::Display>(e: E) -> BulletinError {
    BulletinError::Chart(e.to_string())
}

/// Splits a day into runs of consecutive valid hours so gaps are not bridged
fn valid_runs(hours: &[Option<f64>]) -> Vec<Vec<(usize, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (hour, slot) in hours.iter().enumerate() {
        match slot {
            Some(value) => current.push((hour, *value)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Limits that can be drawn against hourly values
fn hourly_limits(table: &PollutantTable) -> Vec<f64> {
    let mut limits: Vec<f64> = rules_for(table.pollutant)
        .filter(|r| !matches!(r.aggregation, Aggregation::DailyMean))
        .map(|r| r.limit)
        .collect();
    limits.sort_by(f64::total_cmp);
    limits.dedup();
    limits
}

/// Hourly profile of every station in the table as an inline SVG document.
/// Returns `None` when no station has hourly values to plot.
pub fn render_pollutant_chart(
    table: &PollutantTable,
    data: &CleanedData,
) -> Result<Option<String>> {
    let series: Vec<(&str, &HourlySeries)> = table
        .rows
        .iter()
        .filter_map(|row| {
            data.get(&row.station.station_id, table.pollutant)
                .filter(|s| s.valid_hours() > 0)
                .map(|s| (row.station.name.as_str(), s))
        })
        .collect();

    if series.is_empty() {
        return Ok(None);
    }

    let limits = hourly_limits(table);
    let peak = series
        .iter()
        .flat_map(|(_, s)| s.valid_values())
        .chain(limits.iter().copied())
        .fold(0.0f64, f64::max);
    let y_max = (peak * 1.1).max(1.0);

    let mut svg = String::new();
    {
        let root =
            SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} ({})", table.pollutant.display_name(), table.pollutant.units()),
                ("sans-serif", 16),
            )
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(45)
            .build_cartesian_2d(0usize..HOURS_PER_DAY - 1, 0f64..y_max)
            .map_err(chart_error)?;

        chart
            .configure_mesh()
            .x_labels(12)
            .x_desc("hour")
            .y_desc(table.pollutant.units())
            .draw()
            .map_err(chart_error)?;

        for (i, (name, s)) in series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];

            for run in valid_runs(&s.hours) {
                chart
                    .draw_series(LineSeries::new(run, color.stroke_width(2)))
                    .map_err(chart_error)?;
            }

            chart
                .draw_series(PointSeries::of_element(
                    s.hours
                        .iter()
                        .enumerate()
                        .filter_map(|(h, v)| v.map(|v| (h, v))),
                    2,
                    color.filled(),
                    &|coord, size, style| {
                        EmptyElement::at(coord) + Circle::new((0, 0), size, style)
                    },
                ))
                .map_err(chart_error)?
                .label(name.to_string())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 4), (x + 12, y + 4)], color.filled())
                });
        }

        for limit in limits {
            chart
                .draw_series(LineSeries::new(
                    vec![(0, limit), (HOURS_PER_DAY - 1, limit)],
                    LIMIT_COLOR.stroke_width(1),
                ))
                .map_err(chart_error)?
                .label(format!("limit {}", limit))
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], LIMIT_COLOR));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
    }

    Ok(Some(svg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Pollutant, Province, Station};
    use crate::processors::ThresholdEvaluator;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_valid_runs_split_on_gaps() {
        let hours = [Some(1.0), Some(2.0), None, None, Some(5.0)];
        assert_eq!(
            valid_runs(&hours),
            vec![vec![(0, 1.0), (1, 2.0)], vec![(4, 5.0)]]
        );
    }

    #[test]
    fn test_chart_renders_svg() {
        let station = Station::new(
            "1".to_string(),
            "Giardini Margherita".to_string(),
            "Bologna".to_string(),
            Province::Bologna,
        );
        let mut hours = [Some(80.0); HOURS_PER_DAY];
        hours[5] = None;

        let mut data = CleanedData::empty(day());
        data.series.insert(
            ("1".to_string(), Pollutant::O3),
            HourlySeries::from_hours("1", Pollutant::O3, day(), hours),
        );
        let tables = ThresholdEvaluator::new().build_tables(&[station], &data);

        let svg = render_pollutant_chart(&tables[0], &data).unwrap().unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Giardini Margherita"));
        assert_eq!(hourly_limits(&tables[0]), vec![120.0, 180.0, 240.0]);
    }

    #[test]
    fn test_daily_only_table_has_no_chart() {
        let station = Station::new(
            "1".to_string(),
            "A".to_string(),
            "B".to_string(),
            Province::Bologna,
        );
        let mut data = CleanedData::empty(day());
        data.series.insert(
            ("1".to_string(), Pollutant::Pm10),
            HourlySeries::from_daily_value("1", Pollutant::Pm10, day(), 40.0),
        );
        let tables = ThresholdEvaluator::new().build_tables(&[station], &data);
        assert!(render_pollutant_chart(&tables[0], &data).unwrap().is_none());
    }
}
