use crate::analyzers::Narrative;
use crate::models::{rules_for, DailySummary, PollutantTable, ThresholdRule};
use crate::processors::{ProvinceReport, ProvinceStatus, RunSummary};
use crate::utils::filename::province_file;
use crate::utils::html::escape;
use crate::writers::chart::render_pollutant_chart;
use tracing::warn;

const STYLE: &str = "body{font-family:sans-serif;margin:2em auto;max-width:64em;color:#222}\
h1{margin-bottom:0}.date{color:#666;margin-top:.2em}\
table{border-collapse:collapse;margin:1em 0;width:100%}\
th,td{border:1px solid #ccc;padding:.3em .5em;text-align:right}\
th:first-child,td:first-child,td:nth-child(2){text-align:left}\
th{background:#f3f3f3}td.exceeded{background:#f8d7da;font-weight:bold}\
td.missing{color:#999}.notice{background:#fff3cd;border:1px solid #e0c36c;padding:1em}\
.failed{color:#a00}pre{background:#f7f7f7;padding:1em;overflow-x:auto}\
footer{margin-top:2em;color:#666;font-size:.9em}";

fn page_start(title: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{}</title>\n", escape(title)));
    html.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
    html
}

fn page_end(html: &mut String) {
    html.push_str(
        "<footer>Thresholds from Directive 2008/50/EC and D.Lgs. 155/2010. \
         n.v. marks values without sufficient coverage, n.d. marks missing data.</footer>\n",
    );
    html.push_str("</body>\n</html>\n");
}

/// Renders bulletin pages as standalone HTML documents.
pub struct HtmlWriter {
    charts: bool,
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self { charts: true }
    }

    pub fn with_charts(mut self, charts: bool) -> Self {
        self.charts = charts;
        self
    }

    pub fn render_province(&self, report: &ProvinceReport, narrative: &Narrative) -> String {
        let province = report.province.display_name();
        let date = report.date.format("%d/%m/%Y").to_string();
        let mut html = page_start(&format!("Air quality bulletin: {}, {}", province, date));

        html.push_str("<header>\n");
        html.push_str(&format!("<h1>Air quality bulletin: {}</h1>\n", escape(province)));
        html.push_str(&format!("<p class=\"date\">{}</p>\n", date));
        html.push_str("<p><a href=\"index.html\">All provinces</a></p>\n</header>\n");

        if !report.has_data() {
            html.push_str(&format!(
                "<div class=\"notice\">No data available for {} on {}.</div>\n",
                escape(province),
                date
            ));
        } else {
            html.push_str("<section class=\"narrative\">\n");
            html.push_str(&format!("<p>{}</p>\n", escape(&narrative.headline)));
            if !narrative.paragraphs.is_empty() {
                html.push_str("<ul>\n");
                for paragraph in &narrative.paragraphs {
                    html.push_str(&format!("<li>{}</li>\n", escape(paragraph)));
                }
                html.push_str("</ul>\n");
            }
            html.push_str("</section>\n");

            for table in report.tables.iter().filter(|t| !t.is_empty()) {
                self.render_table(&mut html, report, table);
            }
        }

        html.push_str("<section class=\"quality\">\n<h2>Data quality</h2>\n");
        html.push_str(&format!("<pre>{}</pre>\n</section>\n", escape(&report.integrity_summary)));

        page_end(&mut html);
        html
    }

    fn render_table(&self, html: &mut String, report: &ProvinceReport, table: &PollutantTable) {
        let pollutant = table.pollutant;
        let rules: Vec<&ThresholdRule> = rules_for(pollutant).collect();

        html.push_str(&format!(
            "<section class=\"pollutant\" id=\"{}\">\n<h2>{} ({})</h2>\n",
            pollutant.slug(),
            escape(pollutant.display_name()),
            pollutant.units()
        ));

        html.push_str("<table>\n<thead><tr>");
        html.push_str("<th>Station</th><th>Municipality</th><th>Valid hours</th>");
        html.push_str("<th>Min</th><th>Max</th><th>Daily mean</th>");
        html.push_str("<th>Max 3h mean</th><th>Max 8h mean</th>");
        for rule in &rules {
            html.push_str(&format!(
                "<th title=\"{}\">{} &gt; {} ({})</th>",
                escape(&rule.describe()),
                rule.kind,
                rule.limit,
                escape(&rule.aggregation.describe())
            ));
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        for row in &table.rows {
            render_row(html, row);
        }
        html.push_str("</tbody>\n</table>\n");

        if self.charts {
            match render_pollutant_chart(table, &report.data) {
                Ok(Some(svg)) => {
                    html.push_str("<figure>\n");
                    html.push_str(&svg);
                    html.push_str("\n</figure>\n");
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        province = report.province.code(),
                        pollutant = %pollutant,
                        error = %e,
                        "Chart skipped"
                    );
                }
            }
        }

        html.push_str("</section>\n");
    }

    /// Landing page listing every province of the run with its outcome
    pub fn render_index(&self, summary: &RunSummary) -> String {
        let date = summary.date.format("%d/%m/%Y").to_string();
        let mut html = page_start(&format!("Air quality bulletins, {}", date));

        html.push_str("<header>\n<h1>Air quality bulletins: Emilia-Romagna</h1>\n");
        html.push_str(&format!("<p class=\"date\">{}</p>\n</header>\n", date));

        html.push_str("<table>\n<thead><tr><th>Province</th><th>Status</th>");
        html.push_str("<th>Reporting stations</th><th>Exceedances</th></tr></thead>\n<tbody>\n");

        for outcome in &summary.outcomes {
            let name = escape(outcome.province.display_name());
            let link = format!(
                "<a href=\"{}\">{}</a>",
                province_file(outcome.province, "html"),
                name
            );

            let row = match &outcome.status {
                ProvinceStatus::Published {
                    reporting_stations,
                    exceedances,
                } => format!(
                    "<td>{}</td><td>published</td><td>{}</td><td>{}</td>",
                    link, reporting_stations, exceedances
                ),
                ProvinceStatus::NoData => format!(
                    "<td>{}</td><td>no data available</td>\
                     <td class=\"missing\">n.d.</td><td class=\"missing\">n.d.</td>",
                    link
                ),
                ProvinceStatus::Failed { error } => format!(
                    "<td>{}</td><td class=\"failed\">failed: {}</td>\
                     <td class=\"missing\">n.d.</td><td class=\"missing\">n.d.</td>",
                    name,
                    escape(error)
                ),
            };
            html.push_str(&format!("<tr>{}</tr>\n", row));
        }

        html.push_str("</tbody>\n</table>\n");
        page_end(&mut html);
        html
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn render_row(html: &mut String, row: &DailySummary) {
    let valid_hours = if row.daily_resolution {
        "daily".to_string()
    } else {
        row.valid_hours.to_string()
    };

    html.push_str("<tr>");
    html.push_str(&format!(
        "<td>{}</td><td>{}</td><td>{}</td>",
        escape(&row.station.name),
        escape(&row.station.municipality),
        valid_hours
    ));

    for value in [&row.min, &row.max, &row.mean, &row.max_3h_mean, &row.max_8h_mean] {
        let class = if value.is_available() { "" } else { " class=\"missing\"" };
        html.push_str(&format!("<td{}>{}</td>", class, value.display()));
    }

    for check in &row.checks {
        let class = if check.exceeded() {
            " class=\"exceeded\""
        } else if !check.result.is_available() {
            " class=\"missing\""
        } else {
            ""
        };
        html.push_str(&format!("<td{}>{}</td>", class, check.display()));
    }
    html.push_str("</tr>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::NarrativeBuilder;
    use crate::models::{Province, Station};
    use crate::processors::{BulletinPipeline, ProvinceOutcome, ThresholdEvaluator};
    use crate::readers::{RawRecord, StationRegistry};
    use chrono::NaiveDate;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn pipeline() -> BulletinPipeline {
        let registry = StationRegistry::new(vec![Station::new(
            "4000022".to_string(),
            "Giardini <Margherita>".to_string(),
            "Bologna".to_string(),
            Province::Bologna,
        )]);
        BulletinPipeline::new(registry, ThresholdEvaluator::new())
    }

    fn render(records: &[RawRecord]) -> String {
        let report = pipeline().process_records(Province::Bologna, day(), records).unwrap();
        let narrative = NarrativeBuilder::new().build(&report);
        HtmlWriter::new().with_charts(false).render_province(&report, &narrative)
    }

    #[test]
    fn test_empty_records_render_notice() {
        let html = render(&[]);
        assert!(html.contains("No data available for Bologna on 15/01/2024."));
        assert!(!html.contains("<section class=\"pollutant\""));
        assert!(html.contains("Data quality"));
    }

    #[test]
    fn test_table_marks_exceedances_and_escapes_names() {
        let records: Vec<RawRecord> = (0..24)
            .map(|h| RawRecord {
                station_id: json!("4000022"),
                variable_id: json!(8),
                reftime: json!(format!("2024-01-15T{:02}:00:00", h)),
                value: json!(if h == 9 { 260.0 } else { 80.0 }),
            })
            .collect();
        let html = render(&records);

        assert!(html.contains("<h2>NO2 (µg/m³)</h2>"));
        assert!(html.contains("Giardini &lt;Margherita&gt;"));
        assert!(!html.contains("Giardini <Margherita>"));
        assert!(html.contains("<td class=\"exceeded\">1</td>"));
    }

    #[test]
    fn test_index_lists_every_outcome() {
        let summary = RunSummary {
            date: day(),
            outcomes: vec![
                ProvinceOutcome {
                    province: Province::Bologna,
                    status: ProvinceStatus::Published {
                        reporting_stations: 4,
                        exceedances: 2,
                    },
                },
                ProvinceOutcome {
                    province: Province::Rimini,
                    status: ProvinceStatus::Failed {
                        error: "HTTP 503 <gateway>".to_string(),
                    },
                },
            ],
        };

        let html = HtmlWriter::new().render_index(&summary);
        assert!(html.contains("<a href=\"bo.html\">Bologna</a>"));
        assert!(html.contains("failed: HTTP 503 &lt;gateway&gt;"));
        assert!(!html.contains("rn.html"));
    }
}
