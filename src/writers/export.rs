use crate::error::Result;
use crate::models::{Evaluated, PollutantTable};
use crate::processors::{IntegrityReport, ProvinceReport};
use crate::writers::write_atomic;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ProvinceExport<'a> {
    province: &'a str,
    province_name: &'a str,
    date: NaiveDate,
    stations: usize,
    reporting_stations: usize,
    exceedances: usize,
    tables: &'a [PollutantTable],
    integrity: &'a IntegrityReport,
}

/// One line per station and rule
#[derive(Debug, Serialize)]
struct ExceedanceRow<'a> {
    date: NaiveDate,
    province: &'a str,
    station_id: &'a str,
    station_name: &'a str,
    pollutant: &'a str,
    rule_id: &'a str,
    kind: String,
    aggregation: String,
    limit: f64,
    units: &'a str,
    status: &'static str,
    result: String,
    exceeded: bool,
    valid_hours: usize,
    daily_mean: Option<f64>,
}

fn status<T>(evaluated: &Evaluated<T>) -> &'static str {
    match evaluated {
        Evaluated::Available { .. } => "available",
        Evaluated::Insufficient { .. } => "insufficient",
        Evaluated::NoData => "no_data",
    }
}

pub fn render_json(report: &ProvinceReport) -> Result<String> {
    let export = ProvinceExport {
        province: report.province.code(),
        province_name: report.province.display_name(),
        date: report.date,
        stations: report.stations.len(),
        reporting_stations: report.reporting_stations(),
        exceedances: report.exceedances(),
        tables: &report.tables,
        integrity: &report.integrity,
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

pub fn render_csv(report: &ProvinceReport) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for table in &report.tables {
        for row in &table.rows {
            for check in &row.checks {
                writer.serialize(ExceedanceRow {
                    date: report.date,
                    province: report.province.code(),
                    station_id: &row.station.station_id,
                    station_name: &row.station.name,
                    pollutant: table.pollutant.display_name(),
                    rule_id: check.rule.id,
                    kind: check.rule.kind.to_string(),
                    aggregation: check.rule.aggregation.describe(),
                    limit: check.rule.limit,
                    units: table.pollutant.units(),
                    status: status(&check.result),
                    result: check.display(),
                    exceeded: check.exceeded(),
                    valid_hours: row.valid_hours,
                    daily_mean: row.mean.value().copied(),
                })?;
            }
        }
    }

    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}

pub fn write_json(report: &ProvinceReport, path: &Path) -> Result<()> {
    write_atomic(path, render_json(report)?.as_bytes())
}

pub fn write_csv(report: &ProvinceReport, path: &Path) -> Result<()> {
    write_atomic(path, &render_csv(report)?)
}

/// Keeps the datastore body verbatim so the day can be re-evaluated offline
pub fn write_raw(body: &str, path: &Path) -> Result<()> {
    write_atomic(path, body.as_bytes())
}
