use aq_bulletin::models::{Evaluated, ExceedanceResult, Pollutant, Province};
use aq_bulletin::processors::{
    BulletinPipeline, ProvinceOutcome, ProvinceStatus, RunSummary, ThresholdEvaluator,
};
use aq_bulletin::query::QueryBuilder;
use aq_bulletin::readers::{parse_records, StationReader};
use aq_bulletin::utils::filename::province_path;
use aq_bulletin::writers::BulletinWriter;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const RESOURCE_ID: &str = "a1c46cfe-46e5-44b4-9231-7d9260a38e68";

const STATIONS_CSV: &str = "\
station_id,name,municipality,province
4000022,Giardini Margherita,Bologna,BO
4000152,Porta San Felice,Bologna,BO
2000003,Parco Ferrari,Modena,MO
";

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

/// A datastore response as the remote API returns it, with loose types
fn sample_response() -> String {
    let mut records = Vec::new();

    // NO2 at Giardini Margherita: three hours above 200
    for hour in 0..24 {
        let value = match hour {
            8 => 215.0,
            9 => 230.5,
            18 => 201.0,
            _ => 95.0,
        };
        records.push(json!({
            "station_id": 4000022,
            "variable_id": 8,
            "reftime": format!("2024-01-15T{:02}:00:00", hour),
            "value": value
        }));
    }

    // PM10 at Porta San Felice: only 12 valid hours, then nulls
    for hour in 0..24 {
        let value = if hour < 12 { json!("62.0") } else { json!(null) };
        records.push(json!({
            "station_id": "4000152",
            "variable_id": "5",
            "reftime": format!("2024-01-15 {:02}:00:00", hour),
            "value": value
        }));
    }

    // A row for another day must be ignored
    records.push(json!({
        "station_id": "4000152",
        "variable_id": 5,
        "reftime": "2024-01-16T00:00:00",
        "value": 500.0
    }));

    json!({ "success": true, "result": { "records": records } }).to_string()
}

fn pipeline(dir: &TempDir) -> BulletinPipeline {
    let stations_path = dir.path().join("stations.csv");
    fs::write(&stations_path, STATIONS_CSV).unwrap();
    let registry = StationReader::new().read_registry(&stations_path).unwrap();
    BulletinPipeline::new(registry, ThresholdEvaluator::new())
}

#[test]
fn test_offline_bulletin_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let pipeline = pipeline(&dir);
    let records = parse_records(&sample_response()).unwrap();

    let report = pipeline
        .process_records(Province::Bologna, day(), &records)
        .unwrap();

    assert_eq!(report.data.stats.outside_day, 1);
    assert_eq!(report.reporting_stations(), 2);

    let no2 = report.tables.iter().find(|t| t.pollutant == Pollutant::No2).unwrap();
    let check = no2.rows[0].check("no2_hourly_limit").unwrap();
    assert_eq!(
        check.result,
        Evaluated::available(ExceedanceResult::Count {
            exceedances: 3,
            windows: 24
        })
    );

    let pm10 = report.tables.iter().find(|t| t.pollutant == Pollutant::Pm10).unwrap();
    assert_eq!(
        pm10.rows[0].mean,
        Evaluated::Insufficient {
            valid: 12,
            required: 18
        }
    );
    assert!(!pm10.rows[0].check("pm10_daily_limit").unwrap().exceeded());

    // Publish and check the file layout
    let out = dir.path().join("bulletins");
    let writer = BulletinWriter::new(&out).with_save_raw(true);
    let page = writer.publish(&report, Some(sample_response().as_str())).unwrap();

    assert_eq!(page, province_path(&out, day(), Province::Bologna, "html"));
    for ext in ["html", "json", "csv", "raw.json"] {
        assert!(province_path(&out, day(), Province::Bologna, ext).exists(), "missing {}", ext);
    }

    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("Air quality bulletin: Bologna"));
    assert!(html.contains("exceeded at Giardini Margherita (3 hours)"));
    assert!(html.contains(
        "PM10 limit value (50 µg/m³, daily mean): insufficient data to evaluate."
    ));
    assert!(html.contains("<svg"));

    // The saved raw body re-evaluates to the same result
    let saved =
        fs::read_to_string(province_path(&out, day(), Province::Bologna, "raw.json")).unwrap();
    let again = pipeline
        .process_records(Province::Bologna, day(), &parse_records(&saved).unwrap())
        .unwrap();
    assert_eq!(again.tables, report.tables);
}

#[test]
fn test_empty_response_renders_no_data_notice() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);

    for body in ["", r#"{"success": true, "result": {"records": []}}"#] {
        let records = parse_records(body).unwrap();
        let report = pipeline.process_records(Province::Modena, day(), &records).unwrap();
        assert_eq!(report.status(), ProvinceStatus::NoData);

        let page = BulletinWriter::new(dir.path()).publish(&report, None).unwrap();
        let html = fs::read_to_string(page).unwrap();
        assert!(html.contains("No data available for Modena on 15/01/2024."));
    }
}

#[test]
fn test_index_page_records_failures() {
    let dir = TempDir::new().unwrap();
    let summary = RunSummary {
        date: day(),
        outcomes: vec![
            ProvinceOutcome {
                province: Province::Bologna,
                status: ProvinceStatus::Published {
                    reporting_stations: 2,
                    exceedances: 1,
                },
            },
            ProvinceOutcome {
                province: Province::Ferrara,
                status: ProvinceStatus::Failed {
                    error: "Giving up after 3 attempts".to_string(),
                },
            },
        ],
    };

    let index = BulletinWriter::new(dir.path()).write_index(&summary).unwrap();
    assert!(index.ends_with("2024-01-15/index.html"));

    let html = fs::read_to_string(index).unwrap();
    assert!(html.contains("<a href=\"bo.html\">Bologna</a>"));
    assert!(html.contains("failed: Giving up after 3 attempts"));
    assert!(!summary.all_failed());
}

#[test]
fn test_query_never_carries_injected_sql() {
    let builder = QueryBuilder::new(RESOURCE_ID).unwrap();
    let sql = builder
        .build_from_input(&["4000022'; DROP TABLE x; --", "4000152"], "2024-01-15")
        .unwrap();

    let station_clause = sql
        .split("IN (")
        .nth(1)
        .and_then(|rest| rest.split(')').next())
        .unwrap();
    assert_eq!(station_clause, "'4000022 DROP TABLE x', '4000152'");
    assert!(sql.contains("DATE '20240115'"));
    assert!(!sql.contains(';'));
}

#[test]
fn test_registry_lookup_by_province() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir);

    assert_eq!(pipeline.stations_for(Province::Bologna).unwrap().len(), 2);
    assert!(pipeline.stations_for(Province::Piacenza).is_err());
    assert_eq!(pipeline.registry().len(), 3);
}

#[test]
fn test_unsuccessful_response_is_an_api_error() {
    let body =
        r#"{"success": false, "error": {"__type": "Validation Error", "query": ["bad sql"]}}"#;
    let err = parse_records(body).unwrap_err();
    assert!(err.to_string().contains("Validation Error"));
    assert!(!err.is_transient());
}
