use crate::cli::args::{Cli, Commands};
use crate::models::{rules_for, Pollutant, Province, REGULATORY_RULES};
use crate::processors::{
    BulletinPipeline, ProvinceOutcome, ProvinceStatus, RunSummary, ThresholdEvaluator,
};
use crate::query::QueryBuilder;
use crate::readers::{parse_records, DatastoreClient, StationReader, StationRegistry};
use crate::settings::Settings;
use crate::utils::filename::default_bulletin_date;
use crate::utils::progress::ProgressReporter;
use crate::writers::{BulletinWriter, HtmlWriter};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Invalid configuration")?;

    match cli.command {
        Commands::Run {
            date,
            provinces,
            output_dir,
            stations_file,
            save_raw,
            no_charts,
        } => {
            let date = date.unwrap_or_else(default_bulletin_date);
            let output_dir = output_dir.unwrap_or_else(|| settings.output_dir.clone());
            let provinces = selected_provinces(provinces);

            println!("Building air-quality bulletins for {}", date);
            println!("Endpoint: {}", settings.endpoint);
            println!("Output directory: {}", output_dir.display());

            let registry = load_registry(&settings, stations_file.as_deref())?;
            let client = DatastoreClient::new(
                &settings.endpoint,
                settings.request_timeout(),
                settings.retry_policy(),
            )?;
            let query_builder = QueryBuilder::new(&settings.resource_id)?;
            let pipeline = BulletinPipeline::new(
                registry,
                ThresholdEvaluator::with_min_coverage(settings.min_coverage),
            )
            .with_remote(client, query_builder);

            let writer = BulletinWriter::new(&output_dir)
                .with_save_raw(save_raw)
                .with_html_writer(HtmlWriter::new().with_charts(!no_charts));

            let progress =
                ProgressReporter::new(provinces.len() as u64, "Fetching measurements...", false);
            let summary = pipeline
                .run(date, &provinces, &progress, |report, fetched| {
                    writer
                        .publish(report, Some(fetched.raw_body.as_str()))
                        .map(|_| ())
                })
                .await;
            progress.finish_with_message(&format!(
                "Processed {} provinces ({} failed)",
                summary.outcomes.len(),
                summary.failures()
            ));

            let index = writer.write_index(&summary)?;
            print_summary(&summary);
            println!("\nIndex: {}", index.display());

            if summary.all_failed() {
                bail!("All {} provinces failed", summary.outcomes.len());
            }
        }

        Commands::Query {
            date,
            province,
            stations,
            stations_file,
        } => {
            let builder = QueryBuilder::new(&settings.resource_id)?;
            let date_input = date.unwrap_or_else(|| default_bulletin_date().to_string());

            let station_ids = if stations.is_empty() {
                let registry = load_registry(&settings, stations_file.as_deref())?;
                BulletinPipeline::new(registry, ThresholdEvaluator::new())
                    .stations_for(province)?
                    .into_iter()
                    .map(|s| s.station_id)
                    .collect()
            } else {
                stations
            };

            let sql = builder.build_from_input(&station_ids, &date_input)?;
            println!("{}", sql);
        }

        Commands::Evaluate {
            input,
            province,
            date,
            output_dir,
            stations_file,
        } => {
            let date = date
                .or_else(|| date_from_path(&input))
                .unwrap_or_else(default_bulletin_date);
            let output_dir = output_dir.unwrap_or_else(|| settings.output_dir.clone());

            println!("Evaluating {} for {} on {}", input.display(), province.display_name(), date);

            let body = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let records = parse_records(&body)?;
            info!(rows = records.len(), "Loaded saved response");

            let registry = load_registry(&settings, stations_file.as_deref())?;
            let pipeline = BulletinPipeline::new(
                registry,
                ThresholdEvaluator::with_min_coverage(settings.min_coverage),
            );
            let progress = ProgressReporter::new_spinner("Evaluating saved response...", false);
            let report = pipeline.process_records(province, date, &records)?;
            progress.finish_with_message(&format!("Evaluated {} rows", records.len()));
            println!("\n{}", report.integrity_summary);

            let page = BulletinWriter::new(&output_dir).publish(&report, None)?;
            print_summary(&RunSummary {
                date,
                outcomes: vec![ProvinceOutcome {
                    province,
                    status: report.status(),
                }],
            });
            println!("\nBulletin: {}", page.display());
        }

        Commands::Stations {
            province,
            stations_file,
        } => {
            let registry = load_registry(&settings, stations_file.as_deref())?;
            let provinces = match province {
                Some(p) => vec![p],
                None => Province::ALL.to_vec(),
            };

            for province in provinces {
                let stations = registry.in_province(province);
                println!(
                    "{} {} ({} stations)",
                    province.code(),
                    province.display_name(),
                    stations.len()
                );
                for station in stations {
                    println!("  {:<10} {}", station.station_id, station.label());
                }
            }
        }

        Commands::Thresholds => {
            println!("Regulatory thresholds (strictly greater than the limit):");
            for rule in REGULATORY_RULES.iter() {
                println!("  {:<16} {}", rule.id, rule.describe());
            }

            let unchecked: Vec<&str> = Pollutant::ALL
                .iter()
                .filter(|p| rules_for(**p).next().is_none())
                .map(|p| p.display_name())
                .collect();
            println!("\nStatistics only (annual limits): {}", unchecked.join(", "));
        }
    }

    Ok(())
}

fn load_registry(settings: &Settings, override_path: Option<&Path>) -> Result<StationRegistry> {
    let path = override_path.unwrap_or(settings.stations_file.as_path());
    let registry = StationReader::new()
        .read_registry(path)
        .with_context(|| format!("Failed to load station registry {}", path.display()))?;

    if registry.is_empty() {
        bail!("Station registry {} has no Emilia-Romagna stations", path.display());
    }
    Ok(registry)
}

/// Requested provinces in order, without repeats; all when none given
fn selected_provinces(requested: Vec<Province>) -> Vec<Province> {
    if requested.is_empty() {
        return Province::ALL.to_vec();
    }

    let mut provinces = Vec::with_capacity(requested.len());
    for province in requested {
        if !provinces.contains(&province) {
            provinces.push(province);
        }
    }
    provinces
}

/// Saved responses live in `<output>/<YYYY-MM-DD>/`, so the directory names the day
fn date_from_path(path: &Path) -> Option<NaiveDate> {
    let dir = path.parent()?.file_name()?.to_str()?;
    NaiveDate::parse_from_str(dir, "%Y-%m-%d").ok()
}

fn print_summary(summary: &RunSummary) {
    println!("\nBulletins for {}:", summary.date);
    for outcome in &summary.outcomes {
        let line = match &outcome.status {
            ProvinceStatus::Published {
                reporting_stations,
                exceedances,
            } => format!(
                "{} stations reporting, {} exceedances",
                reporting_stations, exceedances
            ),
            ProvinceStatus::NoData => "no data available".to_string(),
            ProvinceStatus::Failed { error } => format!("FAILED: {}", error),
        };
        println!(
            "  {:<2} {:<16} {}",
            outcome.province.code(),
            outcome.province.display_name(),
            line
        );
    }
}
