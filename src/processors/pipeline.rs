use crate::error::{BulletinError, Result};
use crate::models::{PollutantTable, Province, Station};
use crate::processors::cleaner::{CleanedData, Cleaner};
use crate::processors::integrity_checker::{IntegrityChecker, IntegrityReport};
use crate::processors::threshold_evaluator::ThresholdEvaluator;
use crate::query::QueryBuilder;
use crate::readers::{DatastoreClient, FetchedRecords, RawRecord, StationRegistry};
use crate::utils::progress::ProgressReporter;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{error, info, warn};

/// Everything needed to render one province's bulletin.
#[derive(Debug, Clone)]
pub struct ProvinceReport {
    pub province: Province,
    pub date: NaiveDate,
    pub stations: Vec<Station>,
    pub tables: Vec<PollutantTable>,
    pub data: CleanedData,
    pub integrity: IntegrityReport,
    pub integrity_summary: String,
}

impl ProvinceReport {
    pub fn has_data(&self) -> bool {
        self.tables.iter().any(|t| !t.is_empty())
    }

    /// Stations with at least one usable value for any pollutant
    pub fn reporting_stations(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .filter(|r| r.has_data())
            .map(|r| r.station.station_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of (station, rule) pairs with an exceedance
    pub fn exceedances(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.rows.iter())
            .flat_map(|r| r.checks.iter())
            .filter(|c| c.exceeded())
            .count()
    }

    pub fn status(&self) -> ProvinceStatus {
        if self.has_data() {
            ProvinceStatus::Published {
                reporting_stations: self.reporting_stations(),
                exceedances: self.exceedances(),
            }
        } else {
            ProvinceStatus::NoData
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProvinceStatus {
    Published {
        reporting_stations: usize,
        exceedances: usize,
    },
    NoData,
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceOutcome {
    pub province: Province,
    pub status: ProvinceStatus,
}

impl ProvinceOutcome {
    pub fn failed(&self) -> bool {
        matches!(self.status, ProvinceStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub outcomes: Vec<ProvinceOutcome>,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed()).count()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.failures() == self.outcomes.len()
    }
}

struct Remote {
    client: DatastoreClient,
    query_builder: QueryBuilder,
}

/// Station lookup, download, cleaning and evaluation for one day.
pub struct BulletinPipeline {
    registry: StationRegistry,
    evaluator: ThresholdEvaluator,
    checker: IntegrityChecker,
    remote: Option<Remote>,
}

impl BulletinPipeline {
    pub fn new(registry: StationRegistry, evaluator: ThresholdEvaluator) -> Self {
        let checker = IntegrityChecker::with_required_hours(evaluator.required_hours());
        Self {
            registry,
            evaluator,
            checker,
            remote: None,
        }
    }

    pub fn with_remote(mut self, client: DatastoreClient, query_builder: QueryBuilder) -> Self {
        self.remote = Some(Remote {
            client,
            query_builder,
        });
        self
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    pub fn stations_for(&self, province: Province) -> Result<Vec<Station>> {
        let stations: Vec<Station> = self
            .registry
            .in_province(province)
            .into_iter()
            .cloned()
            .collect();

        if stations.is_empty() {
            return Err(BulletinError::Config(format!(
                "no stations registered for {}",
                province.display_name()
            )));
        }
        Ok(stations)
    }

    /// SQL that would be sent for the province and day
    pub fn query_for(&self, province: Province, date: NaiveDate) -> Result<String> {
        let remote = self.remote()?;
        let stations = self.stations_for(province)?;
        let ids: Vec<&str> = stations.iter().map(|s| s.station_id.as_str()).collect();
        remote.query_builder.build_daily_query(&ids, date)
    }

    /// Download and evaluate one province. The raw records are returned so
    /// the caller can archive the response.
    pub async fn fetch_province(
        &self,
        province: Province,
        date: NaiveDate,
    ) -> Result<(ProvinceReport, FetchedRecords)> {
        let remote = self.remote()?;
        let sql = self.query_for(province, date)?;
        let fetched = remote.client.fetch_records(&sql, province.code()).await?;
        let report = self.process_records(province, date, &fetched.records)?;
        Ok((report, fetched))
    }

    /// Clean and evaluate already downloaded rows
    pub fn process_records(
        &self,
        province: Province,
        date: NaiveDate,
        records: &[RawRecord],
    ) -> Result<ProvinceReport> {
        let stations = self.stations_for(province)?;
        let local = StationRegistry::new(stations.clone());

        let data = Cleaner::new(date).clean(records, Some(&local));
        let tables = self.evaluator.build_tables(&stations, &data);
        let integrity = self.checker.check_integrity(&data);
        let integrity_summary = self.checker.generate_summary(&integrity);

        if data.stats.rejected_rows() > 0 {
            warn!(
                province = province.code(),
                rejected = data.stats.rejected_rows(),
                "Some rows were rejected during cleaning"
            );
        }

        Ok(ProvinceReport {
            province,
            date,
            stations,
            tables,
            data,
            integrity,
            integrity_summary,
        })
    }

    /// Runs every province in turn. A failure in one province, whether
    /// fetching or publishing, is recorded and the run moves on.
    pub async fn run<F>(
        &self,
        date: NaiveDate,
        provinces: &[Province],
        progress: &ProgressReporter,
        mut publish: F,
    ) -> RunSummary
    where
        F: FnMut(&ProvinceReport, &FetchedRecords) -> Result<()>,
    {
        let mut outcomes = Vec::with_capacity(provinces.len());

        for &province in provinces {
            progress.set_message(&format!("Processing {}", province.display_name()));

            let result = match self.fetch_province(province, date).await {
                Ok((report, fetched)) => publish(&report, &fetched).map(|_| report),
                Err(e) => Err(e),
            };

            let status = match result {
                Ok(report) => {
                    let status = report.status();
                    match &status {
                        ProvinceStatus::Published {
                            reporting_stations,
                            exceedances,
                        } => info!(
                            province = province.code(),
                            stations = reporting_stations,
                            exceedances,
                            "Bulletin published"
                        ),
                        _ => warn!(province = province.code(), %date, "No data available"),
                    }
                    status
                }
                Err(e) => {
                    error!(province = province.code(), error = %e, "Province failed");
                    progress.println(&format!("{}: {}", province.display_name(), e));
                    ProvinceStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            outcomes.push(ProvinceOutcome { province, status });
            progress.increment(1);
        }

        RunSummary { date, outcomes }
    }

    fn remote(&self) -> Result<&Remote> {
        self.remote
            .as_ref()
            .ok_or_else(|| BulletinError::Config("no datastore client configured".to_string()))
    }
}
