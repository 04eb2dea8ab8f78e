pub mod measurement;
pub mod station;
pub mod summary;
pub mod threshold;

pub use measurement::{HourlySeries, Measurement, Pollutant, HOURS_PER_DAY};
pub use station::{Province, Station};
pub use summary::{DailySummary, Evaluated, ExceedanceResult, PollutantTable, ThresholdCheck};
pub use threshold::{rules_for, Aggregation, ThresholdKind, ThresholdRule, REGULATORY_RULES};
