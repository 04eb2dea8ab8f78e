pub mod cleaner;
pub mod integrity_checker;
pub mod pipeline;
pub mod rolling;
pub mod threshold_evaluator;

pub use cleaner::{CleanedData, Cleaner, CleaningStats};
pub use integrity_checker::{
    DataViolation, IntegrityChecker, IntegrityReport, StationStatistics, ViolationType,
};
pub use pipeline::{BulletinPipeline, ProvinceOutcome, ProvinceReport, ProvinceStatus, RunSummary};
pub use threshold_evaluator::ThresholdEvaluator;
