use crate::error::{BulletinError, Result};
use crate::query::validate_resource_id;
use crate::readers::RetryPolicy;
use crate::utils::constants::*;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use validator::Validate;

/// Runtime settings, layered: defaults, then the TOML file, then
/// `AQ_BULLETIN_*` environment variables. CLI flags are applied last by
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(length(min = 1))]
    pub endpoint: String,

    #[validate(length(equal = 36))]
    pub resource_id: String,

    pub stations_file: PathBuf,

    pub output_dir: PathBuf,

    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,

    pub retry_base_delay_ms: u64,

    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub min_coverage: f64,
}

impl Settings {
    /// Loads settings. An explicit file must exist; the default
    /// `aq-bulletin.toml` is used only if present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => File::new(&path.to_string_lossy(), FileFormat::Toml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
        };

        let config = Self::defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.check()?;
        debug!(?settings, "Loaded settings");
        Ok(settings)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("resource_id", DEFAULT_RESOURCE_ID)?
            .set_default("stations_file", DEFAULT_STATIONS_FILE)?
            .set_default("output_dir", DEFAULT_OUTPUT_DIR)?
            .set_default("retry_attempts", DEFAULT_RETRY_ATTEMPTS as i64)?
            .set_default("retry_base_delay_ms", DEFAULT_RETRY_BASE_DELAY_MS as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("min_coverage", DEFAULT_MIN_COVERAGE)?)
    }

    /// Field ranges plus the shape checks that need more than a range
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(BulletinError::Config(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        validate_resource_id(&self.resource_id)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            stations_file: PathBuf::from(DEFAULT_STATIONS_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }
}
