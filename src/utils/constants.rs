/// Remote datastore
pub const DEFAULT_ENDPOINT: &str = "https://dati.arpae.it/api/3/action/datastore_search_sql";
pub const DEFAULT_RESOURCE_ID: &str = "a1c46cfe-46e5-44b4-9231-7d9260a38e68";

/// File names
pub const DEFAULT_CONFIG_FILE: &str = "aq-bulletin.toml";
pub const DEFAULT_STATIONS_FILE: &str = "stations.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "bulletins";
pub const INDEX_FILE: &str = "index.html";

/// Environment variable prefix for settings
pub const ENV_PREFIX: &str = "AQ_BULLETIN";

/// Network defaults
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Share of the day's hours needed for a valid daily mean
pub const DEFAULT_MIN_COVERAGE: f64 = 0.75;
pub const MIN_VALID_HOURS: usize = 18;

/// Plausibility ceilings; CO in mg/m³, everything else µg/m³
pub const MAX_PLAUSIBLE_PM: f64 = 1000.0;
pub const MAX_PLAUSIBLE_NO2: f64 = 1000.0;
pub const MAX_PLAUSIBLE_SO2: f64 = 2000.0;
pub const MAX_PLAUSIBLE_CO: f64 = 50.0;
pub const MAX_PLAUSIBLE_O3: f64 = 500.0;
pub const MAX_PLAUSIBLE_BENZENE: f64 = 100.0;

/// Hour-to-hour change treated as suspicious
pub const DEFAULT_JUMP_THRESHOLD: f64 = 300.0;
pub const CO_JUMP_THRESHOLD: f64 = 10.0;
pub const BENZENE_JUMP_THRESHOLD: f64 = 30.0;

/// Chart geometry
pub const CHART_WIDTH: u32 = 720;
pub const CHART_HEIGHT: u32 = 280;
