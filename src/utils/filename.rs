use crate::models::Province;
use chrono::{Duration, Local, NaiveDate};
use std::path::{Path, PathBuf};

/// Bulletins are normally issued for the previous, complete day
pub fn default_bulletin_date() -> NaiveDate {
    Local::now().date_naive() - Duration::days(1)
}

/// Directory holding every file of one day: `<output>/<YYYY-MM-DD>`
pub fn bulletin_dir(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(date.format("%Y-%m-%d").to_string())
}

/// `<code>.<extension>`, e.g. `bo.html`
pub fn province_file(province: Province, extension: &str) -> String {
    format!("{}.{}", province.code().to_lowercase(), extension)
}

pub fn province_path(
    output_dir: &Path,
    date: NaiveDate,
    province: Province,
    extension: &str,
) -> PathBuf {
    bulletin_dir(output_dir, date).join(province_file(province, extension))
}
