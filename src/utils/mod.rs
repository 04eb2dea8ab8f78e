pub mod constants;
pub mod filename;
pub mod html;
pub mod progress;

pub use constants::*;
pub use filename::{bulletin_dir, default_bulletin_date, province_file, province_path};
pub use progress::ProgressReporter;
