pub mod bulletin_writer;
pub mod chart;
pub mod export;
pub mod html_writer;

pub use bulletin_writer::BulletinWriter;
pub use html_writer::HtmlWriter;

use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes through a temporary file in the target directory and renames it
/// into place, so readers never see a half-written bulletin.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
