use crate::analyzers::NarrativeBuilder;
use crate::error::Result;
use crate::processors::{ProvinceReport, RunSummary};
use crate::utils::constants::INDEX_FILE;
use crate::utils::filename::{bulletin_dir, province_path};
use crate::writers::export::{write_csv, write_json, write_raw};
use crate::writers::html_writer::HtmlWriter;
use crate::writers::write_atomic;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lays out one day's bulletins under `<output>/<YYYY-MM-DD>/`.
pub struct BulletinWriter {
    output_dir: PathBuf,
    save_raw: bool,
    html: HtmlWriter,
    narrative: NarrativeBuilder,
}

impl BulletinWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            save_raw: false,
            html: HtmlWriter::new(),
            narrative: NarrativeBuilder::new(),
        }
    }

    pub fn with_save_raw(mut self, save_raw: bool) -> Self {
        self.save_raw = save_raw;
        self
    }

    pub fn with_html_writer(mut self, html: HtmlWriter) -> Self {
        self.html = html;
        self
    }

    /// Writes the HTML page plus JSON and CSV exports; returns the page path
    pub fn publish(&self, report: &ProvinceReport, raw_body: Option<&str>) -> Result<PathBuf> {
        let page = province_path(&self.output_dir, report.date, report.province, "html");
        let narrative = self.narrative.build(report);
        write_atomic(&page, self.html.render_province(report, &narrative).as_bytes())?;

        write_json(
            report,
            &province_path(&self.output_dir, report.date, report.province, "json"),
        )?;
        write_csv(
            report,
            &province_path(&self.output_dir, report.date, report.province, "csv"),
        )?;

        if let (true, Some(body)) = (self.save_raw, raw_body) {
            write_raw(
                body,
                &province_path(&self.output_dir, report.date, report.province, "raw.json"),
            )?;
        }

        debug!(province = report.province.code(), path = %page.display(), "Wrote bulletin");
        Ok(page)
    }

    pub fn write_index(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = bulletin_dir(&self.output_dir, summary.date).join(INDEX_FILE);
        write_atomic(&path, self.html.render_index(summary).as_bytes())?;
        Ok(path)
    }
}
