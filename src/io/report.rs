//! Read/write report JSON files.
//!
//! Report JSON is the artifact of a run:
//! - run metadata (institution, run date, engine version, method, threshold)
//! - the implied-rate curve, one point per upcoming meeting
//! - next-meeting probabilities, keyed by scenario label in declared order
//! - one quality assessment per contract used
//!
//! The schema is defined by `domain::Report`. Numeric fields are rounded to six
//! decimals on the way out.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::domain::Report;
use crate::error::AppError;

/// Conventional output location: `<dir>/<institution>.json`.
pub fn default_report_path(dir: &Path, institution: &str) -> PathBuf {
    dir.join(format!("{}.json", institution.trim().to_ascii_lowercase()))
}

/// Write a report JSON file, creating parent directories as needed.
pub fn write_report_json(path: &Path, report: &Report) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(5, format!("Failed to create output directory '{}': {e}", parent.display()))
        })?;
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(5, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|e| AppError::new(5, format!("Failed to write report JSON: {e}")))?;
    writeln!(writer).map_err(|e| AppError::new(5, format!("Failed to write report JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(5, format!("Failed to flush report JSON '{}': {e}", path.display())))?;

    Ok(())
}

/// Read a report JSON file.
pub fn read_report_json(path: &Path) -> Result<Report, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open report JSON '{}': {e}", path.display())))?;
    let report: Report =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid report JSON: {e}")))?;
    Ok(report)
}
