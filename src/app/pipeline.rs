//! Shared "run pipeline" logic for one institution.
//!
//! config YAML -> quote CSV -> engine pass -> `Report`
//!
//! Writing and printing are left to the caller so the pipeline can be reused
//! by tests and by multi-institution runs.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::domain::{InstitutionConfig, Report};
use crate::engine::run_institution;
use crate::error::AppError;
use crate::io::config::load_institution_config;
use crate::io::ingest::{IngestedQuotes, load_quotes};

/// All computed outputs of a single institution run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: InstitutionConfig,
    pub ingest: IngestedQuotes,
    pub report: Report,
}

/// Execute the pipeline from files on disk.
pub fn run_pipeline(
    config_path: &Path,
    quotes_path: &Path,
    run_date: NaiveDate,
    data_source: Option<&str>,
) -> Result<RunOutput, AppError> {
    let config = load_institution_config(config_path)?;
    let ingest = load_quotes(quotes_path)?;
    run_with_inputs(config, ingest, run_date, data_source)
}

/// Execute the engine pass with already-loaded inputs.
pub fn run_with_inputs(
    config: InstitutionConfig,
    ingest: IngestedQuotes,
    run_date: NaiveDate,
    data_source: Option<&str>,
) -> Result<RunOutput, AppError> {
    let source = data_source.unwrap_or(&config.futures.data_source);
    let report = run_institution(&config, &ingest.table, run_date, source)?;
    info!(
        institution = config.id(),
        quotes = ingest.rows_used,
        skipped = ingest.row_errors.len(),
        "run complete"
    );
    Ok(RunOutput { config, ingest, report })
}
