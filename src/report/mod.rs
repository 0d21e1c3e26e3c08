//! Reporting utilities: a digest of each report and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Bias, ContractId, QualityLevel, Report, ScenarioLabel};
use crate::engine::probability::classify;

/// The headline of a report: where the market leans for the next meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Outlook<'a> {
    pub bias: Bias,
    pub spread_bp: f64,
    /// Most likely scenario; ties go to the earlier declared scenario.
    pub most_likely: Option<(&'a ScenarioLabel, f64)>,
    /// Contracts whose data quality is `low` or `unavailable`.
    pub degraded: Vec<(&'a ContractId, QualityLevel)>,
}

pub fn outlook(report: &Report) -> Outlook<'_> {
    let spread_bp = report.curve.first().map(|r| r.spread_bp).unwrap_or(0.0);
    Outlook {
        bias: classify(spread_bp, report.metadata.neutral_threshold_bp),
        spread_bp,
        most_likely: report.next_meeting_probabilities.mode(),
        degraded: report
            .quality
            .iter()
            .filter(|q| q.level.is_degraded())
            .map(|q| (&q.contract_id, q.level))
            .collect(),
    }
}
