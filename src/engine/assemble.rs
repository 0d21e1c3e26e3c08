//! Final report assembly.
//!
//! Pure aggregation of already-derived values. A report is only produced when
//! every required part is present; otherwise the run fails instead of emitting
//! something partial.

use std::collections::HashSet;

use crate::domain::{ProbabilityDistribution, QualityAssessment, Report, ReportMetadata, ResolvedRate};
use crate::error::EngineError;

/// Version of the report layout. Bumped on any breaking change to the JSON shape.
pub const REPORT_SCHEMA_VERSION: u32 = 1;

pub fn assemble(
    curve: Vec<ResolvedRate>,
    distribution: Option<ProbabilityDistribution>,
    qualities: Vec<QualityAssessment>,
    metadata: ReportMetadata,
) -> Result<Report, EngineError> {
    let institution = metadata.institution.as_str();

    let Some(first) = curve.first() else {
        return Err(EngineError::assembly(institution, "no meeting could be resolved"));
    };
    if first.meeting_id != metadata.next_meeting {
        return Err(EngineError::assembly(
            institution,
            format!(
                "curve starts at meeting {} but metadata names {} as next",
                first.meeting_id, metadata.next_meeting
            ),
        ));
    }

    let distribution = distribution
        .filter(|d| !d.is_empty())
        .ok_or_else(|| EngineError::assembly(institution, "next-meeting probabilities are missing"))?;

    let assessed: HashSet<&str> = qualities.iter().map(|q| q.contract_id.as_str()).collect();
    if let Some(missing) = curve.iter().find(|r| !assessed.contains(r.contract_id.as_str())) {
        return Err(EngineError::assembly(
            institution,
            format!("no quality assessment for contract {}", missing.contract_id),
        ));
    }

    Ok(Report {
        metadata,
        curve,
        next_meeting_probabilities: distribution,
        quality: qualities,
    })
}
