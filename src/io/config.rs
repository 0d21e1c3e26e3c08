//! Institution config loading and validation.
//!
//! Configs are YAML files, one per institution, conventionally stored as
//! `<config-dir>/<code>.yaml` (e.g. `configs/fed.yaml`).
//!
//! Validation happens once, at load time, so that structural problems are
//! reported before any quote is read:
//! - every calendar meeting has an explicit contract, and nothing else does
//! - the calendar is ordered by date with unique ids
//! - formula and method identifiers are known
//! - thresholds and rates are finite and consistently ordered
//! - curve rules reference declared scenarios only

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{ContractId, InstitutionConfig, MeetingAdjustment, QualityThresholds};
use crate::engine::probability::ProbabilityMethod;
use crate::engine::rate::PriceFormula;
use crate::error::{AppError, EngineError};

/// Conventional location of an institution config.
pub fn config_path(dir: &Path, code: &str) -> PathBuf {
    dir.join(format!("{}.yaml", code.trim().to_ascii_lowercase()))
}

/// Read, parse, and validate a config file.
pub fn load_institution_config(path: &Path) -> Result<InstitutionConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
    let config = parse_institution_config(&text)
        .map_err(|e| AppError::new(e.exit_code(), format!("{} ({})", e.message(), path.display())))?;
    debug!(
        institution = config.id(),
        meetings = config.meetings.len(),
        scenarios = config.probability.scenarios.len(),
        path = %path.display(),
        "loaded config"
    );
    Ok(config)
}

/// Parse and validate config text.
pub fn parse_institution_config(text: &str) -> Result<InstitutionConfig, AppError> {
    let mut config: InstitutionConfig =
        serde_yaml::from_str(text).map_err(|e| AppError::new(2, format!("Invalid config YAML: {e}")))?;
    normalize_contract_ids(&mut config);
    validate_institution_config(&config)?;
    Ok(config)
}

/// Contract ids are matched case-insensitively: quote files are upper-cased at
/// ingest, so mapped ids are too.
fn normalize_contract_ids(config: &mut InstitutionConfig) {
    for contract in config.contract_mapping.values_mut() {
        let normalized = contract.as_str().trim().to_ascii_uppercase();
        if normalized != contract.as_str() {
            *contract = ContractId::new(normalized);
        }
    }
}

pub fn validate_institution_config(config: &InstitutionConfig) -> Result<(), EngineError> {
    let id = config.id();
    if id.trim().is_empty() {
        return Err(EngineError::config("?", "institution.id", "must not be empty"));
    }

    let rate = &config.current_rate;
    if !rate.value.is_finite() {
        return Err(EngineError::config(id, "current_rate.value", "must be finite"));
    }
    if let Some(inc) = rate.increment_bp {
        if !(inc.is_finite() && inc > 0.0) {
            return Err(EngineError::config(id, "current_rate.increment_bp", "must be finite and > 0"));
        }
    }

    PriceFormula::resolve(id, &config.futures.price_formula)?;
    validate_calendar(config)?;
    validate_probability(config)?;
    validate_quality(id, &config.data_quality_thresholds)?;

    if config.meeting_adjustment == MeetingAdjustment::DayWeighted && rate.increment_bp.is_none() {
        return Err(EngineError::config(
            id,
            "current_rate.increment_bp",
            "required by meeting_adjustment: day_weighted",
        ));
    }
    Ok(())
}

fn validate_calendar(config: &InstitutionConfig) -> Result<(), EngineError> {
    let id = config.id();
    if config.meetings.is_empty() {
        return Err(EngineError::config(id, "meetings", "calendar is empty"));
    }

    let mut ids = HashSet::new();
    for (i, meeting) in config.meetings.iter().enumerate() {
        if !ids.insert(&meeting.id) {
            return Err(EngineError::config(id, "meetings", format!("duplicate meeting id {}", meeting.id)));
        }
        if i > 0 && meeting.date <= config.meetings[i - 1].date {
            return Err(EngineError::config(
                id,
                "meetings",
                format!("meeting {} is not after the previous meeting", meeting.id),
            ));
        }
        if !config.contract_mapping.contains_key(&meeting.id) {
            return Err(EngineError::MappingMissing {
                institution: id.to_string(),
                meeting: meeting.id.clone(),
            });
        }
    }

    if let Some(orphan) = config.contract_mapping.keys().find(|m| !ids.contains(m)) {
        return Err(EngineError::config(
            id,
            format!("contract_mapping.{orphan}"),
            "maps a meeting that is not in the calendar",
        ));
    }
    Ok(())
}

fn validate_probability(config: &InstitutionConfig) -> Result<(), EngineError> {
    let id = config.id();
    let spec = &config.probability;

    let method = ProbabilityMethod::from_id(&spec.method).ok_or_else(|| {
        EngineError::config(id, "probability.method", format!("unknown method `{}`", spec.method))
    })?;

    if !(spec.neutral_threshold_bp.is_finite() && spec.neutral_threshold_bp >= 0.0) {
        return Err(EngineError::config(
            id,
            "probability.neutral_threshold_bp",
            "must be finite and >= 0",
        ));
    }

    if spec.scenarios.is_empty() {
        return Err(EngineError::config(id, "probability.scenarios", "at least one scenario is required"));
    }
    let mut labels = HashSet::new();
    for s in &spec.scenarios {
        if !labels.insert(s.label.as_str()) {
            return Err(EngineError::config(
                id,
                "probability.scenarios",
                format!("duplicate scenario label `{}`", s.label),
            ));
        }
        if s.move_bp.is_some_and(|m| !m.is_finite()) {
            return Err(EngineError::config(
                id,
                "probability.scenarios",
                format!("scenario `{}` has a non-finite move_bp", s.label),
            ));
        }
    }

    let biases = [("dovish", &spec.curve.dovish), ("neutral", &spec.curve.neutral), ("hawkish", &spec.curve.hawkish)];
    for (bias, rules) in biases {
        for rule in rules.iter() {
            let field = format!("probability.curve.{bias}");
            if !labels.contains(rule.scenario.as_str()) {
                return Err(EngineError::config(
                    id,
                    field,
                    format!("rule references undeclared scenario `{}`", rule.scenario),
                ));
            }
            if !(rule.weight.is_finite() && rule.slope_per_bp.is_finite()) {
                return Err(EngineError::config(id, field, format!("non-finite rule for `{}`", rule.scenario)));
            }
        }
    }

    let multiple = spec.scenarios.len() > 1;
    match method {
        ProbabilityMethod::LinearDistanceV1_5 if multiple => {
            for (bias, rules) in biases {
                if rules.is_empty() {
                    return Err(EngineError::config(
                        id,
                        format!("probability.curve.{bias}"),
                        "linear_distance_v1.5 needs at least one rule per bias",
                    ));
                }
            }
        }
        ProbabilityMethod::RateGridV1 if multiple => {
            let Some(inc) = config.current_rate.increment_bp else {
                return Err(EngineError::config(id, "current_rate.increment_bp", "required by rate_grid_v1"));
            };
            let mut steps = Vec::with_capacity(spec.scenarios.len());
            for s in &spec.scenarios {
                let Some(m) = s.move_bp else {
                    return Err(EngineError::config(
                        id,
                        "probability.scenarios",
                        format!("rate_grid_v1 needs move_bp on scenario `{}`", s.label),
                    ));
                };
                let ratio = m / inc;
                if (ratio - ratio.round()).abs() > 1e-9 {
                    return Err(EngineError::config(
                        id,
                        "probability.scenarios",
                        format!("move_bp {m} of `{}` is not a multiple of the {inc}bp increment", s.label),
                    ));
                }
                steps.push(ratio.round() as i64);
            }
            // Grid weights interpolate between neighbouring levels, so the
            // moves must form one contiguous ladder.
            steps.sort_unstable();
            if let Some(pair) = steps.windows(2).find(|w| w[1] - w[0] != 1) {
                let (lo, hi) = (pair[0] as f64 * inc, pair[1] as f64 * inc);
                let message = if pair[0] == pair[1] {
                    format!("rate_grid_v1 has more than one scenario at move_bp {lo}")
                } else {
                    format!("rate_grid_v1 moves must step by exactly {inc}bp; gap between {lo}bp and {hi}bp")
                };
                return Err(EngineError::config(id, "probability.scenarios", message));
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_quality(id: &str, t: &QualityThresholds) -> Result<(), EngineError> {
    let field = "data_quality_thresholds";
    if t.high.min_open_interest < t.medium.min_open_interest || t.high.min_daily_volume < t.medium.min_daily_volume {
        return Err(EngineError::config(id, field, "high tier minimums must be >= medium tier minimums"));
    }
    match (t.high.max_bid_ask_spread_bp, t.medium.max_bid_ask_spread_bp) {
        (Some(h), _) | (None, Some(h)) if !(h.is_finite() && h >= 0.0) => {
            Err(EngineError::config(id, field, "bid/ask maximums must be finite and >= 0"))
        }
        (Some(h), Some(m)) if !(m.is_finite() && m >= 0.0) || h > m => Err(EngineError::config(
            id,
            field,
            "high tier bid/ask maximum must be finite and <= medium tier maximum",
        )),
        (None, Some(_)) => Err(EngineError::config(
            id,
            field,
            "a medium tier bid/ask maximum requires a high tier maximum",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MeetingId, QualityAggregation};

    const SAMPLES: [(&str, &str); 4] = [
        ("FED", include_str!("../../configs/fed.yaml")),
        ("ECB", include_str!("../../configs/ecb.yaml")),
        ("BOE", include_str!("../../configs/boe.yaml")),
        ("SNB", include_str!("../../configs/snb.yaml")),
    ];

    fn fed() -> InstitutionConfig {
        parse_institution_config(SAMPLES[0].1).unwrap()
    }

    #[test]
    fn sample_configs_are_valid() {
        for (code, text) in SAMPLES {
            let config = parse_institution_config(text).unwrap_or_else(|e| panic!("{code}: {e}"));
            assert_eq!(config.id(), code);
        }
    }

    #[test]
    fn aggregation_defaults_to_worst() {
        let ecb = parse_institution_config(SAMPLES[1].1).unwrap();
        assert_eq!(ecb.data_quality_thresholds.aggregation, QualityAggregation::Worst);
        assert_eq!(ecb.meeting_adjustment, MeetingAdjustment::None);
    }

    #[test]
    fn config_path_is_lowercase_code() {
        assert_eq!(config_path(Path::new("configs"), "FED"), PathBuf::from("configs/fed.yaml"));
    }

    #[test]
    fn unmapped_meeting_is_rejected_at_load() {
        let mut config = fed();
        config.contract_mapping.remove(&MeetingId::from("2026-12-09"));
        let err = validate_institution_config(&config).unwrap_err();
        assert!(matches!(err, EngineError::MappingMissing { ref meeting, .. } if meeting.as_str() == "2026-12-09"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let text = SAMPLES[0].1.replace("neutral_threshold_bp", "neutral_treshold_bp");
        let err = parse_institution_config(&text).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn malformed_thresholds_are_rejected() {
        let mut config = fed();
        config.probability.neutral_threshold_bp = -1.0;
        assert!(validate_institution_config(&config).is_err());

        let mut config = fed();
        config.data_quality_thresholds.high.min_daily_volume = 10;
        assert!(validate_institution_config(&config).is_err());

        let mut config = fed();
        config.data_quality_thresholds.high.max_bid_ask_spread_bp = Some(2.0);
        assert!(validate_institution_config(&config).is_err());

        let mut config = fed();
        config.data_quality_thresholds.high.max_bid_ask_spread_bp = None;
        assert!(validate_institution_config(&config).is_err());
    }

    #[test]
    fn curve_must_reference_declared_scenarios() {
        let text = SAMPLES[0].1.replace("{ scenario: double_hike,", "{ scenario: triple_hike,");
        let err = parse_institution_config(&text).unwrap_err();
        assert!(err.message().contains("triple_hike"));
    }

    #[test]
    fn calendar_must_be_ordered() {
        let mut config = fed();
        config.meetings.swap(1, 2);
        let err = validate_institution_config(&config).unwrap_err();
        assert!(err.to_string().contains("not after"));
    }

    #[test]
    fn grid_moves_must_be_contiguous() {
        let text = SAMPLES[2].1.replace("    - { label: cut, move_bp: -25 }\n", "");
        let err = parse_institution_config(&text).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("gap between -50bp and 0bp"), "{}", err.message());

        let text = SAMPLES[2].1.replace("{ label: cut, move_bp: -25 }", "{ label: cut, move_bp: 0 }");
        let err = parse_institution_config(&text).unwrap_err();
        assert!(err.message().contains("more than one scenario"), "{}", err.message());
    }

    #[test]
    fn mapped_contracts_are_upper_cased() {
        let text = SAMPLES[0].1.replace(": ZQX26", ": \" zqx26 \"");
        assert_ne!(text, SAMPLES[0].1);
        let config = parse_institution_config(&text).unwrap();
        let mapped = &config.contract_mapping[&MeetingId::from("2026-10-28")];
        assert_eq!(mapped.as_str(), "ZQX26");
    }

    #[test]
    fn grid_method_needs_moves_on_the_grid() {
        let text = SAMPLES[2].1.replace("move_bp: -50", "move_bp: -40");
        let err = parse_institution_config(&text).unwrap_err();
        assert!(err.message().contains("multiple"));
    }
}
