//! One engine pass for one institution.
//!
//! quotes + config → implied rates → spreads → next-meeting probabilities,
//! with quality scoring over the same resolved contracts, then assembly.
//! The pass either returns a complete `Report` or the first fatal error.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::domain::{
    ContractQuote, InstitutionConfig, MeetingAdjustment, QuoteTable, Report, ReportMetadata, ResolvedRate,
};
use crate::engine::assemble::{REPORT_SCHEMA_VERSION, assemble};
use crate::engine::meeting::{MonthlyPoint, after_meeting_chain};
use crate::engine::probability::ProbabilityModel;
use crate::engine::quality::assess_all;
use crate::engine::rate::{PriceFormula, convert};
use crate::engine::resolver::ContractResolver;
use crate::engine::spread::spread_bp;
use crate::engine::ENGINE_VERSION;
use crate::error::EngineError;

/// Run the engine for one institution as of `run_date`.
pub fn run_institution(
    config: &InstitutionConfig,
    quotes: &QuoteTable,
    run_date: NaiveDate,
    data_source: &str,
) -> Result<Report, EngineError> {
    let institution = config.id();
    let formula = PriceFormula::resolve(institution, &config.futures.price_formula)?;
    let model = ProbabilityModel::from_config(config)?;

    let current_rate = config.current_rate.value;
    if !current_rate.is_finite() {
        return Err(EngineError::config(
            institution,
            "current_rate.value",
            format!("must be finite, got {current_rate}"),
        ));
    }

    let meetings = config.upcoming_meetings(run_date);
    let Some(next) = meetings.first() else {
        return Err(EngineError::assembly(
            institution,
            format!("no meeting in the calendar on or after {run_date}"),
        ));
    };
    let next_meeting = next.id.clone();

    // Resolve every upcoming meeting; any gap fails the whole run.
    let resolver = ContractResolver::for_config(config);
    let mut points = Vec::with_capacity(meetings.len());
    let mut used: Vec<&ContractQuote> = Vec::new();
    let mut seen = HashSet::new();
    for meeting in meetings.iter().copied() {
        let contract = resolver.resolve(&meeting.id)?;
        let quote = quotes.get(contract).ok_or_else(|| EngineError::QuoteMissing {
            institution: institution.to_string(),
            meeting: meeting.id.clone(),
            contract: contract.clone(),
        })?;
        let implied_rate = convert(quote.price, formula);
        debug!(
            institution,
            meeting = %meeting.id,
            contract = %contract,
            price = quote.price,
            implied_rate,
            "resolved meeting"
        );
        points.push(MonthlyPoint {
            meeting,
            contract,
            implied_rate,
        });
        if seen.insert(contract) {
            used.push(quote);
        }
    }

    let after_meeting = match config.meeting_adjustment {
        MeetingAdjustment::None => vec![None; points.len()],
        MeetingAdjustment::DayWeighted => {
            let increment = config.current_rate.increment_bp.ok_or_else(|| {
                EngineError::config(institution, "current_rate.increment_bp", "required by day_weighted adjustment")
            })?;
            after_meeting_chain(institution, current_rate, increment, &points)?
                .into_iter()
                .map(Some)
                .collect()
        }
    };

    let curve: Vec<ResolvedRate> = points
        .iter()
        .zip(after_meeting)
        .map(|(point, after_meeting)| ResolvedRate {
            meeting_id: point.meeting.id.clone(),
            contract_id: point.contract.clone(),
            implied_rate: point.implied_rate,
            spread_bp: spread_bp(point.implied_rate, current_rate),
            after_meeting,
        })
        .collect();

    let qualities = assess_all(&used, &config.data_quality_thresholds);
    for q in qualities.iter().filter(|q| q.level.is_degraded()) {
        warn!(institution, contract = %q.contract_id, level = q.level.label(), "degraded data quality");
    }

    let next_spread = curve[0].spread_bp;
    let distribution = model.distribute(next_spread)?;
    info!(
        institution,
        next_meeting = %next_meeting,
        spread_bp = next_spread,
        bias = crate::engine::probability::classify(next_spread, model.threshold_bp()).label(),
        meetings = curve.len(),
        "computed next-meeting probabilities"
    );

    let metadata = ReportMetadata {
        schema_version: REPORT_SCHEMA_VERSION,
        institution: institution.to_string(),
        run_date,
        engine_version: ENGINE_VERSION.to_string(),
        data_source: data_source.to_string(),
        probability_method: model.method().id().to_string(),
        neutral_threshold_bp: model.threshold_bp(),
        current_rate,
        next_meeting,
    };

    assemble(curve, Some(distribution), qualities, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractId, MeetingId, QualityLevel};

    const FED_YAML: &str = include_str!("../../configs/fed.yaml");
    const ECB_YAML: &str = include_str!("../../configs/ecb.yaml");

    fn config(yaml: &str) -> InstitutionConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn quote(id: &str, price: f64, oi: Option<u64>, volume: Option<u64>) -> ContractQuote {
        ContractQuote {
            contract_id: ContractId::from(id),
            price,
            open_interest: oi,
            volume,
            bid_ask_spread_bp: None,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fed_quotes() -> QuoteTable {
        QuoteTable::new(vec![
            quote("ZQX26", 95.20, Some(250_000), Some(40_000)),
            quote("ZQZ26", 95.30, Some(180_000), Some(20_000)),
            quote("ZQG27", 95.40, Some(60_000), Some(3_000)),
            quote("ZQH27", 95.50, Some(5_000), None),
        ])
    }

    #[test]
    fn fed_dovish_scenario() {
        let fed = config(FED_YAML);
        let report = run_institution(&fed, &fed_quotes(), date("2026-10-16"), "barchart").unwrap();

        assert_eq!(report.metadata.institution, "FED");
        assert_eq!(report.metadata.next_meeting, MeetingId::from("2026-10-28"));
        assert_eq!(report.metadata.probability_method, "linear_distance_v1.5");
        assert_eq!(report.curve.len(), 4);

        let next = &report.curve[0];
        assert_eq!(next.contract_id.as_str(), "ZQX26");
        assert!((next.implied_rate - 4.80).abs() < 1e-9);
        assert!((next.spread_bp - -20.0).abs() < 1e-9);

        let p = &report.next_meeting_probabilities;
        let hold = p.get("hold").unwrap();
        assert!(p.get("cut").unwrap() > hold);
        assert!(p.get("double_cut").unwrap() > hold);
        assert!((p.total() - 100.0).abs() < 0.01);

        // Day-weighted adjustment is configured for the FED sample.
        assert!(report.curve.iter().all(|r| r.after_meeting.is_some()));

        let levels: Vec<QualityLevel> = report.quality.iter().map(|q| q.level).collect();
        assert_eq!(
            levels,
            [QualityLevel::High, QualityLevel::High, QualityLevel::Medium, QualityLevel::Low]
        );
    }

    #[test]
    fn ecb_neutral_scenario() {
        let ecb = config(ECB_YAML);
        let quotes = QuoteTable::new(vec![
            quote("ESTX26", 96.00, Some(90_000), Some(12_000)),
            quote("ESTZ26", 96.05, Some(70_000), Some(8_000)),
            quote("ESTH27", 96.10, None, None),
        ]);
        let report = run_institution(&ecb, &quotes, date("2026-10-16"), "eurex").unwrap();

        assert!(report.curve[0].spread_bp.abs() < 1e-9);
        let p = &report.next_meeting_probabilities;
        assert_eq!(p.get("hold"), Some(100.0));
        assert_eq!(p.get("cut"), Some(0.0));
        assert_eq!(p.get("hike"), Some(0.0));
        assert_eq!(report.metadata.data_source, "eurex");
        assert_eq!(report.quality.last().unwrap().level, QualityLevel::Unavailable);
    }

    #[test]
    fn quotes_on_the_band_edge_are_neutral() {
        let mut ecb = config(ECB_YAML);
        ecb.current_rate.value = 2.15;
        for price in [97.725, 97.975] {
            let quotes = QuoteTable::new(vec![
                quote("ESTX26", price, Some(90_000), Some(12_000)),
                quote("ESTZ26", 97.80, Some(70_000), Some(8_000)),
                quote("ESTH27", 97.80, Some(40_000), Some(5_000)),
            ]);
            let report = run_institution(&ecb, &quotes, date("2026-10-16"), "eurex").unwrap();

            assert!((report.curve[0].spread_bp.abs() - 12.5).abs() < 1e-9);
            let p = &report.next_meeting_probabilities;
            assert_eq!(p.get("hold"), Some(100.0), "price {price}");
            assert_eq!(p.get("cut"), Some(0.0), "price {price}");
            assert_eq!(p.get("hike"), Some(0.0), "price {price}");
        }
    }

    #[test]
    fn past_meetings_are_not_required() {
        let fed = config(FED_YAML);
        let report = run_institution(&fed, &fed_quotes(), date("2026-12-01"), "barchart").unwrap();
        assert_eq!(report.metadata.next_meeting, MeetingId::from("2026-12-09"));
        assert_eq!(report.curve.len(), 3);
    }

    #[test]
    fn missing_mapping_fails_the_whole_run() {
        let mut fed = config(FED_YAML);
        fed.contract_mapping.remove(&MeetingId::from("2027-01-27"));
        let err = run_institution(&fed, &fed_quotes(), date("2026-10-16"), "barchart").unwrap_err();
        assert_eq!(
            err,
            EngineError::MappingMissing {
                institution: "FED".to_string(),
                meeting: MeetingId::from("2027-01-27"),
            }
        );
    }

    #[test]
    fn missing_quote_fails_the_whole_run() {
        let fed = config(FED_YAML);
        let quotes = QuoteTable::new(vec![quote("ZQX26", 95.20, None, None)]);
        let err = run_institution(&fed, &quotes, date("2026-10-16"), "barchart").unwrap_err();
        assert!(matches!(err, EngineError::QuoteMissing { ref contract, .. } if contract.as_str() == "ZQZ26"));
    }

    #[test]
    fn unknown_formula_fails_before_any_computation() {
        let mut fed = config(FED_YAML);
        fed.futures.price_formula = "inverse".to_string();
        let err = run_institution(&fed, &fed_quotes(), date("2026-10-16"), "barchart").unwrap_err();
        assert!(matches!(err, EngineError::Configuration { ref field, .. } if field == "futures.price_formula"));
    }

    #[test]
    fn no_upcoming_meeting_is_an_assembly_error() {
        let fed = config(FED_YAML);
        let err = run_institution(&fed, &fed_quotes(), date("2028-01-01"), "barchart").unwrap_err();
        assert!(matches!(err, EngineError::Assembly { .. }));
    }

    #[test]
    fn inputs_are_left_untouched() {
        let fed = config(FED_YAML);
        let quotes = fed_quotes();
        let before = (fed.clone(), quotes.iter().cloned().collect::<Vec<_>>());
        run_institution(&fed, &quotes, date("2026-10-16"), "barchart").unwrap();
        assert_eq!(before.0, fed);
        assert_eq!(before.1, quotes.iter().cloned().collect::<Vec<_>>());
    }
}
