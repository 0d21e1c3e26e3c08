//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine stays free of presentation concerns
//! - output changes are localized (one file to touch when a column moves)

use crate::domain::{ContractId, InstitutionConfig, QualityAssessment, Report, ResolvedRate};
use crate::engine::rate::PriceFormula;
use crate::io::ingest::RowError;
use crate::report::outlook;

/// Format the full run summary: metadata, probabilities, curve and quality.
pub fn format_report_summary(report: &Report) -> String {
    let meta = &report.metadata;
    let view = outlook(report);
    let mut out = String::new();

    out.push_str(&format!("=== odds - {} policy outlook ===\n", meta.institution));
    out.push_str(&format!("Run date: {} | source: {}\n", meta.run_date, meta.data_source));
    out.push_str(&format!(
        "Current rate: {:.2}% | method: {} | neutral band: ±{}bp\n",
        meta.current_rate, meta.probability_method, meta.neutral_threshold_bp
    ));

    out.push_str(&format!(
        "\nNext meeting {}: {:+.1}bp ({})\n",
        meta.next_meeting,
        view.spread_bp,
        view.bias.label()
    ));
    for (label, p) in report.next_meeting_probabilities.iter() {
        let marker = match view.most_likely {
            Some((best, _)) if best == label => "*",
            _ => " ",
        };
        out.push_str(format!("{marker} {:<14} {:>6.2}%  {}\n", label.as_str(), p, bar(p)).trim_end());
        out.push('\n');
    }

    out.push_str("\nImplied curve:\n");
    out.push_str(&format_curve_table(&report.curve, &report.quality));

    if view.degraded.is_empty() {
        out.push_str("\nData quality: all contracts medium or better\n");
    } else {
        out.push_str("\nData quality warnings:\n");
        for (contract, level) in &view.degraded {
            let weak = weak_criteria(&report.quality, contract);
            if weak.is_empty() {
                out.push_str(&format!("- {contract}: {}\n", level.label()));
            } else {
                out.push_str(&format!("- {contract}: {} ({})\n", level.label(), weak.join(", ")));
            }
        }
    }

    out
}

/// Criteria that scored `low` or worse for a contract.
fn weak_criteria(quality: &[QualityAssessment], contract: &ContractId) -> Vec<&'static str> {
    quality
        .iter()
        .filter(|q| &q.contract_id == contract)
        .flat_map(|q| &q.factors_considered)
        .filter(|f| f.level.is_degraded())
        .map(|f| f.criterion.label())
        .collect()
}

fn format_curve_table(curve: &[ResolvedRate], quality: &[QualityAssessment]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<12} {:<10} {:>10} {:>10} {:>10} {:<12}\n",
            "meeting", "contract", "implied", "spread_bp", "after", "quality"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<10} {:-<10} {:-<10} {:-<10} {:-<12}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in curve {
        let level = quality
            .iter()
            .find(|q| q.contract_id == r.contract_id)
            .map(|q| q.level.label())
            .unwrap_or("-");
        let after = r
            .after_meeting
            .as_ref()
            .map(|a| format!("{:.3}", a.rate))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<12} {:<10} {:>10.4} {:>+10.2} {:>10} {:<12}\n",
                truncate(r.meeting_id.as_str(), 12),
                truncate(r.contract_id.as_str(), 10),
                r.implied_rate,
                r.spread_bp,
                after,
                level,
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Summarize skipped CSV rows, showing at most `max` of them.
pub fn format_row_errors(errors: &[RowError], max: usize) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("Skipped {} quote row(s):\n", errors.len());
    for e in errors.iter().take(max) {
        let contract = e.contract.as_deref().unwrap_or("-");
        out.push_str(&format!("  line {:>4} [{}] {}\n", e.line, truncate(contract, 16), e.message));
    }
    if errors.len() > max {
        out.push_str(&format!("  ... {} more\n", errors.len() - max));
    }
    out
}

/// One-screen view of a validated config, used by `odds check`.
pub fn format_config_summary(config: &InstitutionConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", config.institution.name, config.id()));
    out.push_str(&format!(
        "  current rate: {:.2}%{}\n",
        config.current_rate.value,
        config
            .current_rate
            .increment_bp
            .map(|i| format!(" (steps of {i}bp)"))
            .unwrap_or_default()
    ));
    let formula = PriceFormula::from_id(&config.futures.price_formula)
        .map(PriceFormula::id)
        .unwrap_or(config.futures.price_formula.as_str());
    out.push_str(&format!(
        "  futures: {} via {} [{}]\n",
        config.futures.product.as_deref().unwrap_or("-"),
        formula,
        config.futures.data_source
    ));
    out.push_str(&format!(
        "  probability: {} | neutral band ±{}bp\n",
        config.probability.method, config.probability.neutral_threshold_bp
    ));
    let labels: Vec<&str> = config.probability.scenarios.iter().map(|s| s.label.as_str()).collect();
    out.push_str(&format!("  scenarios: {}\n", labels.join(", ")));
    out.push_str(&format!("  meetings ({}):\n", config.meetings.len()));
    for m in &config.meetings {
        let contract = config
            .contract_mapping
            .get(&m.id)
            .map(|c| c.as_str())
            .unwrap_or("?");
        out.push_str(&format!("    {}  {:<12} -> {}\n", m.date, m.id.as_str(), contract));
    }
    out
}

fn bar(p: f64) -> String {
    let n = (p / 2.5).round().clamp(0.0, 40.0) as usize;
    "#".repeat(n)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{
        MeetingId, ProbabilityDistribution, QualityCriterion, QualityFactor, QualityLevel, ReportMetadata,
        ScenarioLabel,
    };
    use crate::io::config::parse_institution_config;

    fn report() -> Report {
        Report {
            metadata: ReportMetadata {
                schema_version: 1,
                institution: "FED".to_string(),
                run_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
                engine_version: "rate-odds/test".to_string(),
                data_source: "barchart".to_string(),
                probability_method: "linear_distance_v1.5".to_string(),
                neutral_threshold_bp: 12.5,
                current_rate: 5.0,
                next_meeting: MeetingId::from("2026-10-28"),
            },
            curve: vec![
                ResolvedRate {
                    meeting_id: MeetingId::from("2026-10-28"),
                    contract_id: ContractId::from("ZQX26"),
                    implied_rate: 4.8,
                    spread_bp: -20.0,
                    after_meeting: None,
                },
                ResolvedRate {
                    meeting_id: MeetingId::from("2026-12-09"),
                    contract_id: ContractId::from("ZQZ26"),
                    implied_rate: 4.7,
                    spread_bp: -30.0,
                    after_meeting: None,
                },
            ],
            next_meeting_probabilities: ProbabilityDistribution::new(vec![
                (ScenarioLabel::from("double_cut"), 38.46),
                (ScenarioLabel::from("cut"), 50.0),
                (ScenarioLabel::from("hold"), 11.54),
            ]),
            quality: vec![
                QualityAssessment {
                    contract_id: ContractId::from("ZQX26"),
                    level: QualityLevel::High,
                    factors_considered: Vec::new(),
                },
                QualityAssessment {
                    contract_id: ContractId::from("ZQZ26"),
                    level: QualityLevel::Unavailable,
                    factors_considered: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn summary_marks_mode_bias_and_degraded_contracts() {
        let text = format_report_summary(&report());
        assert!(text.contains("Next meeting 2026-10-28: -20.0bp (dovish)"));
        assert!(text.contains("* cut"));
        assert!(text.contains("  double_cut"));
        assert!(text.contains("- ZQZ26: unavailable"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn degraded_contracts_name_their_weak_criteria() {
        let mut report = report();
        report.quality[1] = QualityAssessment {
            contract_id: ContractId::from("ZQZ26"),
            level: QualityLevel::Low,
            factors_considered: vec![
                QualityFactor {
                    criterion: QualityCriterion::OpenInterest,
                    value: 4_000.0,
                    level: QualityLevel::Low,
                },
                QualityFactor {
                    criterion: QualityCriterion::Volume,
                    value: 2_500.0,
                    level: QualityLevel::Medium,
                },
                QualityFactor {
                    criterion: QualityCriterion::BidAskSpread,
                    value: 3.0,
                    level: QualityLevel::Low,
                },
            ],
        };
        let text = format_report_summary(&report);
        assert!(text.contains("- ZQZ26: low (open_interest, bid_ask_spread)"), "{text}");
    }

    #[test]
    fn row_errors_are_capped() {
        let errors: Vec<RowError> = (0..5)
            .map(|i| RowError {
                line: i + 2,
                contract: None,
                message: "Missing price.".to_string(),
            })
            .collect();
        let text = format_row_errors(&errors, 3);
        assert!(text.starts_with("Skipped 5 quote row(s)"));
        assert!(text.contains("... 2 more"));
        assert!(format_row_errors(&[], 3).is_empty());
    }

    #[test]
    fn config_summary_lists_mapping() {
        let config = parse_institution_config(include_str!("../../configs/ecb.yaml")).unwrap();
        let text = format_config_summary(&config);
        assert!(text.contains("European Central Bank (ECB)"));
        assert!(text.contains("-> ESTZ26"));
        assert!(text.contains("scenarios: cut, hold, hike"));
        // `default` is shown under its canonical name.
        assert!(text.contains("via 100_minus_rate ["), "{text}");
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("ABCDEFGHIJ", 5), "ABCD.");
        assert_eq!(truncate("ABC", 5), "ABC");
    }
}
