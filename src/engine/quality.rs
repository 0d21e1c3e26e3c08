//! Data-quality scoring for the contracts a run relies on.
//!
//! Each criterion present on a quote is graded against the `high` and
//! `medium` tiers of the configured thresholds:
//!
//! - open interest and volume must reach the tier minimum
//! - the bid/ask spread must stay under the tier maximum
//!
//! Criteria whose input is missing are left out entirely, so a quote without a
//! bid/ask spread is neither penalized nor rewarded for it. The per-criterion
//! tiers are then combined with the configured aggregation rule.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::domain::{
    ContractQuote, QualityAggregation, QualityAssessment, QualityCriterion, QualityFactor, QualityLevel,
    QualityThresholds,
};

/// Grade one quote.
pub fn assess(quote: &ContractQuote, thresholds: &QualityThresholds) -> QualityAssessment {
    let mut factors = Vec::with_capacity(3);

    if let Some(oi) = quote.open_interest {
        factors.push(QualityFactor {
            criterion: QualityCriterion::OpenInterest,
            value: oi as f64,
            level: minimum_tier(oi, thresholds.high.min_open_interest, thresholds.medium.min_open_interest),
        });
    }

    if let Some(volume) = quote.volume {
        factors.push(QualityFactor {
            criterion: QualityCriterion::Volume,
            value: volume as f64,
            level: minimum_tier(volume, thresholds.high.min_daily_volume, thresholds.medium.min_daily_volume),
        });
    }

    if let Some(spread) = quote.bid_ask_spread_bp.filter(|s| s.is_finite()) {
        let tier = maximum_tier(
            spread,
            thresholds.high.max_bid_ask_spread_bp,
            thresholds.medium.max_bid_ask_spread_bp,
        );
        if let Some(level) = tier {
            factors.push(QualityFactor {
                criterion: QualityCriterion::BidAskSpread,
                value: spread,
                level,
            });
        }
    }

    QualityAssessment {
        contract_id: quote.contract_id.clone(),
        level: aggregate(&factors, thresholds.aggregation),
        factors_considered: factors,
    }
}

/// Grade several quotes in parallel. Output order follows input order.
pub fn assess_all(quotes: &[&ContractQuote], thresholds: &QualityThresholds) -> Vec<QualityAssessment> {
    quotes.par_iter().map(|quote| assess(quote, thresholds)).collect()
}

/// Combine per-criterion tiers. No evaluated criterion means `unavailable`.
pub fn aggregate(factors: &[QualityFactor], rule: QualityAggregation) -> QualityLevel {
    match rule {
        QualityAggregation::Worst => factors
            .iter()
            .map(|f| f.level)
            .min()
            .unwrap_or(QualityLevel::Unavailable),
        QualityAggregation::Majority => {
            let mut counts: BTreeMap<QualityLevel, usize> = BTreeMap::new();
            for f in factors {
                *counts.entry(f.level).or_default() += 1;
            }
            // Ascending level order, replaced only on a strictly larger count:
            // ties stay on the more conservative tier.
            let mut best: Option<(QualityLevel, usize)> = None;
            for (level, count) in counts {
                if best.is_none_or(|(_, c)| count > c) {
                    best = Some((level, count));
                }
            }
            best.map(|(level, _)| level).unwrap_or(QualityLevel::Unavailable)
        }
    }
}

fn minimum_tier(value: u64, high_min: u64, medium_min: u64) -> QualityLevel {
    if value >= high_min {
        QualityLevel::High
    } else if value >= medium_min {
        QualityLevel::Medium
    } else {
        QualityLevel::Low
    }
}

/// `None` when no tier bounds the bid/ask spread (criterion not evaluable).
fn maximum_tier(spread: f64, high_max: Option<f64>, medium_max: Option<f64>) -> Option<QualityLevel> {
    if high_max.is_none() && medium_max.is_none() {
        return None;
    }
    let passes = |max: Option<f64>| max.is_none_or(|m| spread <= m);
    let level = if passes(high_max) {
        QualityLevel::High
    } else if passes(medium_max) {
        QualityLevel::Medium
    } else {
        QualityLevel::Low
    };
    Some(level)
}
