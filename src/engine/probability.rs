//! Spread → scenario probabilities.
//!
//! Two explicitly selected methods are available:
//!
//! - `linear_distance_v1.5`: classify the spread against the neutrality
//!   threshold (dovish / neutral / hawkish), then weight the declared scenarios
//!   with the configured per-bias linear rules applied to the distance beyond
//!   the threshold.
//! - `rate_grid_v1`: project the implied move on the policy increment grid and
//!   split the mass between the two adjacent grid levels.
//!
//! Both end with the same normalization: weights are scaled to 100 and
//! expressed in hundredths of a percent using largest-remainder rounding, so
//! the total is exactly 100.00 and a larger weight never gets a smaller share.

use crate::domain::{
    Bias, InstitutionConfig, ProbabilityCurve, ProbabilityDistribution, ScenarioSpec, round_dp,
};
use crate::error::EngineError;

/// Hundredths of a percent in a full distribution.
const TOTAL_UNITS: u64 = 10_000;
const UNITS_PER_PERCENT: f64 = 100.0;
const GRID_EPS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbabilityMethod {
    LinearDistanceV1_5,
    RateGridV1,
}

impl ProbabilityMethod {
    pub const IDS: [(&'static str, ProbabilityMethod); 2] = [
        ("linear_distance_v1.5", ProbabilityMethod::LinearDistanceV1_5),
        ("rate_grid_v1", ProbabilityMethod::RateGridV1),
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::IDS
            .iter()
            .find(|(name, _)| *name == id.trim())
            .map(|(_, method)| *method)
    }

    pub fn id(self) -> &'static str {
        match self {
            ProbabilityMethod::LinearDistanceV1_5 => "linear_distance_v1.5",
            ProbabilityMethod::RateGridV1 => "rate_grid_v1",
        }
    }
}

/// Decimal places a spread is snapped to before any comparison, so that a quote
/// sitting on a band edge in decimal terms is treated as on the edge.
const SPREAD_DP: i32 = 9;

/// Spread with binary conversion noise removed (e.g. `12.500000000000577` → `12.5`).
pub fn snap_spread(spread_bp: f64) -> f64 {
    round_dp(spread_bp, SPREAD_DP)
}

/// Classify a spread against the neutrality band. `±threshold` is neutral.
pub fn classify(spread_bp: f64, threshold_bp: f64) -> Bias {
    let spread_bp = snap_spread(spread_bp);
    if spread_bp < -threshold_bp {
        Bias::Dovish
    } else if spread_bp > threshold_bp {
        Bias::Hawkish
    } else {
        Bias::Neutral
    }
}

/// How far the spread sits beyond the threshold, clamped at 0.
pub fn excess_distance(spread_bp: f64, threshold_bp: f64) -> f64 {
    (snap_spread(spread_bp).abs() - threshold_bp).max(0.0)
}

/// Raw `linear_distance_v1.5` weights, one per declared scenario.
pub fn linear_weights(
    spread_bp: f64,
    threshold_bp: f64,
    scenarios: &[ScenarioSpec],
    curve: &ProbabilityCurve,
) -> Vec<f64> {
    let rules = curve.rules(classify(spread_bp, threshold_bp));
    let distance = excess_distance(spread_bp, threshold_bp);
    scenarios
        .iter()
        .map(|scenario| {
            rules
                .iter()
                .filter(|rule| rule.scenario == scenario.label)
                .map(|rule| (rule.weight + rule.slope_per_bp * distance).max(0.0))
                .sum()
        })
        .collect()
}

/// Raw `rate_grid_v1` weights, one per declared scenario.
///
/// The move is clamped to the declared scenario range, then split linearly
/// between the grid levels `lo = floor(move / increment) * increment` and
/// `lo + increment`. Each level must be the `move_bp` of some scenario.
pub fn grid_weights(spread_bp: f64, increment_bp: f64, scenarios: &[ScenarioSpec]) -> Result<Vec<f64>, String> {
    if !(increment_bp.is_finite() && increment_bp > 0.0) {
        return Err(format!("increment must be finite and > 0, got {increment_bp}"));
    }

    let mut moves = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let m = scenario
            .move_bp
            .ok_or_else(|| format!("scenario `{}` has no move_bp", scenario.label))?;
        moves.push(m);
    }
    let lowest = moves.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = moves.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(lowest.is_finite() && highest.is_finite()) {
        return Err("no scenario declares a finite move_bp".to_string());
    }

    let clamped = snap_spread(spread_bp).clamp(lowest, highest);
    let lo = (clamped / increment_bp).floor() * increment_bp;
    let hi = lo + increment_bp;
    let p_hi = (clamped - lo) / increment_bp;

    let mut weights = vec![0.0; scenarios.len()];
    for (level, p) in [(lo, 1.0 - p_hi), (hi, p_hi)] {
        if p <= GRID_EPS {
            continue;
        }
        let idx = moves
            .iter()
            .position(|m| (m - level).abs() < GRID_EPS)
            .ok_or_else(|| format!("no scenario declares move_bp {level}"))?;
        weights[idx] += p;
    }
    Ok(weights)
}

/// Scale weights to a distribution summing to exactly 100.00.
///
/// Returns `None` when the weights carry no mass.
pub fn normalize(scenarios: &[ScenarioSpec], weights: &[f64]) -> Option<ProbabilityDistribution> {
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) || weights.iter().any(|w| *w < 0.0) {
        return None;
    }

    let exact: Vec<f64> = weights.iter().map(|w| w / total * TOTAL_UNITS as f64).collect();
    let mut units: Vec<u64> = exact.iter().map(|e| e.floor() as u64).collect();
    let assigned: u64 = units.iter().sum();
    let mut remaining = TOTAL_UNITS.saturating_sub(assigned);

    // Largest remainder first; ties go to the earlier declared scenario.
    let mut order: Vec<usize> = (0..exact.len()).filter(|&i| weights[i] > 0.0).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
    });
    for idx in order {
        if remaining == 0 {
            break;
        }
        units[idx] += 1;
        remaining -= 1;
    }

    let entries = scenarios
        .iter()
        .zip(units)
        .map(|(scenario, u)| (scenario.label.clone(), u as f64 / UNITS_PER_PERCENT))
        .collect();
    Some(ProbabilityDistribution::new(entries))
}

/// `linear_distance_v1.5` on explicit inputs.
///
/// A single declared scenario always receives 100. Returns `None` when the
/// active bias yields no weight at all.
pub fn distribute(
    spread_bp: f64,
    threshold_bp: f64,
    scenarios: &[ScenarioSpec],
    curve: &ProbabilityCurve,
) -> Option<ProbabilityDistribution> {
    if let [only] = scenarios {
        return Some(ProbabilityDistribution::new(vec![(only.label.clone(), 100.0)]));
    }
    normalize(scenarios, &linear_weights(spread_bp, threshold_bp, scenarios, curve))
}

/// The probability settings of one institution, checked for use.
#[derive(Debug, Clone)]
pub struct ProbabilityModel<'a> {
    institution: &'a str,
    method: ProbabilityMethod,
    threshold_bp: f64,
    increment_bp: Option<f64>,
    scenarios: &'a [ScenarioSpec],
    curve: &'a ProbabilityCurve,
}

impl<'a> ProbabilityModel<'a> {
    pub fn from_config(config: &'a InstitutionConfig) -> Result<Self, EngineError> {
        let institution = config.id();
        let spec = &config.probability;

        let method = ProbabilityMethod::from_id(&spec.method).ok_or_else(|| {
            let known: Vec<&str> = ProbabilityMethod::IDS.iter().map(|(name, _)| *name).collect();
            EngineError::config(
                institution,
                "probability.method",
                format!("unknown method `{}` (expected one of: {})", spec.method, known.join(", ")),
            )
        })?;

        let threshold_bp = spec.neutral_threshold_bp;
        if !(threshold_bp.is_finite() && threshold_bp >= 0.0) {
            return Err(EngineError::config(
                institution,
                "probability.neutral_threshold_bp",
                format!("must be finite and >= 0, got {threshold_bp}"),
            ));
        }

        if spec.scenarios.is_empty() {
            return Err(EngineError::config(
                institution,
                "probability.scenarios",
                "at least one scenario must be declared",
            ));
        }

        Ok(Self {
            institution,
            method,
            threshold_bp,
            increment_bp: config.current_rate.increment_bp,
            scenarios: &spec.scenarios,
            curve: &spec.curve,
        })
    }

    pub fn method(&self) -> ProbabilityMethod {
        self.method
    }

    pub fn threshold_bp(&self) -> f64 {
        self.threshold_bp
    }

    pub fn distribute(&self, spread_bp: f64) -> Result<ProbabilityDistribution, EngineError> {
        match self.method {
            ProbabilityMethod::LinearDistanceV1_5 => {
                distribute(spread_bp, self.threshold_bp, self.scenarios, self.curve).ok_or_else(|| {
                    let bias = classify(spread_bp, self.threshold_bp);
                    EngineError::config(
                        self.institution,
                        format!("probability.curve.{}", bias.label()),
                        format!("rules give no weight to any scenario at spread {spread_bp:.4}bp"),
                    )
                })
            }
            ProbabilityMethod::RateGridV1 => {
                if let [only] = self.scenarios {
                    return Ok(ProbabilityDistribution::new(vec![(only.label.clone(), 100.0)]));
                }
                let increment = self.increment_bp.ok_or_else(|| {
                    EngineError::config(
                        self.institution,
                        "current_rate.increment_bp",
                        "required by rate_grid_v1",
                    )
                })?;
                let weights = grid_weights(spread_bp, increment, self.scenarios)
                    .map_err(|msg| EngineError::config(self.institution, "probability.scenarios", msg))?;
                normalize(self.scenarios, &weights).ok_or_else(|| {
                    EngineError::config(self.institution, "probability.scenarios", "grid split carries no mass")
                })
            }
        }
    }
}
