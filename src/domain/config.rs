//! Per-institution configuration.
//!
//! One `InstitutionConfig` describes everything the engine needs to know about
//! a central bank: the current policy rate, how its futures are quoted, the
//! meeting calendar with an explicit contract for each meeting, the declared
//! decision scenarios with their probability curve, and the data-quality
//! thresholds.
//!
//! The structure mirrors the YAML files in `configs/`. Unknown keys are
//! rejected so that a typo never silently turns into a missing rule.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Bias, ContractId, MeetingId, ScenarioLabel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstitutionConfig {
    pub institution: InstitutionInfo,
    pub current_rate: CurrentRate,
    pub futures: FuturesSpec,
    /// Meeting calendar, ordered by date.
    pub meetings: Vec<Meeting>,
    /// Explicit meeting → contract table. Never inferred.
    pub contract_mapping: BTreeMap<MeetingId, ContractId>,
    pub probability: ProbabilitySpec,
    pub data_quality_thresholds: QualityThresholds,
    #[serde(default)]
    pub meeting_adjustment: MeetingAdjustment,
}

impl InstitutionConfig {
    pub fn id(&self) -> &str {
        &self.institution.id
    }

    /// Calendar meetings dated on or after `run_date`, in calendar order.
    pub fn upcoming_meetings(&self, run_date: NaiveDate) -> Vec<&Meeting> {
        self.meetings.iter().filter(|m| m.date >= run_date).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstitutionInfo {
    /// Short code, e.g. `FED`, `ECB`. Used in file names and error context.
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrentRate {
    /// Current policy rate in percent.
    pub value: f64,
    /// Size of a standard policy move in bp. Required by `rate_grid_v1` and
    /// by `day_weighted` meeting adjustment.
    #[serde(default)]
    pub increment_bp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FuturesSpec {
    /// Exchange product root (informational), e.g. `ZQ`.
    #[serde(default)]
    pub product: Option<String>,
    /// Price → rate formula identifier (see `engine::rate`).
    pub price_formula: String,
    /// Label written into report metadata, e.g. `barchart`.
    pub data_source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Meeting {
    pub id: MeetingId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbabilitySpec {
    /// Method identifier (see `engine::probability`).
    pub method: String,
    pub neutral_threshold_bp: f64,
    /// Declared decision scenarios, in display order.
    pub scenarios: Vec<ScenarioSpec>,
    #[serde(default)]
    pub curve: ProbabilityCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    pub label: ScenarioLabel,
    /// Policy move this scenario stands for, in bp (e.g. `-25` for a cut).
    #[serde(default)]
    pub move_bp: Option<f64>,
}

/// Per-bias weight rules for `linear_distance_v1.5`.
///
/// Scenarios without a rule in the active bias get zero weight.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbabilityCurve {
    #[serde(default)]
    pub dovish: Vec<CurveRule>,
    #[serde(default)]
    pub neutral: Vec<CurveRule>,
    #[serde(default)]
    pub hawkish: Vec<CurveRule>,
}

impl ProbabilityCurve {
    pub fn rules(&self, bias: Bias) -> &[CurveRule] {
        match bias {
            Bias::Dovish => &self.dovish,
            Bias::Neutral => &self.neutral,
            Bias::Hawkish => &self.hawkish,
        }
    }
}

/// `raw_weight = max(weight + slope_per_bp * distance_bp, 0)`, where
/// `distance_bp` is how far the spread sits beyond the neutrality threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurveRule {
    pub scenario: ScenarioLabel,
    pub weight: f64,
    pub slope_per_bp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityThresholds {
    #[serde(default)]
    pub aggregation: QualityAggregation,
    pub high: TierThresholds,
    pub medium: TierThresholds,
}

/// Minimums a contract must reach (and the bid/ask maximum it must stay
/// under) for a criterion to be graded at this tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierThresholds {
    pub min_open_interest: u64,
    pub min_daily_volume: u64,
    #[serde(default)]
    pub max_bid_ask_spread_bp: Option<f64>,
}

/// How per-criterion tiers combine into one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityAggregation {
    /// Most conservative tier among evaluated criteria.
    #[default]
    Worst,
    /// Most frequent tier; ties go to the more conservative tier.
    Majority,
}

/// Optional post-processing of monthly-average contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingAdjustment {
    #[default]
    None,
    /// Derive the rate expected after each meeting from day-weighted monthly averages.
    DayWeighted,
}
