//! Shared domain types.
//!
//! Inputs (`ContractQuote`) and derived values (`ResolvedRate`,
//! `QualityAssessment`, `ProbabilityDistribution`, `Report`) are plain data:
//! built once during a run, never mutated afterwards, and serializable so a
//! report can be written as JSON and read back for display.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a policy meeting in an institution's calendar (e.g. `2026-12-09`).
    MeetingId
);
string_id!(
    /// Exchange symbol of a futures contract (e.g. `ZQZ26`).
    ContractId
);
string_id!(
    /// Label of a declared policy scenario (e.g. `cut`, `double_hike`).
    ScenarioLabel
);

/// Round to `dp` decimal places (half away from zero).
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let scale = 10f64.powi(dp);
    (value * scale).round() / scale
}

/// Serialize an `f64` rounded to 6 decimals.
///
/// Only the written artifact is rounded; in-memory values keep full precision.
pub(crate) fn serialize_6dp<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_dp(*value, 6))
}

/// One row of the quote table.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractQuote {
    pub contract_id: ContractId,
    /// Raw futures price as quoted by the exchange.
    pub price: f64,
    pub open_interest: Option<u64>,
    pub volume: Option<u64>,
    /// Bid/ask spread in basis points, when the source provides it.
    pub bid_ask_spread_bp: Option<f64>,
}

/// Quotes for one product family, indexed by contract.
///
/// When a contract appears more than once, the first row wins; the ingest
/// collaborator reports later duplicates as row errors.
#[derive(Debug, Clone, Default)]
pub struct QuoteTable {
    quotes: Vec<ContractQuote>,
    index: HashMap<ContractId, usize>,
}

impl QuoteTable {
    pub fn new(quotes: Vec<ContractQuote>) -> Self {
        let mut kept = Vec::with_capacity(quotes.len());
        let mut index = HashMap::with_capacity(quotes.len());
        for quote in quotes {
            if index.contains_key(&quote.contract_id) {
                continue;
            }
            index.insert(quote.contract_id.clone(), kept.len());
            kept.push(quote);
        }
        Self { quotes: kept, index }
    }

    pub fn get(&self, contract: &ContractId) -> Option<&ContractQuote> {
        self.index.get(contract).map(|&idx| &self.quotes[idx])
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContractQuote> {
        self.quotes.iter()
    }
}

/// Direction of the market-implied move relative to the neutrality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Dovish,
    Neutral,
    Hawkish,
}

impl Bias {
    pub fn label(self) -> &'static str {
        match self {
            Bias::Dovish => "dovish",
            Bias::Neutral => "neutral",
            Bias::Hawkish => "hawkish",
        }
    }
}

/// Day-weighted breakdown of the rate expected after a meeting.
///
/// Only present when the institution uses `meeting_adjustment: day_weighted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfterMeeting {
    /// Delivery month of the contract (`YYYY-MM`).
    pub contract_month: String,
    #[serde(serialize_with = "serialize_6dp")]
    pub weight_before: f64,
    #[serde(serialize_with = "serialize_6dp")]
    pub weight_after: f64,
    /// Rate implied after the meeting, before rounding to the policy increment.
    #[serde(serialize_with = "serialize_6dp")]
    pub rate_raw: f64,
    /// `rate_raw` rounded to the policy increment grid.
    #[serde(serialize_with = "serialize_6dp")]
    pub rate: f64,
}

/// One point of the implied-rate curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub meeting_id: MeetingId,
    pub contract_id: ContractId,
    /// Rate implied by the contract price, in percent.
    #[serde(serialize_with = "serialize_6dp")]
    pub implied_rate: f64,
    /// `(implied_rate - current_rate) * 100`; positive is hawkish.
    #[serde(serialize_with = "serialize_6dp")]
    pub spread_bp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_meeting: Option<AfterMeeting>,
}

/// Data-reliability tier of a contract.
///
/// Declaration order is the total order used for aggregation and sorting:
/// `unavailable < low < medium < high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Unavailable,
    Low,
    Medium,
    High,
}

impl QualityLevel {
    pub fn label(self) -> &'static str {
        match self {
            QualityLevel::Unavailable => "unavailable",
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
        }
    }

    /// `low` and `unavailable` are reported as degraded (never fatal).
    pub fn is_degraded(self) -> bool {
        self <= QualityLevel::Low
    }
}

/// A liquidity criterion evaluated by the quality scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCriterion {
    OpenInterest,
    Volume,
    BidAskSpread,
}

impl QualityCriterion {
    pub fn label(self) -> &'static str {
        match self {
            QualityCriterion::OpenInterest => "open_interest",
            QualityCriterion::Volume => "volume",
            QualityCriterion::BidAskSpread => "bid_ask_spread",
        }
    }
}

/// One criterion that actually contributed to an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFactor {
    pub criterion: QualityCriterion,
    pub value: f64,
    pub level: QualityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub contract_id: ContractId,
    pub level: QualityLevel,
    pub factors_considered: Vec<QualityFactor>,
}

/// Scenario label → probability in percent, in declared scenario order.
///
/// Serialized as a JSON object whose keys keep the declared order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProbabilityDistribution {
    entries: Vec<(ScenarioLabel, f64)>,
}

impl ProbabilityDistribution {
    pub fn new(entries: Vec<(ScenarioLabel, f64)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, p)| *p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioLabel, f64)> {
        self.entries.iter().map(|(l, p)| (l, *p))
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most probable scenario; ties go to the earlier declared scenario.
    pub fn mode(&self) -> Option<(&ScenarioLabel, f64)> {
        let mut best: Option<(&ScenarioLabel, f64)> = None;
        for (label, p) in self.iter() {
            match best {
                Some((_, bp)) if p <= bp => {}
                _ => best = Some((label, p)),
            }
        }
        best
    }
}

impl Serialize for ProbabilityDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label, &round_dp(*p, 6))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProbabilityDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = ProbabilityDistribution;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of scenario label to probability")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, p)) = access.next_entry::<ScenarioLabel, f64>()? {
                    entries.push((label, p));
                }
                Ok(ProbabilityDistribution { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Run metadata written at the top of every report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub schema_version: u32,
    pub institution: String,
    pub run_date: NaiveDate,
    pub engine_version: String,
    pub data_source: String,
    pub probability_method: String,
    #[serde(serialize_with = "serialize_6dp")]
    pub neutral_threshold_bp: f64,
    #[serde(serialize_with = "serialize_6dp")]
    pub current_rate: f64,
    pub next_meeting: MeetingId,
}

/// The terminal artifact of one institution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub curve: Vec<ResolvedRate>,
    pub next_meeting_probabilities: ProbabilityDistribution,
    pub quality: Vec<QualityAssessment>,
}
