//! Day-weighted "rate after meeting" for monthly-average contracts.
//!
//! A 30-day Fed Funds style contract settles on the average rate of its
//! delivery month. When a meeting falls inside that month:
//!
//! `R_month = w_before * R_before + w_after * R_after`
//!
//! with `w_before = (meeting_day - 1) / days_in_month`, so
//!
//! `R_after = (R_month - w_before * R_before) / w_after`.
//!
//! `R_before` is the current policy rate for the first meeting and the
//! previous meeting's (rounded) after-rate for the following ones.

use chrono::{Datelike, NaiveDate};

use crate::domain::{AfterMeeting, ContractId, Meeting};
use crate::error::EngineError;

/// Below this, the meeting is on the last day(s) and the month average is used as-is.
const MIN_WEIGHT_AFTER: f64 = 1e-9;

/// CME month codes, January through December.
const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// Decode the delivery month of a CME-style symbol: `<root><month code><yy>`.
///
/// `ZQX25` → `(2025, 11)`. Returns `None` when the symbol does not end in a
/// month code followed by a two-digit year.
pub fn contract_month(contract: &ContractId) -> Option<(i32, u32)> {
    let symbol = contract.as_str().trim().to_ascii_uppercase();
    let chars: Vec<char> = symbol.chars().collect();
    if chars.len() < 4 {
        return None;
    }
    let n = chars.len();
    let (code, yy) = (chars[n - 3], &chars[n - 2..]);
    if !yy.iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month = MONTH_CODES.iter().position(|&c| c == code)? as u32 + 1;
    let year: i32 = yy.iter().collect::<String>().parse().ok()?;
    Some((2000 + year, month))
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    u32::try_from((next - first).num_days()).ok()
}

/// Round a rate (percent) to the nearest multiple of `increment_bp`.
pub fn round_to_increment(rate: f64, increment_bp: f64) -> f64 {
    let step = increment_bp / 100.0;
    if step <= 0.0 {
        return rate;
    }
    (rate / step).round() * step
}

/// One curve point as seen by the adjustment.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyPoint<'a> {
    pub meeting: &'a Meeting,
    pub contract: &'a ContractId,
    pub implied_rate: f64,
}

/// Chain the day-weighted after-meeting rates through the curve, in order.
pub fn after_meeting_chain(
    institution: &str,
    current_rate: f64,
    increment_bp: f64,
    points: &[MonthlyPoint<'_>],
) -> Result<Vec<AfterMeeting>, EngineError> {
    let mut out = Vec::with_capacity(points.len());
    let mut rate_before = current_rate;

    for point in points {
        let field = format!("contract_mapping.{}", point.meeting.id);
        let (year, month) = contract_month(point.contract).ok_or_else(|| {
            EngineError::config(
                institution,
                field.clone(),
                format!("cannot decode a delivery month from contract `{}`", point.contract),
            )
        })?;

        let meeting_month = (point.meeting.date.year(), point.meeting.date.month());
        let weight_before = match (year, month).cmp(&meeting_month) {
            std::cmp::Ordering::Less => {
                return Err(EngineError::config(
                    institution,
                    field,
                    format!(
                        "contract `{}` delivers in {year:04}-{month:02}, before meeting {}",
                        point.contract, point.meeting.date
                    ),
                ));
            }
            std::cmp::Ordering::Greater => 0.0,
            std::cmp::Ordering::Equal => {
                let dim = days_in_month(year, month).ok_or_else(|| {
                    EngineError::config(institution, field.clone(), format!("invalid month {year:04}-{month:02}"))
                })?;
                f64::from(point.meeting.date.day() - 1) / f64::from(dim)
            }
        };
        let weight_after = 1.0 - weight_before;

        let rate_raw = if weight_after <= MIN_WEIGHT_AFTER {
            point.implied_rate
        } else {
            (point.implied_rate - weight_before * rate_before) / weight_after
        };
        let rate = round_to_increment(rate_raw, increment_bp);

        out.push(AfterMeeting {
            contract_month: format!("{year:04}-{month:02}"),
            weight_before,
            weight_after,
            rate_raw,
            rate,
        });
        rate_before = rate;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MeetingId;

    fn meeting(id: &str) -> Meeting {
        Meeting {
            id: MeetingId::from(id),
            date: NaiveDate::parse_from_str(id, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn decodes_cme_month_codes() {
        assert_eq!(contract_month(&ContractId::from("ZQX25")), Some((2025, 11)));
        assert_eq!(contract_month(&ContractId::from("zqf26")), Some((2026, 1)));
        assert_eq!(contract_month(&ContractId::from("SR3H27")), Some((2027, 3)));
        assert_eq!(contract_month(&ContractId::from("ZQA25")), None);
        assert_eq!(contract_month(&ContractId::from("ZQ")), None);
        assert_eq!(contract_month(&ContractId::from("ZQXAB")), None);
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2028, 2), Some(29));
        assert_eq!(days_in_month(2027, 2), Some(28));
        assert_eq!(days_in_month(2026, 12), Some(31));
    }

    #[test]
    fn rounds_to_policy_grid() {
        assert!((round_to_increment(4.37, 25.0) - 4.25).abs() < 1e-12);
        assert!((round_to_increment(4.40, 25.0) - 4.50).abs() < 1e-12);
        assert_eq!(round_to_increment(4.37, 0.0), 4.37);
    }

    #[test]
    fn chains_day_weighted_rates() {
        let oct = meeting("2026-10-28");
        let dec = meeting("2026-12-09");
        let nov_contract = ContractId::from("ZQX26");
        let dec_contract = ContractId::from("ZQZ26");

        let points = [
            // Contract month after the meeting: the whole month is post-meeting.
            MonthlyPoint {
                meeting: &oct,
                contract: &nov_contract,
                implied_rate: 4.80,
            },
            MonthlyPoint {
                meeting: &dec,
                contract: &dec_contract,
                implied_rate: 4.70,
            },
        ];
        let chain = after_meeting_chain("FED", 5.00, 25.0, &points).unwrap();

        assert_eq!(chain[0].contract_month, "2026-11");
        assert_eq!(chain[0].weight_before, 0.0);
        assert!((chain[0].rate_raw - 4.80).abs() < 1e-12);
        assert!((chain[0].rate - 4.75).abs() < 1e-12);

        // 8 of 31 December days at 4.75, the rest at R_after.
        let w_before = 8.0 / 31.0;
        let expected_raw = (4.70 - w_before * 4.75) / (1.0 - w_before);
        assert!((chain[1].weight_before - w_before).abs() < 1e-12);
        assert!((chain[1].rate_raw - expected_raw).abs() < 1e-12);
        assert!((chain[1].rate - 4.75).abs() < 1e-12);
    }

    #[test]
    fn contract_before_meeting_month_is_rejected() {
        let dec = meeting("2026-12-09");
        let nov_contract = ContractId::from("ZQX26");
        let points = [MonthlyPoint {
            meeting: &dec,
            contract: &nov_contract,
            implied_rate: 4.8,
        }];
        let err = after_meeting_chain("FED", 5.0, 25.0, &points).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("contract_mapping.2026-12-09"));
    }
}
