//! Spread between the implied rate and the current policy rate.

/// `(implied_rate - current_rate) * 100`, in basis points.
///
/// Positive means the market prices a higher rate (hawkish), negative a lower one (dovish).
pub fn spread_bp(implied_rate: f64, current_rate: f64) -> f64 {
    (implied_rate - current_rate) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sign_convention() {
        assert!((spread_bp(4.80, 5.00) - -20.0).abs() < 1e-9);
        assert!((spread_bp(4.15, 4.00) - 15.0).abs() < 1e-9);
        assert_eq!(spread_bp(4.0, 4.0), 0.0);
    }

    proptest! {
        #[test]
        fn matches_definition(implied in -2.0f64..15.0, current in -1.0f64..15.0) {
            let expected = (implied - current) * 100.0;
            prop_assert!((spread_bp(implied, current) - expected).abs() <= 1e-9);
        }
    }
}
