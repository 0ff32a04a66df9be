//! Decimal-odds probability math.
//!
//! All computations use `Decimal`; odds at or below 1.0 are rejected before
//! any division.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};

use crate::error::DetectionError;

/// Implied probability of decimal odds (`1 / price`).
///
/// # Errors
/// [`DetectionError::InvalidOdds`] when `price <= 1`.
pub fn implied_probability(price: Decimal) -> Result<Decimal, DetectionError> {
    if price <= Decimal::ONE {
        return Err(DetectionError::InvalidOdds(price));
    }
    Ok(Decimal::ONE / price)
}

/// Sum of implied probabilities of a set of prices.
pub fn combined_implied_probability<I>(prices: I) -> Result<Decimal, DetectionError>
where
    I: IntoIterator<Item = Decimal>,
{
    prices
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, p| Ok(acc + implied_probability(p)?))
}

/// Guaranteed return in percent for a combined implied probability below 1.
///
/// `None` for a non-positive sum or when the result does not fit a `Decimal`.
pub fn profit_margin(combined: Decimal) -> Option<Decimal> {
    if combined <= Decimal::ZERO {
        return None;
    }
    Decimal::ONE
        .checked_div(combined)?
        .checked_sub(Decimal::ONE)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Normalise probabilities so they sum to one, removing the bookmaker margin.
///
/// # Errors
/// [`DetectionError::DegenerateReference`] for an empty set or a zero sum.
pub fn devig(probabilities: &[Decimal]) -> Result<Vec<Decimal>, DetectionError> {
    let total: Decimal = probabilities.iter().copied().sum();
    if probabilities.is_empty() || total <= Decimal::ZERO {
        return Err(DetectionError::DegenerateReference);
    }
    Ok(probabilities.iter().map(|p| p / total).collect())
}

/// Expected value of a unit stake: `price * fair_probability - 1`.
pub fn expected_value(price: Decimal, fair_probability: Decimal) -> Decimal {
    price * fair_probability - Decimal::ONE
}

/// Arithmetic mean, `None` when empty or on overflow.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    sum.checked_div(Decimal::from(values.len()))
}

/// Population standard deviation divided by the mean.
///
/// `None` when empty, when the mean is zero, or on overflow.
pub fn coefficient_of_variation(values: &[Decimal]) -> Option<Decimal> {
    let avg = mean(values)?;
    if avg.is_zero() {
        return None;
    }
    let squares = values.iter().try_fold(Decimal::ZERO, |acc, v| {
        let d = v.checked_sub(avg)?;
        acc.checked_add(d.checked_mul(d)?)
    })?;
    let variance = squares.checked_div(Decimal::from(values.len()))?;
    variance.sqrt()?.checked_div(avg)
}

/// Round half away from zero to 2 decimal places.
pub fn round_pct(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round half away from zero to the given number of decimal places.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn implied_probability_of_even_money() {
        assert_eq!(implied_probability(dec!(2.0)).unwrap(), dec!(0.5));
    }

    #[test]
    fn implied_probability_rejects_odds_at_or_below_one() {
        assert_eq!(
            implied_probability(dec!(1.0)),
            Err(DetectionError::InvalidOdds(dec!(1.0)))
        );
        assert!(implied_probability(dec!(0.5)).is_err());
    }

    #[test]
    fn combined_probability_and_margin() {
        let sum = combined_implied_probability([dec!(2.10), dec!(2.05)]).unwrap();
        assert!(sum < Decimal::ONE);
        assert_eq!(round_pct(profit_margin(sum).unwrap()), dec!(3.73));
        assert!(profit_margin(Decimal::ZERO).is_none());
    }

    #[test]
    fn combined_probability_propagates_invalid_odds() {
        assert!(combined_implied_probability([dec!(2.0), dec!(1.0)]).is_err());
    }

    #[test]
    fn devig_sums_to_one() {
        let probs = vec![
            implied_probability(dec!(1.95)).unwrap(),
            implied_probability(dec!(1.95)).unwrap(),
        ];
        let fair = devig(&probs).unwrap();

        let total: Decimal = fair.iter().copied().sum();
        assert!((total - Decimal::ONE).abs() < dec!(0.000000001));
        assert_eq!(round_to(fair[0], 6), dec!(0.5));
    }

    #[test]
    fn devig_three_way_sums_to_one() {
        let probs: Vec<Decimal> = [dec!(2.40), dec!(3.30), dec!(3.10)]
            .into_iter()
            .map(|p| implied_probability(p).unwrap())
            .collect();
        let fair = devig(&probs).unwrap();

        let total: Decimal = fair.iter().copied().sum();
        assert!((total - Decimal::ONE).abs() < dec!(0.000000001));
    }

    #[test]
    fn devig_rejects_empty_and_zero() {
        assert_eq!(devig(&[]), Err(DetectionError::DegenerateReference));
        assert_eq!(
            devig(&[Decimal::ZERO, Decimal::ZERO]),
            Err(DetectionError::DegenerateReference)
        );
    }

    #[test]
    fn expected_value_of_fair_price_is_zero() {
        assert_eq!(expected_value(dec!(2.0), dec!(0.5)), Decimal::ZERO);
        assert_eq!(expected_value(dec!(2.2), dec!(0.5)), dec!(0.1));
    }

    #[test]
    fn coefficient_of_variation_of_identical_values_is_zero() {
        let cv = coefficient_of_variation(&[dec!(2.0), dec!(2.0), dec!(2.0)]).unwrap();
        assert_eq!(cv, Decimal::ZERO);
        assert!(coefficient_of_variation(&[]).is_none());
    }

    #[test]
    fn huge_prices_do_not_overflow() {
        let prices = [dec!(2.0), dec!(2.0), dec!(1000000000000000)];
        assert!(coefficient_of_variation(&prices).is_none());
        assert!(mean(&[Decimal::MAX, Decimal::MAX]).is_none());
    }

    #[test]
    fn round_pct_rounds_half_away_from_zero() {
        assert_eq!(round_pct(dec!(1.005)), dec!(1.01));
        assert_eq!(round_pct(dec!(-1.005)), dec!(-1.01));
    }
}
