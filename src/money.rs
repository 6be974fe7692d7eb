use bigdecimal::BigDecimal;
use bigdecimal::rounding::RoundingMode;

/// Rounds a monetary amount to two decimal places, half-up.
///
/// Every amount that lands in a stored document goes through here, so totals
/// built by summing already-rounded line items stay exact to the cent.
pub fn to_cents(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Converts an untrusted float from an external roster into a decimal amount.
///
/// Returns `None` for NaN and infinities. This is the only place where float
/// input enters the engine; everything past this boundary is `BigDecimal` and
/// cannot go non-finite.
pub fn validated_amount(raw: f64) -> Option<BigDecimal> {
    if !raw.is_finite() {
        return None;
    }
    BigDecimal::try_from(raw).ok()
}
