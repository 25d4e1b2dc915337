//! Decimal arithmetic utilities for financial calculations.

use rust_decimal::Decimal;

/// Round a price to the venue tick (e.g., 0.01).
pub fn round_to_tick(value: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size == Decimal::ZERO {
        return value;
    }
    (value / tick_size).round() * tick_size
}

/// Safe division that returns zero if the divisor is zero.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator == Decimal::ZERO {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_to_tick() {
        assert_eq!(round_to_tick(dec!(25.1234), dec!(0.01)), dec!(25.12));
        assert_eq!(round_to_tick(dec!(25.125), dec!(0.01)), dec!(25.12));
        assert_eq!(round_to_tick(dec!(25.135), dec!(0.01)), dec!(25.14));
    }

    #[test]
    fn test_safe_div_zero_divisor() {
        assert_eq!(safe_div(dec!(10), dec!(0)), dec!(0));
        assert_eq!(safe_div(dec!(10), dec!(4)), dec!(2.5));
    }
}
