//! Black-Scholes pricing, delta, and implied volatility.
//!
//! Pricing runs entirely in `f64`: the transcendentals involved have no
//! exact decimal form, and the model error dwarfs float error anyway.
//! Order prices and quantities stay `Decimal` at the call sites.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Non-positive spot, strike, expiry, or volatility.
    #[error("degenerate pricing input: {0}")]
    DegenerateInput(&'static str),
    /// Bisection failed to bracket or converge on an implied volatility.
    #[error("implied volatility search did not converge")]
    NotConverged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Call,
    Put,
}

/// Model price and delta for one contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelQuote {
    pub price: f64,
    pub delta: f64,
}

/// Standard normal CDF via the Abramowitz & Stegun 7.1.26 erf
/// approximation. Absolute error below 1.5e-7, well inside the
/// tolerance of anything downstream.
fn normal_cdf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + 0.3275911 * x);
    let poly = t
        * (0.254829592
            + t * (-0.284496736 + t * (1.421413741 + t * (-1.453152027 + t * 1.061405429))));
    let erf = 1.0 - poly * (-x * x).exp();

    0.5 * (1.0 + sign * erf)
}

/// Black-Scholes price and delta for a European option.
pub fn black_scholes(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    sigma: f64,
    option_type: OptionType,
) -> Result<ModelQuote, PricingError> {
    if spot <= 0.0 || !spot.is_finite() {
        return Err(PricingError::DegenerateInput("spot"));
    }
    if strike <= 0.0 || !strike.is_finite() {
        return Err(PricingError::DegenerateInput("strike"));
    }
    if expiry <= 0.0 || !expiry.is_finite() {
        return Err(PricingError::DegenerateInput("expiry"));
    }
    if sigma <= 0.0 || !sigma.is_finite() {
        return Err(PricingError::DegenerateInput("sigma"));
    }

    let sqrt_t = expiry.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * expiry) / (sigma * sqrt_t);
    let d2 = d1 - sigma * sqrt_t;
    let discount = (-rate * expiry).exp();

    let quote = match option_type {
        OptionType::Call => ModelQuote {
            price: spot * normal_cdf(d1) - strike * discount * normal_cdf(d2),
            delta: normal_cdf(d1),
        },
        OptionType::Put => ModelQuote {
            price: strike * discount * normal_cdf(-d2) - spot * normal_cdf(-d1),
            delta: normal_cdf(d1) - 1.0,
        },
    };
    Ok(quote)
}

const IV_LOWER: f64 = 0.0;
const IV_UPPER: f64 = 3.0;
const IV_TOLERANCE: f64 = 1e-6;
const IV_MAX_ITERATIONS: u32 = 100;

/// Back out the volatility implied by an observed option price.
///
/// Bisection over sigma in [0, 3]; option prices are monotone in
/// volatility so the bracket either contains the root or the observed
/// price is outside the model's range entirely.
pub fn implied_volatility(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    observed_price: f64,
    option_type: OptionType,
) -> Result<f64, PricingError> {
    if observed_price <= 0.0 || !observed_price.is_finite() {
        return Err(PricingError::DegenerateInput("observed_price"));
    }

    let mut lo = IV_LOWER;
    let mut hi = IV_UPPER;

    for _ in 0..IV_MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let model = black_scholes(spot, strike, expiry, rate, mid, option_type)?.price;
        let diff = model - observed_price;

        if diff.abs() < IV_TOLERANCE {
            return Ok(mid);
        }
        if diff > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    // Out of iterations without meeting tolerance: the observed price
    // has no matching volatility in [0, 3]. Never return the midpoint
    // as a partial estimate.
    Err(PricingError::NotConverged)
}
