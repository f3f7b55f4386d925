//! XIRR solver - annualized return over irregularly dated cash flows
//!
//! Finds the rate `r` such that the discounted flows sum to zero:
//! `sum(amount_i / (1 + r)^(days_i / 365)) = 0`, days measured from the
//! earliest flow. Newton's method seeded at a small positive guess, with
//! bisection as the fallback when Newton diverges.

use chrono::NaiveDate;

/// Absolute tolerance on the objective function
const TOLERANCE: f64 = 1e-6;

/// Iteration cap for both Newton and bisection
const MAX_ITERATIONS: u32 = 100;

/// Initial Newton guess (10% annual return)
const INITIAL_GUESS: f64 = 0.1;

/// Solve for the annualized internal rate of return.
///
/// Requires at least one negative and one positive flow; callers valuing
/// a still-open position append a synthetic terminal flow at the current
/// mark-to-market value, dated now. Returns None when the precondition
/// fails or the root-finder does not converge.
pub fn solve(cashflows: &[(NaiveDate, f64)]) -> Option<f64> {
    let has_negative = cashflows.iter().any(|(_, a)| *a < 0.0);
    let has_positive = cashflows.iter().any(|(_, a)| *a > 0.0);
    if !has_negative || !has_positive {
        return None;
    }

    let earliest = cashflows.iter().map(|(d, _)| *d).min()?;
    let flows: Vec<(f64, f64)> = cashflows
        .iter()
        .map(|(date, amount)| {
            let days = (*date - earliest).num_days() as f64;
            (days / 365.0, *amount)
        })
        .collect();

    newton(&flows).or_else(|| bisect(&flows))
}

/// Net present value of the flows at rate `r`
fn npv(flows: &[(f64, f64)], rate: f64) -> f64 {
    flows
        .iter()
        .map(|(years, amount)| amount / (1.0 + rate).powf(*years))
        .sum()
}

/// Derivative of the NPV with respect to the rate
fn npv_derivative(flows: &[(f64, f64)], rate: f64) -> f64 {
    flows
        .iter()
        .map(|(years, amount)| -years * amount / (1.0 + rate).powf(*years + 1.0))
        .sum()
}

fn newton(flows: &[(f64, f64)]) -> Option<f64> {
    let mut rate = INITIAL_GUESS;

    for _ in 0..MAX_ITERATIONS {
        let value = npv(flows, rate);
        if value.abs() < TOLERANCE {
            return Some(rate);
        }

        let derivative = npv_derivative(flows, rate);
        if derivative.abs() < f64::EPSILON {
            return None;
        }

        let next = rate - value / derivative;
        // Rates at or below -100% make the discount factor blow up
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        rate = next;
    }

    None
}

/// Bisection fallback over (-1, 10]; only applicable when the objective
/// changes sign across the bracket.
fn bisect(flows: &[(f64, f64)]) -> Option<f64> {
    let mut lo = -0.9999;
    let mut hi = 10.0;
    let mut f_lo = npv(flows, lo);
    let f_hi = npv(flows, hi);

    if f_lo * f_hi > 0.0 {
        return None;
    }

    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv(flows, mid);

        if f_mid.abs() < TOLERANCE {
            return Some(mid);
        }

        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_one_year_twenty_percent() {
        let flows = vec![
            (date(2024, 1, 1), -1000.0),
            (date(2025, 1, 1), 1200.0), // +365 days
        ];
        let rate = solve(&flows).unwrap();
        assert!((rate - 0.20).abs() < 1e-4, "expected ~0.20, got {}", rate);
    }

    #[test]
    fn test_all_positive_returns_none() {
        let flows = vec![(date(2024, 1, 1), 100.0), (date(2024, 6, 1), 200.0)];
        assert!(solve(&flows).is_none());
    }

    #[test]
    fn test_all_negative_returns_none() {
        let flows = vec![(date(2024, 1, 1), -100.0), (date(2024, 6, 1), -200.0)];
        assert!(solve(&flows).is_none());
    }

    #[test]
    fn test_empty_returns_none() {
        assert!(solve(&[]).is_none());
    }

    #[test]
    fn test_negative_return() {
        let flows = vec![(date(2024, 1, 1), -1000.0), (date(2025, 1, 1), 800.0)];
        let rate = solve(&flows).unwrap();
        assert!((rate - (-0.20)).abs() < 1e-4, "expected ~-0.20, got {}", rate);
    }

    #[test]
    fn test_multiple_flows_converges() {
        // Periodic investments with a terminal mark-to-market value
        let flows = vec![
            (date(2023, 1, 15), -500.0),
            (date(2023, 4, 15), -500.0),
            (date(2023, 7, 15), -500.0),
            (date(2023, 10, 15), -500.0),
            (date(2024, 1, 15), 2300.0),
        ];
        let rate = solve(&flows).unwrap();
        // Objective must actually be zeroed at the returned rate
        let earliest = date(2023, 1, 15);
        let npv: f64 = flows
            .iter()
            .map(|(d, a)| {
                let years = (*d - earliest).num_days() as f64 / 365.0;
                a / (1.0 + rate).powf(years)
            })
            .sum();
        assert!(npv.abs() < 1e-4);
        assert!(rate > 0.0);
    }
}
