//! Basis functions for the additive model.
//!
//! - Fourier pairs for a seasonality of period `P` (days) and order `N`:
//!   `cos(2πn·d/P), sin(2πn·d/P)` for `n = 1..=N`, with `d` = days since 1970-01-01
//! - Hinge terms for trend changepoints: `(t - s)+`
//!
//! Counting days from a fixed epoch (rather than from the first row) keeps
//! seasonal phases identical across different training windows.

use std::f64::consts::PI;

use chrono::NaiveDate;

/// Days since 1970-01-01 as a float.
pub fn epoch_days(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// Fill `out` (length `2 * order`) with `[cos(1), sin(1), cos(2), sin(2), ...]`.
pub fn fourier_row(day: f64, period: f64, order: usize, out: &mut [f64]) {
    for n in 1..=order {
        let x = 2.0 * PI * n as f64 * day / period;
        out[2 * (n - 1)] = x.cos();
        out[2 * (n - 1) + 1] = x.sin();
    }
}

/// `max(t - s, 0)`.
pub fn hinge(t: f64, s: f64) -> f64 {
    (t - s).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_days_counts_from_1970() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1.0);
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1969, 12, 31).unwrap()), -1.0);
    }

    #[test]
    fn fourier_row_repeats_every_period() {
        let mut a = [0.0; 6];
        let mut b = [0.0; 6];
        fourier_row(3.0, 7.0, 3, &mut a);
        fourier_row(10.0, 7.0, 3, &mut b);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-9);
        }
        for pair in a.chunks(2) {
            assert!((pair[0] * pair[0] + pair[1] * pair[1] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn hinge_is_zero_before_changepoint() {
        assert_eq!(hinge(0.2, 0.5), 0.0);
        assert!((hinge(0.7, 0.5) - 0.2).abs() < 1e-12);
    }
}
