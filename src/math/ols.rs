//! Penalized least squares solver.
//!
//! Every fit pass of the additive model solves a problem of the form:
//!
//! ```text
//! minimize ||y - Xβ||² + Σ_j λ_j β_j²
//! ```
//!
//! which is the MAP estimate under Gaussian priors with precision `λ_j`
//! (relative to the noise variance). We solve it as an ordinary least squares
//! problem on an augmented system:
//!
//! ```text
//! [ X          ]       [ y ]
//! [ diag(√λ_j) ] β  ≈  [ 0 ]
//! ```
//!
//! Implementation choices:
//! - SVD solve, so tall and nearly collinear designs (e.g. a daily Fourier term
//!   on daily data) still produce a finite answer.
//!   (Nalgebra's `QR::solve` is intended for square systems and panics on
//!   non-square matrices.)
//! - The parameter dimension is small (tens of columns), so SVD cost is fine for
//!   datasets of a few thousand days.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve `min ||y - Xβ||² + Σ penalties[j] β_j²`.
///
/// `penalties` has one non-negative entry per column of `x`; zero leaves the
/// coefficient unpenalized.
pub fn solve_ridge(x: &DMatrix<f64>, y: &DVector<f64>, penalties: &[f64]) -> Option<DVector<f64>> {
    let (n, p) = x.shape();
    if penalties.len() != p || y.len() != n {
        return None;
    }
    if penalties.iter().any(|l| !l.is_finite() || *l < 0.0) {
        return None;
    }

    let mut xa = DMatrix::<f64>::zeros(n + p, p);
    xa.rows_mut(0, n).copy_from(x);
    for (j, &lambda) in penalties.iter().enumerate() {
        xa[(n + j, j)] = lambda.sqrt();
    }

    let mut ya = DVector::<f64>::zeros(n + p);
    ya.rows_mut(0, n).copy_from(y);

    solve_least_squares(&xa, &ya)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn ridge_without_penalty_matches_ols() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let beta = solve_ridge(&x, &y, &[0.0, 0.0]).unwrap();
        assert!((beta[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn ridge_penalty_shrinks_towards_zero() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);
        let loose = solve_ridge(&x, &y, &[0.0, 0.1]).unwrap();
        let tight = solve_ridge(&x, &y, &[0.0, 100.0]).unwrap();
        assert!(tight[1].abs() < loose[1].abs());
        assert!(loose[1] < 3.0);
    }

    #[test]
    fn ridge_rejects_mismatched_penalties() {
        let x = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(solve_ridge(&x, &y, &[0.0]).is_none());
        assert!(solve_ridge(&x, &y, &[0.0, -1.0]).is_none());
    }
}
