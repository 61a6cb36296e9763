//! Closed-form ordinary least squares for the rating trend line.

use crate::types::LinearFit;

/// Bias reported when there is nothing to fit: the midpoint of a 1-5 scale.
pub const NEUTRAL_BIAS: f64 = 2.5;

/// Determinant threshold below which the normal equations are singular.
const SINGULAR_EPS: f64 = 1e-8;

/// Fit `y ≈ bias + slope * x` by solving the 2x2 normal equations.
///
/// `xs` must already be normalized to [0, 1] by the caller and both slices
/// must have the same length. With no points the fit falls back to a flat
/// neutral line; with degenerate `xs` (all equal) it degrades to the mean
/// of `ys`. Closed-form inversion is exact at this scale; no iterative
/// solver is involved.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> LinearFit {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.is_empty() {
        return LinearFit {
            slope: 0.0,
            bias: NEUTRAL_BIAS,
        };
    }
    let n = xs.len() as f64;
    let sum_x: f64 = xs.iter().sum();
    let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();

    // Normal equations: [[Σx², Σx], [Σx, n]] [slope, bias]ᵀ = [Σxy, Σy]ᵀ.
    let det = sum_xx * n - sum_x * sum_x;
    if det < SINGULAR_EPS {
        return LinearFit {
            slope: 0.0,
            bias: sum_y / n,
        };
    }
    LinearFit {
        slope: (n * sum_xy - sum_x * sum_y) / det,
        bias: (sum_xx * sum_y - sum_x * sum_xy) / det,
    }
}
