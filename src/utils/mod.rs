//! Math utilities: numerically stable sigmoid, reductions, and the
//! reconstruction cross-entropy used for training diagnostics.

use ndarray::{Array1, Array2, Axis};

/// Numerically stable logistic sigmoid.
///
/// Splits on the sign of `x` so that `exp` is only ever called on a
/// non-positive argument, avoiding overflow for large-magnitude inputs:
/// ```text
/// x >= 0:  1 / (1 + e^-x)
/// x <  0:  e^x / (1 + e^x)
/// ```
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Elementwise sigmoid over a matrix.
#[inline]
pub fn sigmoid_matrix(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(sigmoid)
}

/// Column means across the batch dimension (rows).
///
/// For a `(batch, units)` matrix this yields a `(units,)` vector — the
/// per-unit average over the batch. An empty batch yields zeros.
pub fn row_mean(m: &Array2<f64>) -> Array1<f64> {
    m.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(m.ncols()))
}

/// Mean per-example binary cross-entropy between a batch and its
/// reconstruction.
///
/// ```text
/// H = -(1/B) * Σ_ij [ x_ij ln(p_ij) + (1 - x_ij) ln(1 - p_ij) ]
/// ```
///
/// Probabilities are clamped away from 0 and 1 so the logarithms stay
/// finite. Used only for monitoring, never for gradients.
pub fn cross_entropy(input: &Array2<f64>, reconstruction: &Array2<f64>) -> f64 {
    const EPS: f64 = 1e-10;

    let batch = input.nrows().max(1) as f64;
    let total: f64 = input
        .iter()
        .zip(reconstruction.iter())
        .map(|(&x, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            x * p.ln() + (1.0 - x) * (1.0 - p).ln()
        })
        .sum();

    -total / batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    #[test]
    fn test_sigmoid_midpoint() {
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn test_sigmoid_stable_at_extremes() {
        assert_abs_diff_eq!(sigmoid(800.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sigmoid(-800.0), 0.0, epsilon = 1e-12);
        assert!(sigmoid(f64::MAX).is_finite());
        assert!(sigmoid(-f64::MAX).is_finite());
    }

    #[test]
    fn test_sigmoid_symmetry() {
        let x = 1.7;
        assert_abs_diff_eq!(sigmoid(x) + sigmoid(-x), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_row_mean() {
        let m = arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let mean = row_mean(&m);
        assert_abs_diff_eq!(mean[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mean[1], 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_perfect_reconstruction() {
        let x = arr2(&[[1.0, 0.0, 1.0]]);
        // Clamping keeps the logs finite even on exact 0/1 reconstructions.
        let h = cross_entropy(&x, &x);
        assert!(h >= 0.0);
        assert!(h < 1e-8);
    }

    #[test]
    fn test_cross_entropy_uniform_reconstruction() {
        // p = 0.5 everywhere: each of the 4 entries contributes ln(2).
        let x = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
        let p = arr2(&[[0.5, 0.5], [0.5, 0.5]]);
        let expected = 2.0 * std::f64::consts::LN_2;
        assert_abs_diff_eq!(cross_entropy(&x, &p), expected, epsilon = 1e-12);
    }
}
