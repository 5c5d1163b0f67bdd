//! Polynomial least squares on top of nalgebra.
//!
//! The abscissa is mapped onto [-1, 1] before building the Vandermonde
//! matrix; raw wavenumbers in the thousands raised to the fourth power
//! would otherwise leave the normal system hopelessly ill-conditioned.
//! Systems are solved through the SVD so rank deficiency is detected
//! instead of producing garbage coefficients.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// A polynomial in the scaled variable `t = (x - center) / half_range`.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    /// Lowest degree first.
    coefficients: Vec<f64>,
    center: f64,
    half_range: f64,
}

impl Polynomial {
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficients in the scaled variable, lowest degree first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.half_range;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn eval_all(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }
}

fn scaling(x: &[f64]) -> (f64, f64) {
    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let half_range = 0.5 * (hi - lo);
    let half_range = if half_range > 0.0 { half_range } else { 1.0 };
    (0.5 * (hi + lo), half_range)
}

/// Vandermonde matrix with rows `[1, t, t², …]`.
pub fn vandermonde(t: &[f64], degree: usize) -> DMatrix<f64> {
    DMatrix::from_fn(t.len(), degree + 1, |i, j| t[i].powi(j as i32))
}

/// Weighted least-squares polynomial fit minimising `Σ wᵢ (yᵢ - p(xᵢ))²`.
pub fn fit_weighted(
    x: &[f64],
    y: &[f64],
    weights: &[f64],
    degree: usize,
) -> Result<Polynomial, FitError> {
    let columns = degree + 1;
    let active = weights.iter().filter(|&&w| w > 0.0).count();
    if active < columns {
        return Err(FitError::Underdetermined {
            degree,
            required: columns,
            available: active,
        });
    }

    let (center, half_range) = scaling(x);
    let t: Vec<f64> = x.iter().map(|&v| (v - center) / half_range).collect();
    let sqrt_w: Vec<f64> = weights.iter().map(|&w| w.max(0.0).sqrt()).collect();

    let a = DMatrix::from_fn(t.len(), columns, |i, j| sqrt_w[i] * t[i].powi(j as i32));
    let b = DVector::from_iterator(y.len(), y.iter().zip(&sqrt_w).map(|(&v, &s)| v * s));

    let svd = a.svd(true, true);
    let largest = svd.singular_values.max();
    let eps = largest * f64::EPSILON * x.len().max(columns) as f64;
    let rank = svd.rank(eps);
    if rank < columns {
        return Err(FitError::Singular { rank, columns });
    }
    let solution = svd
        .solve(&b, eps)
        .map_err(|_| FitError::Singular { rank, columns })?;

    Ok(Polynomial {
        coefficients: solution.iter().copied().collect(),
        center,
        half_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn recovers_exact_cubic() {
        let x: Vec<f64> = (0..50).map(|i| 200.0 + 10.0 * i as f64).collect();
        let truth = |v: f64| 3.0 - 0.02 * v + 1e-5 * v * v - 2e-9 * v * v * v;
        let y: Vec<f64> = x.iter().map(|&v| truth(v)).collect();
        let p = fit_weighted(&x, &y, &vec![1.0; x.len()], 3).unwrap();
        assert_eq!(p.degree(), 3);
        for &v in &x {
            assert_abs_diff_eq!(p.eval(v), truth(v), epsilon = 1e-8);
        }
    }

    #[test]
    fn zero_weights_ignore_points() {
        let x = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let y = vec![1.0, 1.0, 100.0, 1.0, 1.0];
        let w = vec![1.0, 1.0, 0.0, 1.0, 1.0];
        let p = fit_weighted(&x, &y, &w, 1).unwrap();
        assert_abs_diff_eq!(p.eval(2.0), 1.0, epsilon = 1e-10);
    }

    #[test]
    fn too_few_weighted_points() {
        let x = vec![0.0, 1.0, 2.0, 3.0];
        let y = vec![0.0; 4];
        let w = vec![1.0, 0.0, 0.0, 1.0];
        assert_eq!(
            fit_weighted(&x, &y, &w, 2),
            Err(FitError::Underdetermined {
                degree: 2,
                required: 3,
                available: 2
            })
        );
    }

    #[test]
    fn repeated_abscissa_is_singular() {
        let x = vec![1.0; 6];
        let y = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(matches!(
            fit_weighted(&x, &y, &[1.0; 6], 2),
            Err(FitError::Singular { .. })
        ));
    }
}
