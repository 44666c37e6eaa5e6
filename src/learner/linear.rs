/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Ridge-regularised least-squares linear regression, fitted in batch.
//!
//! ```text
//! (XᵀWX + λI') β = XᵀWy      I' = identity without the intercept entry
//! ```
//!
//! Solved by Gaussian elimination with partial pivoting. A singular system
//! falls back to the weighted mean target.

use alloc::vec;
use alloc::vec::Vec;

use super::window::BatchRegressor;
use crate::instance::Instance;

/// Pivot magnitude below which the normal equations are treated as singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Linear model `y = β₀ + Σ βᵢ xᵢ`.
#[derive(Clone, Debug)]
pub struct LeastSquares {
    ridge: f64,
    /// Intercept followed by one coefficient per feature. Empty before fitting.
    coefficients: Vec<f64>,
}

impl LeastSquares {
    /// Model with ridge penalty `ridge` (negative values clamp to 0).
    pub fn new(ridge: f64) -> Self {
        Self { ridge: ridge.max(0.0), coefficients: Vec::new() }
    }

    /// Fitted coefficients, intercept first.
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }
}

impl Default for LeastSquares {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl BatchRegressor for LeastSquares {
    fn fit(&mut self, instances: &[Instance]) {
        self.coefficients.clear();
        let Some(first) = instances.first() else {
            return;
        };
        let dim = first.features().count() + 1;

        let mut a = vec![0.0; dim * dim];
        let mut b = vec![0.0; dim];
        let mut weight_sum = 0.0;
        let mut target_sum = 0.0;
        for inst in instances {
            let w = inst.weight();
            let y = inst.class_value();
            let row: Vec<f64> = core::iter::once(1.0).chain(inst.features()).collect();
            for i in 0..dim {
                b[i] += w * row[i] * y;
                for j in 0..dim {
                    a[i * dim + j] += w * row[i] * row[j];
                }
            }
            weight_sum += w;
            target_sum += w * y;
        }
        for i in 1..dim {
            a[i * dim + i] += self.ridge;
        }

        match solve(&mut a, &mut b, dim) {
            Some(beta) => self.coefficients = beta,
            None => {
                let mean = if weight_sum > 0.0 { target_sum / weight_sum } else { 0.0 };
                self.coefficients = vec![0.0; dim];
                self.coefficients[0] = mean;
            }
        }
    }

    fn predict(&self, instance: &Instance) -> f64 {
        match self.coefficients.split_first() {
            None => 0.0,
            Some((intercept, rest)) => {
                intercept + rest.iter().zip(instance.features()).map(|(c, x)| c * x).sum::<f64>()
            }
        }
    }
}

/// Solve the `n × n` row-major system in place. `None` if singular.
fn solve(a: &mut [f64], b: &mut [f64], n: usize) -> Option<Vec<f64>> {
    for col in 0..n {
        let pivot = (col..n).max_by(|&r1, &r2| {
            libm::fabs(a[r1 * n + col])
                .partial_cmp(&libm::fabs(a[r2 * n + col]))
                .unwrap_or(core::cmp::Ordering::Equal)
        })?;
        if !(libm::fabs(a[pivot * n + col]) > SINGULAR_EPS) {
            return None;
        }
        if pivot != col {
            for j in 0..n {
                a.swap(col * n + j, pivot * n + j);
            }
            b.swap(col, pivot);
        }
        for row in (col + 1)..n {
            let factor = a[row * n + col] / a[col * n + col];
            for j in col..n {
                a[row * n + j] -= factor * a[col * n + j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|j| a[row * n + j] * x[j]).sum();
        x[row] = (b[row] - tail) / a[row * n + row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Schema;
    use alloc::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::numeric("t", 2, 1).unwrap())
    }

    fn inst(x: f64, y: f64) -> Instance {
        Instance::new(schema(), vec![x, y]).unwrap()
    }

    #[test]
    fn test_unfitted_predicts_zero() {
        assert_eq!(LeastSquares::default().predict(&inst(3.0, 0.0)), 0.0);
    }

    #[test]
    fn test_recovers_exact_line() {
        let mut ls = LeastSquares::new(0.0);
        ls.fit(&[inst(0.0, 1.0), inst(1.0, 3.0), inst(2.0, 5.0)]);
        assert!((ls.coefficients()[0] - 1.0).abs() < 1e-9);
        assert!((ls.coefficients()[1] - 2.0).abs() < 1e-9);
        assert!((ls.predict(&inst(10.0, 0.0)) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_falls_back_to_mean() {
        // One distinct x value: slope is not identifiable without ridge.
        let mut ls = LeastSquares::new(0.0);
        ls.fit(&[inst(2.0, 1.0), inst(2.0, 3.0)]);
        assert!((ls.predict(&inst(7.0, 0.0)) - 2.0).abs() < 1e-9);
    }
}
