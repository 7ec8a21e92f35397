//! Nonlinear least-squares core shared by the Gaussian and sinusoid fits.
//!
//! A small Levenberg-Marquardt loop with a forward-difference Jacobian and a
//! Gaussian-elimination solve. Parameter vectors are tiny (3-5 entries), so
//! dense normal equations are adequate. Iteration count is always bounded by
//! `FitConfig::max_iterations` so degenerate (flat/zero) input cannot hang.

pub mod gaussian;
pub mod sinusoid;

use crate::config::FitConfig;

pub use gaussian::{fit_gaussian2d, moments, Gaussian2d};
pub use sinusoid::{fit_sinusoid, fit_sinusoid_fixed_offset};

/// Outcome of one least-squares run. `converged == false` means the loop
/// hit the iteration bound or a singular normal matrix; `params` still
/// holds the best point found.
#[derive(Debug, Clone, Copy)]
pub struct FitSummary {
    pub converged: bool,
    pub iterations: usize,
    pub cost: f64,
}

const LAMBDA_MAX: f64 = 1e12;
const JACOBIAN_STEP: f64 = 1e-6;

fn sum_sq(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// Minimize the sum of squared residuals over `params` in place.
///
/// `residuals` must return the same-length residual vector for any
/// parameter vector; non-finite residuals reject the trial step.
pub fn least_squares<F>(residuals: F, params: &mut [f64], cfg: &FitConfig) -> FitSummary
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let n = params.len();
    let mut r = residuals(params);
    let mut cost = sum_sq(&r);
    let mut lambda = cfg.lambda_init;

    for iter in 0..cfg.max_iterations {
        if cost <= cfg.tolerance {
            return FitSummary {
                converged: true,
                iterations: iter,
                cost,
            };
        }
        let m = r.len();

        // Forward-difference Jacobian, m x n
        let mut jac = vec![vec![0.0f64; n]; m];
        for j in 0..n {
            let step = JACOBIAN_STEP * params[j].abs().max(1.0);
            let mut trial = params.to_vec();
            trial[j] += step;
            let rj = residuals(&trial);
            for i in 0..m {
                jac[i][j] = (rj[i] - r[i]) / step;
            }
        }

        // Normal equations: (J^T J + lambda diag) delta = J^T r
        let mut a = vec![vec![0.0f64; n]; n];
        let mut g = vec![0.0f64; n];
        for i in 0..m {
            for j in 0..n {
                g[j] += jac[i][j] * r[i];
                for k in j..n {
                    a[j][k] += jac[i][j] * jac[i][k];
                }
            }
        }
        for j in 0..n {
            for k in 0..j {
                a[j][k] = a[k][j];
            }
        }

        let mut damped = a.clone();
        for j in 0..n {
            damped[j][j] += lambda * a[j][j].max(1e-12);
        }

        let delta = match solve(damped, &g) {
            Some(d) => d,
            None => {
                lambda *= cfg.lambda_scale;
                if lambda > LAMBDA_MAX {
                    return FitSummary {
                        converged: false,
                        iterations: iter,
                        cost,
                    };
                }
                continue;
            }
        };

        let mut trial = params.to_vec();
        for j in 0..n {
            trial[j] -= delta[j];
        }
        let rt = residuals(&trial);
        let trial_cost = sum_sq(&rt);

        if trial_cost.is_finite() && trial_cost < cost {
            let improvement = cost - trial_cost;
            let step_size = delta.iter().fold(0.0f64, |acc, d| acc.max(d.abs()));
            params.copy_from_slice(&trial);
            r = rt;
            cost = trial_cost;
            lambda = (lambda / cfg.lambda_scale).max(1e-12);

            if improvement <= cfg.tolerance * cost.max(cfg.tolerance) || step_size <= cfg.tolerance
            {
                return FitSummary {
                    converged: true,
                    iterations: iter + 1,
                    cost,
                };
            }
        } else {
            lambda *= cfg.lambda_scale;
            if lambda > LAMBDA_MAX {
                return FitSummary {
                    converged: false,
                    iterations: iter + 1,
                    cost,
                };
            }
        }
    }

    FitSummary {
        converged: false,
        iterations: cfg.max_iterations,
        cost,
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
/// Returns `None` when the matrix is singular to working precision.
fn solve(mut a: Vec<Vec<f64>>, b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut x = b.to_vec();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if !a[pivot_row][col].is_finite() || a[pivot_row][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot_row);
        x.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            x[row] -= factor * x[col];
        }
    }

    for col in (0..n).rev() {
        for k in (col + 1)..n {
            let xk = x[k];
            x[col] -= a[col][k] * xk;
        }
        x[col] /= a[col][col];
        if !x[col].is_finite() {
            return None;
        }
    }

    Some(x)
}
