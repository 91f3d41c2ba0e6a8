//! E-step: posterior responsibilities under the current parameters.
//!
//! Densities are evaluated in the log domain and rows are normalized with
//! log-sum-exp. A direct exp-then-divide underflows in double precision when
//! clusters are far apart or tightly concentrated, yielding zero row sums and
//! a division by zero on normalization.

use nalgebra::{Cholesky, DMatrix, Dyn};

use crate::params::{MixtureError, ParameterSet};

/// Policy for responsibility rows whose unnormalized mass vanishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum DegenerateRowPolicy {
    /// Substitute the uniform distribution 1/K for the row.
    #[default]
    Uniform,
    /// Fail the E-step with [`MixtureError::DegenerateResponsibility`].
    Fail,
}

/// Compute the N×K responsibility matrix for `data` under `params`.
///
/// Each entry (n, k) is the posterior probability that point n was generated
/// by cluster k; every returned row is a finite, non-negative distribution
/// summing to 1. One Cholesky factorization per cluster provides both the
/// log-determinant and the squared Mahalanobis distances, avoiding repeated
/// direct inversion.
///
/// A covariance that fails to factorize is retried once with `variance_floor`
/// added to its diagonal before the E-step gives up on it.
pub fn expectation(
    data: &DMatrix<f64>,
    params: &ParameterSet,
    policy: DegenerateRowPolicy,
    variance_floor: f64,
) -> Result<DMatrix<f64>, MixtureError> {
    let n = data.nrows();
    let d = data.ncols();
    let k = params.k();

    // Filled with log(weight_k * N(x_n | mu_k, cov_k)), then normalized in place.
    let mut resp = DMatrix::<f64>::zeros(n, k);

    for (ki, cluster) in params.clusters.iter().enumerate() {
        if cluster.mean.len() != d {
            return Err(MixtureError::DimensionMismatch {
                expected: d,
                got: cluster.mean.len(),
            });
        }
        let chol = cholesky_with_floor(&cluster.covariance, variance_floor)
            .ok_or(MixtureError::SingularCovariance { cluster: ki })?;

        // log N(x | mu, S) = -0.5 * (D ln 2pi + ln det S + (x-mu)^T S^-1 (x-mu))
        let log_det = 2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
        let log_norm = -0.5 * (d as f64 * (2.0 * std::f64::consts::PI).ln() + log_det);
        let log_weight = if cluster.weight > 0.0 {
            cluster.weight.ln()
        } else {
            f64::NEG_INFINITY
        };

        for i in 0..n {
            let diff = data.row(i).transpose() - &cluster.mean;
            let maha = diff.dot(&chol.solve(&diff));
            resp[(i, ki)] = log_weight + log_norm - 0.5 * maha;
        }
    }

    for i in 0..n {
        normalize_row(&mut resp, i, policy)?;
    }
    Ok(resp)
}

/// Log-sum-exp normalization of one row, applying the degenerate-row policy
/// when the row carries no finite mass.
fn normalize_row(
    resp: &mut DMatrix<f64>,
    i: usize,
    policy: DegenerateRowPolicy,
) -> Result<(), MixtureError> {
    let k = resp.ncols();
    let row_max = resp.row(i).iter().fold(f64::NEG_INFINITY, |m, &v| m.max(v));

    let mut sum = 0.0;
    if row_max.is_finite() {
        for kj in 0..k {
            let e = (resp[(i, kj)] - row_max).exp();
            resp[(i, kj)] = e;
            sum += e;
        }
    }

    if !(sum.is_finite() && sum > 0.0) {
        return match policy {
            DegenerateRowPolicy::Uniform => {
                resp.row_mut(i).fill(1.0 / k as f64);
                Ok(())
            }
            DegenerateRowPolicy::Fail => Err(MixtureError::DegenerateResponsibility { row: i }),
        };
    }

    for kj in 0..k {
        resp[(i, kj)] /= sum;
    }
    Ok(())
}

/// Cholesky of a covariance, retrying once with a diagonal floor.
pub(crate) fn cholesky_with_floor(
    cov: &DMatrix<f64>,
    floor: f64,
) -> Option<Cholesky<f64, Dyn>> {
    if let Some(c) = Cholesky::new(cov.clone()) {
        return Some(c);
    }
    let mut floored = cov.clone();
    for i in 0..floored.nrows() {
        floored[(i, i)] += floor.max(1e-12);
    }
    Cholesky::new(floored)
}
