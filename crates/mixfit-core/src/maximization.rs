//! M-step: parameter re-estimation from responsibilities.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::params::{ClusterParams, ParameterSet};

/// Mass below which a cluster is treated as starved of support.
const MASS_FLOOR: f64 = 1e-10;

/// Re-estimate means, covariances, and weights from the responsibility matrix.
///
/// For each cluster: effective mass Nk is the responsibility column sum, the
/// mean is the responsibility-weighted average of the points, the covariance
/// the weighted outer-product scatter around that mean, and the weight Nk/N.
///
/// Never fails: Nk is floored at a small epsilon before any division, and a
/// covariance that does not factorize gets `variance_floor` added to its
/// diagonal until it does (falling back to the identity for a non-finite
/// scatter), so the returned set is invertible for the next E-step even when
/// a cluster collected no support.
pub fn maximization(
    data: &DMatrix<f64>,
    responsibilities: &DMatrix<f64>,
    variance_floor: f64,
) -> ParameterSet {
    debug_assert_eq!(responsibilities.nrows(), data.nrows());
    let n = data.nrows();
    let d = data.ncols();
    let k = responsibilities.ncols();

    let mut clusters = Vec::with_capacity(k);
    for kj in 0..k {
        let resp = responsibilities.column(kj);
        let nk = resp.sum().max(MASS_FLOOR);

        let mut mean = DVector::<f64>::zeros(d);
        for i in 0..n {
            mean.axpy(resp[i], &data.row(i).transpose(), 1.0);
        }
        mean /= nk;

        let mut cov = DMatrix::<f64>::zeros(d, d);
        for i in 0..n {
            let diff = data.row(i).transpose() - &mean;
            cov.ger(resp[i], &diff, &diff, 1.0);
        }
        cov /= nk;

        // Accumulation can drift off exact symmetry.
        let cov = 0.5 * (&cov + cov.transpose());
        let cov = floor_to_invertible(cov, variance_floor);

        clusters.push(ClusterParams {
            mean,
            covariance: cov,
            weight: nk / n as f64,
        });
    }
    ParameterSet { clusters }
}

/// Add the variance floor to the diagonal, escalating, until the matrix
/// admits a Cholesky factorization. A scatter that still refuses to factor
/// (NaN/Inf entries from non-finite input) is replaced by the identity, so
/// the next E-step always receives an invertible shape.
fn floor_to_invertible(mut cov: DMatrix<f64>, variance_floor: f64) -> DMatrix<f64> {
    let d = cov.nrows();
    let mut jitter = variance_floor.max(1e-12);
    for _ in 0..8 {
        if Cholesky::new(cov.clone()).is_some() {
            return cov;
        }
        for i in 0..d {
            cov[(i, i)] += jitter;
        }
        jitter *= 10.0;
    }
    if Cholesky::new(cov.clone()).is_some() {
        cov
    } else {
        DMatrix::identity(d, d)
    }
}
