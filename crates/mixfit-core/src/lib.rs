//! mixfit-core — Gaussian Mixture Model fitting via Expectation-Maximization.
//!
//! Fits a K-component Gaussian mixture to an in-memory N×D dataset. The
//! fitting pipeline stages are:
//!
//! 1. **Init** – draw initial means at the scale of the data, identity
//!    covariances, uniform mixing weights.
//! 2. **Expectation** – per-point posterior responsibilities over clusters,
//!    evaluated in the log domain via a per-cluster Cholesky factorization.
//! 3. **Maximization** – responsibility-weighted re-estimation of means,
//!    covariances, and weights, with mass and variance floors against
//!    starved or collapsed clusters.
//! 4. **Fit** – convergence loop alternating the E- and M-steps with an
//!    explicit snapshot-and-diff termination test and an iteration budget.
//!
//! The dataset is borrowed read-only for the whole run; every run is
//! deterministic for a fixed seed.

pub mod expectation;
pub mod fit;
pub mod init;
pub mod maximization;
pub mod params;

pub use expectation::{expectation, DegenerateRowPolicy};
pub use fit::{fit, FitConfig, FitReport, ParamDeltas, Termination};
pub use init::initialize;
pub use maximization::maximization;
pub use params::{ClusterParams, MixtureError, ParameterSet};

/// Per-cluster parameters for serialization (plain arrays).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ClusterSummary {
    /// Cluster centroid, length D.
    pub mean: Vec<f64>,
    /// Row-major D×D covariance matrix.
    pub covariance: Vec<Vec<f64>>,
    /// Mixing weight in [0, 1].
    pub weight: f64,
}

impl From<&ClusterParams> for ClusterSummary {
    fn from(c: &ClusterParams) -> Self {
        let d = c.mean.len();
        Self {
            mean: c.mean.iter().copied().collect(),
            covariance: (0..d)
                .map(|i| c.covariance.row(i).iter().copied().collect())
                .collect(),
            weight: c.weight,
        }
    }
}

/// Full fitting outcome for host programs (reporting, display).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FitSummary {
    pub clusters: Vec<ClusterSummary>,
    /// Number of E/M alternations performed.
    pub iterations: usize,
    /// True when all three parameter deltas fell below the tolerance.
    pub converged: bool,
    pub termination: Termination,
    /// Deltas from the final iteration, if at least one iteration ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deltas: Option<ParamDeltas>,
}

impl From<&FitReport> for FitSummary {
    fn from(r: &FitReport) -> Self {
        Self {
            clusters: r.params.clusters.iter().map(ClusterSummary::from).collect(),
            iterations: r.iterations,
            converged: r.converged(),
            termination: r.termination,
            last_deltas: r.last_deltas,
        }
    }
}
