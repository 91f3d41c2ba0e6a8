//! Mixture parameter types and the fitting error taxonomy.

use nalgebra::{DMatrix, DVector};

// ── Error type ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixtureError {
    /// The dataset has no rows.
    EmptyDataset,
    /// The requested cluster count is below 1.
    InvalidClusterCount { got: usize },
    /// A parameter vector does not match the dataset dimension.
    DimensionMismatch { expected: usize, got: usize },
    /// A responsibility row lost all mass and the fail policy is active.
    DegenerateResponsibility { row: usize },
    /// A covariance stayed non-factorizable even after the variance floor.
    SingularCovariance { cluster: usize },
}

impl std::fmt::Display for MixtureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDataset => write!(f, "dataset is empty"),
            Self::InvalidClusterCount { got } => {
                write!(f, "invalid cluster count: need at least 1, got {}", got)
            }
            Self::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {}, got {}", expected, got)
            }
            Self::DegenerateResponsibility { row } => {
                write!(f, "responsibility row {} has no finite mass", row)
            }
            Self::SingularCovariance { cluster } => {
                write!(f, "covariance of cluster {} is singular", cluster)
            }
        }
    }
}

impl std::error::Error for MixtureError {}

// ── Types ────────────────────────────────────────────────────────────────

/// Parameters of one Gaussian component.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    /// Cluster centroid, length D.
    pub mean: DVector<f64>,
    /// Symmetric positive-definite D×D covariance.
    pub covariance: DMatrix<f64>,
    /// Mixing weight in [0, 1]; weights across the set sum to 1.
    pub weight: f64,
}

/// The full mixture state passed between the E- and M-steps.
///
/// Each iteration produces a fresh snapshot; the convergence controller keeps
/// the previous one only long enough to compute deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub clusters: Vec<ClusterParams>,
}

impl ParameterSet {
    /// Number of clusters K.
    pub fn k(&self) -> usize {
        self.clusters.len()
    }

    /// Data dimension D (0 for an empty set).
    pub fn dim(&self) -> usize {
        self.clusters.first().map_or(0, |c| c.mean.len())
    }

    /// Sum of mixing weights; 1 up to floating-point tolerance for a valid set.
    pub fn weights_sum(&self) -> f64 {
        self.clusters.iter().map(|c| c.weight).sum()
    }
}
