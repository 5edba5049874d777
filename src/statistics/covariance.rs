//! Sample covariance estimation for fixed-dimension observation vectors.
//!
//! Two estimators are provided and agree to floating point precision:
//! - [`sample_covariance`]: two-pass batch computation over columns
//! - [`WelfordCovariance`]: single-pass accumulator that can be merged, so
//!   per-arm accumulators combine into the covariance of the pooled sample

use nalgebra::{SMatrix, SVector};

/// Online covariance accumulator using Welford's algorithm.
///
/// Accumulates the running mean and M2 (sum of outer products of deviations),
/// converted to the unbiased covariance via M2/(n-1).
#[derive(Debug, Clone)]
pub struct WelfordCovariance<const D: usize> {
    /// Count of vectors accumulated so far.
    n: usize,
    /// Running mean of vectors.
    mean: SVector<f64, D>,
    /// Sum of outer products: Σ(x - μ)(x - μ)^T
    m2: SMatrix<f64, D, D>,
}

impl<const D: usize> Default for WelfordCovariance<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> WelfordCovariance<D> {
    /// Create a new accumulator initialized to zeros.
    pub fn new() -> Self {
        Self {
            n: 0,
            mean: SVector::zeros(),
            m2: SMatrix::zeros(),
        }
    }

    /// Accumulate one row per unit from `D` equally long columns.
    pub fn from_columns(columns: [&[f64]; D]) -> Self {
        let mut acc = Self::new();
        let rows = columns.first().map_or(0, |c| c.len());
        for row in 0..rows {
            acc.update(&SVector::from_fn(|i, _| columns[i][row]));
        }
        acc
    }

    /// Update the accumulator with a new vector.
    ///
    /// ```text
    /// δ = x - μₙ₋₁
    /// μₙ = μₙ₋₁ + δ/n
    /// δ' = x - μₙ
    /// M2ₙ = M2ₙ₋₁ + δ·δ'^T
    /// ```
    pub fn update(&mut self, x: &SVector<f64, D>) {
        self.n += 1;
        let n = self.n as f64;

        let delta = x - self.mean;
        self.mean += delta / n;
        let delta2 = x - self.mean;

        self.m2 += delta * delta2.transpose();
    }

    /// Merge another accumulator into this one using Chan's parallel algorithm.
    ///
    /// ```text
    /// n_AB = n_A + n_B
    /// δ = μ_B - μ_A
    /// μ_AB = (n_A·μ_A + n_B·μ_B) / n_AB
    /// M2_AB = M2_A + M2_B + (n_A·n_B/n_AB)·δ·δ^T
    /// ```
    pub fn merge(&mut self, other: &Self) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = other.clone();
            return;
        }

        let n_a = self.n as f64;
        let n_b = other.n as f64;
        let n_ab = n_a + n_b;

        let delta = other.mean - self.mean;
        self.mean = (self.mean * n_a + other.mean * n_b) / n_ab;

        let correction = delta * delta.transpose() * (n_a * n_b / n_ab);
        self.m2 = self.m2 + other.m2 + correction;

        self.n += other.n;
    }

    /// Unbiased sample covariance M2/(n-1), or `None` for fewer than 2 vectors.
    pub fn covariance(&self) -> Option<SMatrix<f64, D, D>> {
        if self.n < 2 {
            return None;
        }
        Some(self.m2 / (self.n - 1) as f64)
    }

    /// Running mean of the accumulated vectors.
    pub fn mean(&self) -> &SVector<f64, D> {
        &self.mean
    }

    /// Number of vectors accumulated.
    pub fn count(&self) -> usize {
        self.n
    }
}

/// Unbiased sample covariance (divisor n-1) of `D` equally long columns.
///
/// Returns `None` when there are fewer than 2 rows.
pub fn sample_covariance<const D: usize>(columns: [&[f64]; D]) -> Option<SMatrix<f64, D, D>> {
    let n = columns.first().map_or(0, |c| c.len());
    if n < 2 {
        return None;
    }

    let mean = SVector::<f64, D>::from_fn(|i, _| columns[i].iter().sum::<f64>() / n as f64);

    let mut cov = SMatrix::<f64, D, D>::zeros();
    for row in 0..n {
        let centered = SVector::<f64, D>::from_fn(|i, _| columns[i][row] - mean[i]);
        cov += centered * centered.transpose();
    }
    cov /= (n - 1) as f64;

    Some(cov)
}

/// Linearized variance `βᵀ Σ β`.
pub fn quadratic_form<const D: usize>(beta: &SVector<f64, D>, cov: &SMatrix<f64, D, D>) -> f64 {
    beta.dot(&(cov * beta))
}

/// Linearized covariance `aᵀ Σ b`.
pub fn bilinear_form<const D: usize>(
    a: &SVector<f64, D>,
    cov: &SMatrix<f64, D, D>,
    b: &SVector<f64, D>,
) -> f64 {
    a.dot(&(cov * b))
}
