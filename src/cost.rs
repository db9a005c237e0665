//! Recourse cost: distance from a seeker to a bank's acceptance region.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::model::{Bank, Problem};

/// Euclidean distance from `features` to the half-space `bank` accepts.
///
/// Returns `0` when the bank already accepts the seeker and fails with
/// [`MatchError::InvalidClassifier`](crate::MatchError::InvalidClassifier) for a zero-norm bank.
/// A distance outside the `f64` range is an
/// [`InvalidConfiguration`](crate::MatchError::InvalidConfiguration).
pub fn recourse_cost(features: &DVector<f64>, bank: &Bank) -> Result<f64> {
    let norm = bank.norm()?;
    cost_with_norm(features, bank, norm)
}

fn cost_with_norm(features: &DVector<f64>, bank: &Bank, norm: f64) -> Result<f64> {
    let distance = bank.distance_with_norm(features, norm)?;
    Ok(if distance >= 0. { 0. } else { -distance })
}

/// Recourse cost of every (seeker, bank) pair of a problem.
#[derive(Debug, Clone, PartialEq)]
pub struct CostTable {
    costs: DMatrix<f64>,
}

impl CostTable {
    /// Computes the table, optionally spreading seekers over the rayon pool.
    ///
    /// All bank norms are checked before any cost is computed.
    pub fn build(problem: &Problem, parallel: bool) -> Result<Self> {
        let norms = problem
            .banks()
            .iter()
            .map(Bank::norm)
            .collect::<Result<Vec<f64>>>()?;

        let (h, w) = (problem.seekers().len(), problem.banks().len());
        if h == 0 || w == 0 {
            return Ok(Self {
                costs: DMatrix::zeros(h, w),
            });
        }

        let fill_row = |(row, out): (usize, &mut [f64])| -> Result<()> {
            let features = problem.seekers()[row].features();
            for (col, (bank, norm)) in problem.banks().iter().zip(&norms).enumerate() {
                out[col] = cost_with_norm(features, bank, *norm)?;
            }
            Ok(())
        };

        // row-major scratch so every seeker owns a disjoint chunk
        let mut data = vec![0.; h * w];
        if parallel {
            data.par_chunks_mut(w).enumerate().try_for_each(fill_row)?;
        } else {
            data.chunks_mut(w).enumerate().try_for_each(fill_row)?;
        }
        debug!(seekers = h, banks = w, parallel, "cost table built");

        Ok(Self {
            costs: DMatrix::from_row_slice(h, w, &data),
        })
    }

    pub fn get(&self, seeker: usize, bank: usize) -> f64 {
        self.costs[(seeker, bank)]
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.costs
    }

    pub fn shape(&self) -> (usize, usize) {
        self.costs.shape()
    }
}
