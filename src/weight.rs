//! Exponential decay from recourse cost to utility weight.

use nalgebra::DMatrix;

use crate::cost::CostTable;
use crate::error::{MatchError, Result};

// largest double below one
const BELOW_ONE: f64 = 1. - f64::EPSILON / 2.;

pub fn validate_beta(beta: f64) -> Result<()> {
    if beta > 0. && beta.is_finite() {
        Ok(())
    } else {
        Err(MatchError::config(format!(
            "decay rate beta must be positive and finite, got {beta}"
        )))
    }
}

/// `exp(-beta * cost)`, kept inside `(0, 1]`.
///
/// A positive cost never maps to exactly `1` and no cost underflows to `0`.
/// The weight decreases strictly in the cost only up to `f64` resolution:
/// all costs small enough that `exp` rounds to one share the largest double
/// below one, and all costs large enough to underflow share
/// `f64::MIN_POSITIVE`.
pub fn recourse_weight(cost: f64, beta: f64) -> Result<f64> {
    validate_beta(beta)?;
    Ok(decay(cost, beta))
}

fn decay(cost: f64, beta: f64) -> f64 {
    if cost <= 0. {
        return 1.;
    }
    (-beta * cost).exp().clamp(f64::MIN_POSITIVE, BELOW_ONE)
}

/// Utility weight of every (seeker, bank) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: DMatrix<f64>,
    beta: f64,
}

impl WeightTable {
    pub fn from_costs(costs: &CostTable, beta: f64) -> Result<Self> {
        validate_beta(beta)?;
        Ok(Self {
            weights: costs.matrix().map(|c| decay(c, beta)),
            beta,
        })
    }

    pub fn get(&self, seeker: usize, bank: usize) -> f64 {
        self.weights[(seeker, bank)]
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.weights
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }
}
