//! Seekers, banks and the validated problem handed to the engine.

use std::collections::HashSet;

use nalgebra::DVector;

use crate::error::{MatchError, Result};

pub type SeekerId = u32;
pub type BankId = u32;

/// A loan applicant described by its feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Seeker {
    id: SeekerId,
    features: DVector<f64>,
}

impl Seeker {
    pub fn new(id: SeekerId, features: DVector<f64>) -> Self {
        Self { id, features }
    }

    pub fn from_slice(id: SeekerId, features: &[f64]) -> Self {
        Self::new(id, DVector::from_column_slice(features))
    }

    pub fn id(&self) -> SeekerId {
        self.id
    }

    pub fn features(&self) -> &DVector<f64> {
        &self.features
    }
}

/// A lender with a linear acceptance rule `w·x + b >= 0` and a capacity.
///
/// The capacity is signed so that a negative value can be rejected as a
/// configuration error when the problem is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    id: BankId,
    weights: DVector<f64>,
    bias: f64,
    capacity: i64,
}

impl Bank {
    pub fn new(id: BankId, weights: DVector<f64>, bias: f64, capacity: i64) -> Self {
        Self {
            id,
            weights,
            bias,
            capacity,
        }
    }

    pub fn from_slice(id: BankId, weights: &[f64], bias: f64, capacity: i64) -> Self {
        Self::new(id, DVector::from_column_slice(weights), bias, capacity)
    }

    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    /// Value of the decision function `w·x + b`.
    pub fn decision(&self, features: &DVector<f64>) -> f64 {
        self.weights.dot(features) + self.bias
    }

    pub fn accepts(&self, features: &DVector<f64>) -> bool {
        self.decision(features) >= 0.
    }

    /// Euclidean norm of the weight vector, failing for a degenerate classifier.
    ///
    /// Computed on the vector scaled by its largest magnitude so that very
    /// large weights do not overflow.
    pub fn norm(&self) -> Result<f64> {
        if self.weights.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::InvalidClassifier { bank: self.id });
        }
        let scale = self.weights.amax();
        if scale == 0. {
            return Err(MatchError::InvalidClassifier { bank: self.id });
        }
        let norm = scale * self.weights.unscale(scale).norm();
        if norm.is_finite() {
            Ok(norm)
        } else {
            Err(MatchError::config(format!(
                "weight vector of bank {} is too large to normalise",
                self.id
            )))
        }
    }

    /// Signed distance `(w·x + b) / ‖w‖` to the boundary, nonnegative when accepted.
    pub fn signed_distance(&self, features: &DVector<f64>) -> Result<f64> {
        self.distance_with_norm(features, self.norm()?)
    }

    pub(crate) fn distance_with_norm(&self, features: &DVector<f64>, norm: f64) -> Result<f64> {
        let decision = self.decision(features);
        let distance = if decision.is_finite() {
            decision / norm
        } else {
            // w·x left the f64 range; project onto the unit normal instead
            self.weights.unscale(norm).dot(features) + self.bias / norm
        };
        if distance.is_finite() {
            Ok(distance)
        } else {
            Err(MatchError::config(format!(
                "bank {} has no finite decision value for a seeker",
                self.id
            )))
        }
    }

    /// Closest point to `features` that this bank accepts.
    ///
    /// Already accepted feature vectors are returned unchanged.
    pub fn recourse_target(&self, features: &DVector<f64>) -> Result<DVector<f64>> {
        let norm = self.norm()?;
        let distance = self.distance_with_norm(features, norm)?;
        if distance >= 0. {
            return Ok(features.clone());
        }
        Ok(features - self.weights.unscale(norm) * distance)
    }
}

/// Seekers and banks of a single solve, validated and sorted by id.
///
/// Row `i` of every derived table refers to `seekers()[i]` and column `j`
/// to `banks()[j]`.
#[derive(Debug, Clone)]
pub struct Problem {
    seekers: Vec<Seeker>,
    banks: Vec<Bank>,
    dimension: usize,
}

impl Problem {
    pub fn new(mut seekers: Vec<Seeker>, mut banks: Vec<Bank>) -> Result<Self> {
        seekers.sort_by_key(Seeker::id);
        banks.sort_by_key(Bank::id);

        let dimension = seekers
            .first()
            .map(|s| s.features.len())
            .or_else(|| banks.first().map(|b| b.weights.len()))
            .unwrap_or(0);

        let mut seen = HashSet::with_capacity(seekers.len());
        for seeker in &seekers {
            if !seen.insert(seeker.id) {
                return Err(MatchError::config(format!(
                    "seeker id {} appears more than once",
                    seeker.id
                )));
            }
            if seeker.features.len() != dimension {
                return Err(MatchError::config(format!(
                    "seeker {} has {} features, expected {dimension}",
                    seeker.id,
                    seeker.features.len()
                )));
            }
            if seeker.features.iter().any(|v| !v.is_finite()) {
                return Err(MatchError::config(format!(
                    "seeker {} has a non-finite feature",
                    seeker.id
                )));
            }
        }

        let mut seen = HashSet::with_capacity(banks.len());
        for bank in &banks {
            if !seen.insert(bank.id) {
                return Err(MatchError::config(format!(
                    "bank id {} appears more than once",
                    bank.id
                )));
            }
            if bank.weights.len() != dimension {
                return Err(MatchError::config(format!(
                    "bank {} has {} weights, expected {dimension}",
                    bank.id,
                    bank.weights.len()
                )));
            }
            if !bank.bias.is_finite() {
                return Err(MatchError::config(format!(
                    "bank {} has a non-finite bias",
                    bank.id
                )));
            }
            if bank.capacity < 0 {
                return Err(MatchError::config(format!(
                    "bank {} has negative capacity {}",
                    bank.id, bank.capacity
                )));
            }
            bank.norm()?;
        }

        Ok(Self {
            seekers,
            banks,
            dimension,
        })
    }

    pub fn seekers(&self) -> &[Seeker] {
        &self.seekers
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Capacities in bank order; validated to be nonnegative.
    pub fn capacities(&self) -> Vec<usize> {
        self.banks
            .iter()
            .map(|b| usize::try_from(b.capacity).unwrap_or(0))
            .collect()
    }

    pub fn total_capacity(&self) -> usize {
        self.capacities().iter().sum()
    }
}
