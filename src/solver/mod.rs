//! Capacitated maximum-weight assignment of seekers to banks.
//!
//! Rows of the weight matrix are seekers, columns are banks. A solution
//! assigns each seeker to at most one bank while no bank receives more
//! seekers than its capacity. The constraint matrix of this problem is
//! totally unimodular, so both backends here solve it exactly with
//! combinatorial algorithms and agree on the optimal objective (the flow
//! backend up to its `2^-40` fixed-point costs).

mod flow;
mod hungarian;

use std::time::Instant;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Result;

pub use flow::FlowBackend;
pub use hungarian::HungarianBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    /// The deadline passed; the assignment is feasible but not proven optimal.
    TimeLimited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    /// Bank position per seeker position.
    pub assignment: Vec<Option<usize>>,
    pub status: SolveStatus,
}

impl BackendSolution {
    pub(crate) fn unassigned(seekers: usize, status: SolveStatus) -> Self {
        Self {
            assignment: vec![None; seekers],
            status,
        }
    }

    /// Total weight collected by this assignment.
    pub fn objective(&self, weights: &DMatrix<f64>) -> f64 {
        self.assignment
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|col| weights[(row, col)]))
            .sum()
    }
}

/// An exact solver for the capacitated assignment problem.
///
/// Implementations must return an optimal assignment, or a feasible one
/// marked [`SolveStatus::TimeLimited`] when `deadline` passes first.
pub trait AssignmentBackend: Send + Sync {
    fn solve(
        &self,
        weights: &DMatrix<f64>,
        capacities: &[usize],
        deadline: Option<Instant>,
    ) -> Result<BackendSolution>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Hungarian,
    #[default]
    Flow,
}

impl Backend {
    pub fn instantiate(self) -> Box<dyn AssignmentBackend> {
        match self {
            Backend::Hungarian => Box::new(HungarianBackend),
            Backend::Flow => Box::new(FlowBackend),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Whatever optimum the backend reaches first.
    #[default]
    SolverDefined,
    /// Among optima, the one whose bank positions, read seeker by seeker,
    /// are lexicographically smallest, with "unassigned" after every bank.
    Lexicographic,
}

// relative slack under which two objectives count as the same optimum
const TIE_TOLERANCE: f64 = 1e-9;

impl TieBreak {
    /// Solves `weights` with `backend` and settles ties by this rule.
    ///
    /// The lexicographic rule walks the seekers in order and gives each the
    /// lowest bank position that still admits an optimal completion, checked
    /// by re-solving the remaining seekers against the remaining capacity.
    /// Every candidate compares its total against the first optimum, so the
    /// result does not depend on which optimum the backend found. A deadline
    /// hit while refining returns the optimum at hand as time-limited.
    pub fn solve(
        &self,
        backend: &dyn AssignmentBackend,
        weights: &DMatrix<f64>,
        capacities: &[usize],
        deadline: Option<Instant>,
    ) -> Result<BackendSolution> {
        let first = backend.solve(weights, capacities, deadline)?;
        match self {
            TieBreak::Lexicographic if first.status == SolveStatus::Optimal => {
                lexicographic(backend, weights, capacities, deadline, first)
            }
            _ => Ok(first),
        }
    }
}

fn lexicographic(
    backend: &dyn AssignmentBackend,
    weights: &DMatrix<f64>,
    capacities: &[usize],
    deadline: Option<Instant>,
    mut best: BackendSolution,
) -> Result<BackendSolution> {
    let (h, w) = weights.shape();
    let target = best.objective(weights);
    let floor = target - TIE_TOLERANCE * target.abs().max(1.);
    let mut remaining: Vec<usize> = capacities.iter().map(|&c| c.min(h)).collect();
    let mut settled = 0.;
    let mut resolves = 0usize;

    for row in 0..h {
        let rest = DMatrix::from_fn(h - row - 1, w, |r, c| weights[(row + 1 + r, c)]);
        let current = best.assignment[row];
        let mut moved = false;
        for col in 0..current.unwrap_or(w) {
            if remaining[col] == 0 {
                continue;
            }
            remaining[col] -= 1;
            let tail = backend.solve(&rest, &remaining, deadline)?;
            resolves += 1;
            if tail.status == SolveStatus::TimeLimited {
                trace!(row, resolves, "deadline reached while breaking ties");
                best.status = SolveStatus::TimeLimited;
                return Ok(best);
            }
            if settled + weights[(row, col)] + tail.objective(&rest) >= floor {
                best.assignment.truncate(row);
                best.assignment.push(Some(col));
                best.assignment.extend(tail.assignment);
                moved = true;
                break;
            }
            remaining[col] += 1;
        }
        if let (false, Some(col)) = (moved, current) {
            remaining[col] -= 1;
        }
        settled += best.assignment[row].map_or(0., |col| weights[(row, col)]);
    }
    trace!(resolves, "ties broken lexicographically");
    Ok(best)
}

/// Checks that `solution` only uses known banks within their capacities.
pub(crate) fn verify(
    backend: &str,
    solution: &BackendSolution,
    seekers: usize,
    capacities: &[usize],
) -> Result<()> {
    use crate::error::MatchError;

    if solution.assignment.len() != seekers {
        return Err(MatchError::solver(
            backend,
            format!(
                "returned {} rows for {seekers} seekers",
                solution.assignment.len()
            ),
        ));
    }
    let mut load = vec![0usize; capacities.len()];
    for &col in solution.assignment.iter().flatten() {
        match load.get_mut(col) {
            Some(count) => *count += 1,
            None => {
                return Err(MatchError::solver(
                    backend,
                    format!("assigned unknown bank position {col}"),
                ))
            }
        }
    }
    if let Some((col, count)) = load
        .iter()
        .enumerate()
        .find(|&(col, &count)| count > capacities[col])
    {
        return Err(MatchError::solver(
            backend,
            format!(
                "bank position {col} received {count} seekers, capacity {}",
                capacities[col]
            ),
        ));
    }
    Ok(())
}
