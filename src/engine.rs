//! The batch pipeline: costs, weights, bound, assignment.

use std::collections::BTreeMap;
use std::time::Instant;

use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::bound::{contended_banks, global_bound};
use crate::config::EngineConfig;
use crate::cost::CostTable;
use crate::error::{MatchError, Result};
use crate::model::{BankId, Problem, SeekerId};
use crate::solver::{self, AssignmentBackend, SolveStatus};
use crate::weight::WeightTable;

/// One assigned (seeker, bank) pair and the recourse behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub seeker: SeekerId,
    pub bank: BankId,
    pub cost: f64,
    pub weight: f64,
    /// Closest feature vector the bank accepts.
    pub target: DVector<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub assignment: BTreeMap<SeekerId, Option<BankId>>,
    pub matches: Vec<Match>,
    pub objective: f64,
    pub global_bound: f64,
    /// Banks picked first by more seekers than their capacity.
    pub contended_banks: Vec<BankId>,
    pub status: SolveStatus,
}

impl MatchOutcome {
    pub fn optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Whether every seeker could have its top-weight bank.
    pub fn contention_free(&self) -> bool {
        self.contended_banks.is_empty()
    }

    pub fn bank_of(&self, seeker: SeekerId) -> Option<BankId> {
        self.assignment.get(&seeker).copied().flatten()
    }

    pub fn assigned_to(&self, bank: BankId) -> Vec<SeekerId> {
        self.matches
            .iter()
            .filter(|m| m.bank == bank)
            .map(|m| m.seeker)
            .collect()
    }

    pub fn unassigned(&self) -> Vec<SeekerId> {
        self.assignment
            .iter()
            .filter(|(_, bank)| bank.is_none())
            .map(|(&seeker, _)| seeker)
            .collect()
    }

    /// Share of the uncapacitated utility kept under capacity limits.
    pub fn efficiency(&self) -> f64 {
        if self.global_bound > 0. {
            self.objective / self.global_bound
        } else {
            1.
        }
    }
}

pub struct Engine {
    config: EngineConfig,
    backend: Box<dyn AssignmentBackend>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let backend = config.backend.instantiate();
        Self::with_backend(config, backend)
    }

    /// Uses `backend` regardless of the backend named in `config`.
    pub fn with_backend(config: EngineConfig, backend: Box<dyn AssignmentBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tables(&self, problem: &Problem) -> Result<(CostTable, WeightTable)> {
        let costs = CostTable::build(problem, self.config.parallel)?;
        let weights = WeightTable::from_costs(&costs, self.config.beta)?;
        Ok((costs, weights))
    }

    pub fn run(&self, problem: &Problem) -> Result<MatchOutcome> {
        let started = Instant::now();
        let (costs, weights) = self.tables(problem)?;
        let bound = global_bound(weights.matrix());
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            bound, "tables ready"
        );

        let capacities = problem.capacities();
        let contended: Vec<BankId> = contended_banks(weights.matrix(), &capacities)
            .into_iter()
            .map(|col| problem.banks()[col].id())
            .collect();
        let deadline = self.config.time_limit().map(|limit| Instant::now() + limit);
        let name = self.backend.name();
        let solution = self.config.tie_break.solve(
            self.backend.as_ref(),
            weights.matrix(),
            &capacities,
            deadline,
        )?;
        solver::verify(name, &solution, problem.seekers().len(), &capacities)?;

        if solution.status == SolveStatus::TimeLimited {
            if !self.config.accept_time_limited {
                return Err(MatchError::solver(
                    name,
                    "time limit reached before optimality was proven",
                ));
            }
            warn!(backend = name, "accepting time-limited assignment");
        }

        let mut assignment = BTreeMap::new();
        let mut matches = Vec::new();
        for (row, (seeker, col)) in problem
            .seekers()
            .iter()
            .zip(&solution.assignment)
            .enumerate()
        {
            let bank = col.map(|col| &problem.banks()[col]);
            assignment.insert(seeker.id(), bank.map(|b| b.id()));
            if let (Some(col), Some(bank)) = (*col, bank) {
                matches.push(Match {
                    seeker: seeker.id(),
                    bank: bank.id(),
                    cost: costs.get(row, col),
                    weight: weights.get(row, col),
                    target: bank.recourse_target(seeker.features())?,
                });
            }
        }
        let objective = solution.objective(weights.matrix());

        info!(
            backend = name,
            seekers = problem.seekers().len(),
            banks = problem.banks().len(),
            capacity = problem.total_capacity(),
            assigned = matches.len(),
            contended = contended.len(),
            objective,
            bound,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assignment solved"
        );

        Ok(MatchOutcome {
            assignment,
            matches,
            objective,
            global_bound: bound,
            contended_banks: contended,
            status: solution.status,
        })
    }
}
