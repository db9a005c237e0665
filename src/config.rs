use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::solver::{Backend, TieBreak};
use crate::weight::validate_beta;

/// Settings shared by every pair of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Decay rate of the cost-to-weight transform, must be positive.
    pub beta: f64,
    pub backend: Backend,
    pub tie_break: TieBreak,
    /// Compute the cost table on the rayon pool.
    pub parallel: bool,
    /// Wall-clock budget for the assignment backend.
    pub time_limit_ms: Option<u64>,
    /// Return the best assignment found when the budget runs out instead of failing.
    pub accept_time_limited: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beta: 1.,
            backend: Backend::default(),
            tie_break: TieBreak::default(),
            parallel: true,
            time_limit_ms: None,
            accept_time_limited: false,
        }
    }
}

impl EngineConfig {
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration, accept_time_limited: bool) -> Self {
        self.time_limit_ms = Some(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX));
        self.accept_time_limited = accept_time_limited;
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        validate_beta(self.beta)
    }
}
