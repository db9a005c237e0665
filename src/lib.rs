//! Recourse-aware capacitated matching of loan seekers to banks.
//!
//! Every bank is a linear classifier `w·x + b >= 0` with a capacity. The
//! recourse cost of a (seeker, bank) pair is the Euclidean distance the
//! seeker's features must move to be accepted, and its utility weight is
//! `exp(-beta * cost)`. The [`Engine`] assigns seekers to banks so that the
//! total weight is maximal under the capacities, and reports how much of
//! the uncapacitated ideal ([`bound::global_bound`]) survives.
//!
//! ```
//! use recourse_match::{Bank, Engine, EngineConfig, Problem, Seeker};
//!
//! let problem = Problem::new(
//!     vec![Seeker::from_slice(1, &[1., 1.]), Seeker::from_slice(2, &[3., 3.])],
//!     vec![Bank::from_slice(7, &[1., 1.], -5., 1)],
//! )?;
//! let outcome = Engine::new(EngineConfig::default().with_beta(0.5))?.run(&problem)?;
//! assert_eq!(outcome.bank_of(2), Some(7));
//! assert_eq!(outcome.unassigned(), vec![1]);
//! # Ok::<(), recourse_match::MatchError>(())
//! ```

pub mod bound;
pub mod config;
pub mod cost;
pub mod engine;
pub mod error;
pub mod model;
pub mod solver;
pub mod weight;

pub use config::EngineConfig;
pub use engine::{Engine, Match, MatchOutcome};
pub use error::{MatchError, Result};
pub use model::{Bank, BankId, Problem, Seeker, SeekerId};
pub use solver::{AssignmentBackend, Backend, BackendSolution, SolveStatus, TieBreak};
