use thiserror::Error;

use crate::model::BankId;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MatchError {
    #[error("bank {bank} has a zero-norm weight vector")]
    InvalidClassifier { bank: BankId },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("{backend} backend failed: {reason}")]
    SolverFailure { backend: String, reason: String },
}

impl MatchError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        MatchError::InvalidConfiguration(reason.into())
    }

    pub(crate) fn solver(backend: &str, reason: impl Into<String>) -> Self {
        MatchError::SolverFailure {
            backend: backend.to_string(),
            reason: reason.into(),
        }
    }
}
