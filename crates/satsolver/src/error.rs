use thiserror::Error;

use crate::config::ConfigError;
use crate::json::LoadError;
use crate::pool::{RepoId, SolvableId};

/// Main error type for pool construction and solving
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Unknown repository {0}")]
    InvalidRepository(RepoId),

    #[error("Unknown solvable {0}")]
    InvalidSolvable(SolvableId),

    #[error("Malformed dependency \"{dep}\": {reason}")]
    MalformedDependency { dep: String, reason: String },

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Evr(#[from] satsolver_evr::EvrError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, SolverError>;
