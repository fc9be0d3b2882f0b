pub mod config;
pub mod error;
pub mod json;
pub mod pool;
pub mod solver;

pub use config::{ConfigError, ConfigSource, ObsoletesMode, SolverConfig};
pub use error::{Result, SolverError};
pub use json::{LoadError, Testcase};
pub use pool::{DepId, DepKind, Dependency, Pool, RepoId, Repository, Solvable, SolvableId, SolvableRecord, StringId};
pub use solver::{
    solve, Job, JobKind, Operation, Problem, ProblemSet, Request, Resolution, ResolutionKind, Selector,
    SolveOutcome, Solver, Transaction, TransactionSummary,
};
