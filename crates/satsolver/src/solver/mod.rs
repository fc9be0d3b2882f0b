//! SAT-based dependency resolver.
//!
//! This module implements a CDCL (Conflict-Driven Clause Learning) SAT solver
//! for package dependency resolution in the libsolv tradition.
//!
//! # Architecture
//!
//! - [`Matcher`]: resolves dependencies to providers, cached per dependency
//! - [`Request`]: the jobs to resolve
//! - [`RuleGenerator`]: turns jobs and package relations into clauses
//! - [`RuleSet`]: collection of SAT clauses with their origins
//! - [`Policy`]: candidate ordering when branching
//! - [`Solver`]: the CDCL loop
//! - [`Transaction`] / [`ProblemSet`]: the two possible results
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: convert jobs and the reachable dependency graph to clauses
//! 2. **Unit Propagation**: force decisions from unit clauses
//! 3. **Decision Making**: choose solvables using the policy
//! 4. **Conflict Analysis**: learn from conflicts to avoid repeating mistakes
//! 5. **Backjumping**: revert to the second-highest level of the learned clause
//! 6. **Diagnosis**: extract and minimize an unsatisfiable core per problem
//!
//! # Example
//!
//! ```
//! use satsolver::{Pool, Request, Selector, SolvableRecord, Solver};
//!
//! let mut pool = Pool::new();
//! let repo = pool.add_repository("main", 0);
//! pool.add_solvable(repo, SolvableRecord::new("a", "1.0", "noarch").requires("b")).unwrap();
//! pool.add_solvable(repo, SolvableRecord::new("b", "1.0", "noarch")).unwrap();
//!
//! let dep = pool.parse_dep("a").unwrap();
//! let mut request = Request::new();
//! request.install(Selector::Provides(dep));
//!
//! let outcome = Solver::new(&pool).solve(&request).unwrap();
//! assert_eq!(outcome.transaction().map(|tx| tx.len()), Some(2));
//! ```

mod decisions;
mod matcher;
mod policy;
mod problem;
mod request;
mod rule;
mod rule_generator;
mod rule_set;
#[allow(clippy::module_inception)]
mod solver;
mod transaction;
mod watch_graph;


pub use decisions::Decisions;
pub use matcher::Matcher;
pub use policy::{Policy, PolicyMode};
pub use problem::{Problem, ProblemRule, ProblemSet, Resolution, ResolutionKind};
pub use request::{Job, JobKind, Request, Selector};
pub use rule::{Literal, Rule, RuleType};
pub use rule_generator::{GeneratedRules, RuleGenerator};
pub use rule_set::{RuleSet, RuleSetStats};
pub use solver::{solve, SolveOutcome, Solver};
pub use transaction::{Operation, Transaction, TransactionSummary};
pub use watch_graph::{Propagator, WatchGraph};
