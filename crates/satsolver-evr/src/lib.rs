//! Epoch/version/release handling for package dependency resolution
//!
//! This crate provides parsing and rpm-style ordering of `epoch:version-release`
//! strings, the relation operators used in dependency expressions, and the
//! range intersection test used to match a versioned requirement against a
//! versioned provide.

mod error;
mod evr;
mod operator;
mod relation;
mod vercmp;

pub use error::EvrError;
pub use evr::{Evr, EvrCmpMode};
pub use operator::{ranges_intersect, Operator};
pub use relation::{parse_relation, Relation};
pub use vercmp::vercmp;

pub type Result<T> = std::result::Result<T, EvrError>;
