use serde::{Deserialize, Serialize};
use std::fmt;

use super::SolvableId;

/// Handle of a repository inside its [`super::Pool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId(pub(crate) u32);

impl RepoId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, prioritized collection of solvables
#[derive(Debug, Clone)]
pub struct Repository {
    id: RepoId,
    name: String,
    priority: i32,
    solvables: Vec<SolvableId>,
}

impl Repository {
    pub(crate) fn new(id: RepoId, name: impl Into<String>, priority: i32) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            solvables: Vec::new(),
        }
    }

    pub fn id(&self) -> RepoId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Higher priority wins when choosing between providers
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Solvable ids in insertion order
    pub fn solvables(&self) -> &[SolvableId] {
        &self.solvables
    }

    pub fn len(&self) -> usize {
        self.solvables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvables.is_empty()
    }

    pub(crate) fn push(&mut self, id: SolvableId) {
        self.solvables.push(id);
    }
}
