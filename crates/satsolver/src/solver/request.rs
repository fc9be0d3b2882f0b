use serde::{Deserialize, Serialize};

use crate::pool::{DepId, SolvableId};

/// What a job applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selector {
    /// One specific solvable
    Solvable(SolvableId),
    /// Every solvable providing the dependency
    Provides(DepId),
    /// Every solvable whose own name (and version) matches the dependency
    Name(DepId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Install,
    Erase,
    Update,
    Lock,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Install => "install",
            JobKind::Erase => "erase",
            JobKind::Update => "update",
            JobKind::Lock => "lock",
        }
    }
}

/// A user-level resolution request on a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub selector: Selector,
}

impl Job {
    pub fn new(kind: JobKind, selector: Selector) -> Self {
        Self { kind, selector }
    }
}

/// A request specifies what needs to be resolved.
///
/// Jobs are independent clauses: the order they are added in never changes
/// which assignments are valid, only the index used to refer to a job in
/// problem reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    jobs: Vec<Job>,
    /// Installed solvables matched here may be removed without a job
    allow_uninstall: Vec<Selector>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, selector: Selector) -> &mut Self {
        self.push(Job::new(JobKind::Install, selector))
    }

    pub fn erase(&mut self, selector: Selector) -> &mut Self {
        self.push(Job::new(JobKind::Erase, selector))
    }

    pub fn update(&mut self, selector: Selector) -> &mut Self {
        self.push(Job::new(JobKind::Update, selector))
    }

    /// Keep the matched solvables in their current state
    pub fn lock(&mut self, selector: Selector) -> &mut Self {
        self.push(Job::new(JobKind::Lock, selector))
    }

    pub fn push(&mut self, job: Job) -> &mut Self {
        self.jobs.push(job);
        self
    }

    pub fn allow_uninstall(&mut self, selector: Selector) -> &mut Self {
        if !self.allow_uninstall.contains(&selector) {
            self.allow_uninstall.push(selector);
        }
        self
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, index: usize) -> Option<&Job> {
        self.jobs.get(index)
    }

    pub fn uninstall_allowed(&self) -> &[Selector] {
        &self.allow_uninstall
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Copy of the request with job `index` dropped
    pub fn without_job(&self, index: usize) -> Request {
        let mut request = self.clone();
        if index < request.jobs.len() {
            request.jobs.remove(index);
        }
        request
    }
}
