use satsolver_evr::Evr;

use super::{DepId, DepKind, RepoId, StringId};

/// Attribute record delivered by the ingestion boundary.
///
/// Dependency lists are kept as expressions (`"glibc >= 2.34"`) and parsed
/// when the record is added to a pool.
#[derive(Debug, Clone, Default)]
pub struct SolvableRecord {
    pub name: String,
    pub evr: String,
    pub arch: String,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub conflicts: Vec<String>,
    pub obsoletes: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
}

impl SolvableRecord {
    pub fn new(name: impl Into<String>, evr: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evr: evr.into(),
            arch: arch.into(),
            ..Default::default()
        }
    }

    pub fn provides(mut self, dep: &str) -> Self {
        self.provides.push(dep.to_string());
        self
    }

    pub fn requires(mut self, dep: &str) -> Self {
        self.requires.push(dep.to_string());
        self
    }

    pub fn conflicts(mut self, dep: &str) -> Self {
        self.conflicts.push(dep.to_string());
        self
    }

    pub fn obsoletes(mut self, dep: &str) -> Self {
        self.obsoletes.push(dep.to_string());
        self
    }

    pub fn recommends(mut self, dep: &str) -> Self {
        self.recommends.push(dep.to_string());
        self
    }

    pub fn suggests(mut self, dep: &str) -> Self {
        self.suggests.push(dep.to_string());
        self
    }

    pub(crate) fn deps(&self, kind: DepKind) -> &[String] {
        match kind {
            DepKind::Provides => &self.provides,
            DepKind::Requires => &self.requires,
            DepKind::Conflicts => &self.conflicts,
            DepKind::Obsoletes => &self.obsoletes,
            DepKind::Recommends => &self.recommends,
            DepKind::Suggests => &self.suggests,
        }
    }
}

/// A package version stored in the pool arena
#[derive(Debug, Clone)]
pub struct Solvable {
    pub name: StringId,
    pub evr: Evr,
    pub arch: StringId,
    pub repo: RepoId,
    pub(crate) provides: Vec<DepId>,
    pub(crate) requires: Vec<DepId>,
    pub(crate) conflicts: Vec<DepId>,
    pub(crate) obsoletes: Vec<DepId>,
    pub(crate) recommends: Vec<DepId>,
    pub(crate) suggests: Vec<DepId>,
}

impl Solvable {
    pub fn deps(&self, kind: DepKind) -> &[DepId] {
        match kind {
            DepKind::Provides => &self.provides,
            DepKind::Requires => &self.requires,
            DepKind::Conflicts => &self.conflicts,
            DepKind::Obsoletes => &self.obsoletes,
            DepKind::Recommends => &self.recommends,
            DepKind::Suggests => &self.suggests,
        }
    }

    pub fn provides(&self) -> &[DepId] {
        &self.provides
    }

    pub fn requires(&self) -> &[DepId] {
        &self.requires
    }

    pub fn conflicts(&self) -> &[DepId] {
        &self.conflicts
    }

    pub fn obsoletes(&self) -> &[DepId] {
        &self.obsoletes
    }

    pub fn recommends(&self) -> &[DepId] {
        &self.recommends
    }

    pub fn suggests(&self) -> &[DepId] {
        &self.suggests
    }

    pub(crate) fn deps_mut(&mut self, kind: DepKind) -> &mut Vec<DepId> {
        match kind {
            DepKind::Provides => &mut self.provides,
            DepKind::Requires => &mut self.requires,
            DepKind::Conflicts => &mut self.conflicts,
            DepKind::Obsoletes => &mut self.obsoletes,
            DepKind::Recommends => &mut self.recommends,
            DepKind::Suggests => &mut self.suggests,
        }
    }
}
