//! Identifier pool and solvable store
//!
//! The [`Pool`] owns every string, dependency expression, repository and
//! solvable of a session. Strings and dependencies are interned into small
//! integer handles that stay valid for the lifetime of the pool; solvables
//! live in one flat arena and repositories only hold their ids.

mod arch;
mod dependency;
mod repo;
mod solvable;

pub use arch::{is_known_arch, ArchPolicy, NOARCH};
pub use dependency::{DepId, DepKind, Dependency};
pub use repo::{RepoId, Repository};
pub use solvable::{Solvable, SolvableRecord};

use indexmap::IndexSet;
use satsolver_evr::{parse_relation, Evr, EvrCmpMode, EvrError, Operator, Relation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, SolverError};

/// Solvable ids are 1-based so that `±id` literals are never zero.
pub type SolvableId = i32;

/// Handle of an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StringId(pub(crate) u32);

impl StringId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Session-scoped identifier table, repository registry and solvable arena
#[derive(Debug, Default)]
pub struct Pool {
    strings: IndexSet<String>,
    deps: IndexSet<Dependency>,
    repos: Vec<Option<Repository>>,
    solvables: Vec<Solvable>,
    installed: Option<RepoId>,
    arch: ArchPolicy,
    /// name -> solvables with that name
    by_name: HashMap<StringId, Vec<SolvableId>>,
    /// provided name -> solvables with a provide of that name
    by_provide: HashMap<StringId, Vec<SolvableId>>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Identifiers
    // ---------------------------------------------------------------------

    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(index) = self.strings.get_index_of(s) {
            return StringId(index as u32);
        }
        let (index, _) = self.strings.insert_full(s.to_string());
        StringId(index as u32)
    }

    /// Id of an already interned string
    pub fn find(&self, s: &str) -> Option<StringId> {
        self.strings.get_index_of(s).map(|i| StringId(i as u32))
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this pool.
    pub fn lookup(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    pub fn string_count(&self) -> usize {
        self.strings.len()
    }

    // ---------------------------------------------------------------------
    // Architecture
    // ---------------------------------------------------------------------

    pub fn set_architecture(&mut self, arch: &str) {
        self.arch = ArchPolicy::new(arch);
        log::debug!("System architecture set to {}", arch);
    }

    pub fn architecture(&self) -> Option<&str> {
        self.arch.system()
    }

    /// Lower is better, `None` when the arch can never be installed
    pub fn arch_score(&self, arch: StringId) -> Option<u32> {
        self.arch.score(self.lookup(arch))
    }

    // ---------------------------------------------------------------------
    // Dependencies
    // ---------------------------------------------------------------------

    pub fn intern_dep(&mut self, dep: Dependency) -> DepId {
        let (index, _) = self.deps.insert_full(dep);
        DepId(index as u32)
    }

    pub fn dependency(&self, id: DepId) -> &Dependency {
        &self.deps[id.index()]
    }

    pub fn dep_count(&self) -> usize {
        self.deps.len()
    }

    /// Parse and intern a `name[.arch] [op evr]` expression
    pub fn parse_dep(&mut self, expr: &str) -> Result<DepId> {
        let relation = parse_relation(expr).map_err(|e| malformed(expr, e))?;
        Ok(self.intern_relation(relation))
    }

    fn intern_relation(&mut self, relation: Relation) -> DepId {
        let (name, arch) = split_arch(&relation.name);
        let name = self.intern(name);
        let arch = arch.map(|a| self.intern(a));
        self.intern_dep(Dependency {
            name,
            arch,
            constraint: relation.constraint,
        })
    }

    pub fn dep_str(&self, id: DepId) -> String {
        let dep = self.dependency(id);
        let mut out = self.lookup(dep.name).to_string();
        if let Some(arch) = dep.arch {
            out.push('.');
            out.push_str(self.lookup(arch));
        }
        if let Some((op, evr)) = &dep.constraint {
            out.push_str(&format!(" {} {}", op, evr));
        }
        out
    }

    /// Whether the solvable's own name, version and arch satisfy `dep`
    /// (provides are not consulted)
    pub fn matches_name_dep(&self, id: SolvableId, dep: DepId) -> bool {
        let Ok(s) = self.solvable(id) else {
            return false;
        };
        let d = self.dependency(dep);
        if s.name != d.name || d.arch.is_some_and(|a| a != s.arch) {
            return false;
        }
        match &d.constraint {
            Some((op, evr)) => op.accepts(s.evr.compare_with(evr, EvrCmpMode::MatchRelease)),
            None => true,
        }
    }

    // ---------------------------------------------------------------------
    // Repositories
    // ---------------------------------------------------------------------

    pub fn add_repository(&mut self, name: &str, priority: i32) -> RepoId {
        let id = RepoId(self.repos.len() as u32);
        self.repos.push(Some(Repository::new(id, name, priority)));
        log::debug!("Added repository {} {} (priority {})", id, name, priority);
        id
    }

    pub fn repository(&self, id: RepoId) -> Result<&Repository> {
        self.repos
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(SolverError::InvalidRepository(id))
    }

    pub fn repository_mut(&mut self, id: RepoId) -> Result<&mut Repository> {
        self.repos
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(SolverError::InvalidRepository(id))
    }

    /// Live repositories in creation order
    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repos.iter().flatten()
    }

    /// Remove a repository; its solvable ids stay resolvable for display
    /// but no longer take part in solving.
    pub fn remove_repository(&mut self, id: RepoId) -> Result<()> {
        let repo = self
            .repos
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(SolverError::InvalidRepository(id))?;

        let dead: HashSet<SolvableId> = repo.solvables().iter().copied().collect();
        for ids in self.by_name.values_mut() {
            ids.retain(|s| !dead.contains(s));
        }
        for ids in self.by_provide.values_mut() {
            ids.retain(|s| !dead.contains(s));
        }

        if self.installed == Some(id) {
            self.installed = None;
        }

        log::debug!("Removed repository {} ({} solvables)", repo.name(), repo.len());
        Ok(())
    }

    /// Mark the repository holding the current system state. Only one
    /// repository can be installed; a previous choice is replaced.
    pub fn set_installed(&mut self, id: RepoId) -> Result<()> {
        self.repository(id)?;
        if let Some(previous) = self.installed.filter(|p| *p != id) {
            log::debug!("Installed repository {} replaced by {}", previous, id);
        }
        self.installed = Some(id);
        Ok(())
    }

    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    // ---------------------------------------------------------------------
    // Solvables
    // ---------------------------------------------------------------------

    /// Validate a record and add it to `repo`
    pub fn add_solvable(&mut self, repo: RepoId, record: SolvableRecord) -> Result<SolvableId> {
        self.repository(repo)?;

        if record.name.trim().is_empty() || record.name.contains(char::is_whitespace) {
            return Err(SolverError::MalformedDependency {
                dep: record.name.clone(),
                reason: "invalid solvable name".to_string(),
            });
        }

        let evr = Evr::parse(&record.evr).map_err(|e| SolverError::MalformedDependency {
            dep: format!("{}-{}", record.name, record.evr),
            reason: e.to_string(),
        })?;

        // Parse everything before touching the arena
        let mut relations = Vec::with_capacity(DepKind::ALL.len());
        for kind in DepKind::ALL {
            let parsed = record
                .deps(kind)
                .iter()
                .map(|expr| parse_relation(expr).map_err(|e| malformed(expr, e)))
                .collect::<Result<Vec<_>>>()?;
            relations.push((kind, parsed));
        }

        let id = (self.solvables.len() + 1) as SolvableId;
        let name = self.intern(&record.name);
        let arch = self.intern(if record.arch.is_empty() { NOARCH } else { &record.arch });

        let mut solvable = Solvable {
            name,
            evr: evr.clone(),
            arch,
            repo,
            provides: Vec::new(),
            requires: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
        };

        for (kind, parsed) in relations {
            for relation in parsed {
                let dep = self.intern_relation(relation);
                let list = solvable.deps_mut(kind);
                if !list.contains(&dep) {
                    list.push(dep);
                }
            }
        }

        // Implicit self-provide unless the record provides its own name
        if !solvable.provides.iter().any(|d| self.dependency(*d).name == name) {
            let own = self.intern_dep(Dependency::versioned(name, Operator::Equal, evr));
            solvable.provides.push(own);
        }

        self.by_name.entry(name).or_default().push(id);
        for dep in &solvable.provides {
            let provided = self.deps[dep.index()].name;
            let list = self.by_provide.entry(provided).or_default();
            if list.last() != Some(&id) {
                list.push(id);
            }
        }

        self.solvables.push(solvable);
        self.repository_mut(repo)?.push(id);

        Ok(id)
    }

    pub fn solvable(&self, id: SolvableId) -> Result<&Solvable> {
        if id < 1 {
            return Err(SolverError::InvalidSolvable(id));
        }
        self.solvables
            .get((id - 1) as usize)
            .ok_or(SolverError::InvalidSolvable(id))
    }

    /// Number of solvables ever added, including those of removed repositories
    pub fn solvable_count(&self) -> usize {
        self.solvables.len()
    }

    /// Whether the solvable exists and its repository has not been removed
    pub fn is_live(&self, id: SolvableId) -> bool {
        self.solvable(id)
            .map(|s| matches!(self.repos.get(s.repo.index()), Some(Some(_))))
            .unwrap_or(false)
    }

    pub fn live_solvables(&self) -> impl Iterator<Item = SolvableId> + '_ {
        (1..=self.solvables.len() as SolvableId).filter(move |id| self.is_live(*id))
    }

    pub fn is_installed(&self, id: SolvableId) -> bool {
        match (self.installed, self.solvable(id)) {
            (Some(installed), Ok(s)) => s.repo == installed && self.is_live(id),
            _ => false,
        }
    }

    /// Live and, unless already installed, of a compatible architecture
    pub fn is_installable(&self, id: SolvableId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        if self.is_installed(id) {
            return true;
        }
        self.solvable(id)
            .map(|s| self.arch_score(s.arch).is_some())
            .unwrap_or(false)
    }

    pub fn repo_priority(&self, id: SolvableId) -> i32 {
        self.solvable(id)
            .and_then(|s| self.repository(s.repo))
            .map(Repository::priority)
            .unwrap_or(i32::MIN)
    }

    /// `name-evr.arch`
    pub fn solvable_str(&self, id: SolvableId) -> String {
        match self.solvable(id) {
            Ok(s) => format!("{}-{}.{}", self.lookup(s.name), s.evr, self.lookup(s.arch)),
            Err(_) => format!("<unknown solvable {}>", id),
        }
    }

    /// Live solvables with a provide entry named `name`
    pub fn whatprovides_name(&self, name: StringId) -> &[SolvableId] {
        self.by_provide.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Live solvables named `name`
    pub fn solvables_named(&self, name: StringId) -> &[SolvableId] {
        self.by_name.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn malformed(expr: &str, err: EvrError) -> SolverError {
    let reason = match err {
        EvrError::MalformedRelation { reason, .. } => reason,
        other => other.to_string(),
    };
    SolverError::MalformedDependency {
        dep: expr.to_string(),
        reason,
    }
}

/// Split a trailing `.arch` off a dependency name when it names a known arch
fn split_arch(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((base, arch)) if !base.is_empty() && is_known_arch(arch) => (base, Some(arch)),
        _ => (name, None),
    }
}
