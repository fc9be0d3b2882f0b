use std::collections::BTreeMap;
use std::fmt;

use super::request::{JobKind, Request, Selector};
use super::rule::{Literal, Rule, RuleType};
use super::rule_set::RuleSet;
use crate::pool::{Pool, SolvableId};

/// A rule of an unsatisfiable core, rendered for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemRule {
    pub rule_id: u32,
    pub rule_type: RuleType,
    pub source: Option<SolvableId>,
    pub job: Option<usize>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// Drop the job with this index from the request
    RemoveJob(usize),
    /// Let the installed solvable be removed
    AllowUninstall(SolvableId),
}

/// One way of relaxing the request. Applying it is not guaranteed to make
/// the request solvable; the caller has to solve again to find out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub rule_id: u32,
    pub kind: ResolutionKind,
    pub description: String,
}

impl Resolution {
    /// Copy of `request` with this resolution applied
    pub fn apply(&self, request: &Request) -> Request {
        match self.kind {
            ResolutionKind::RemoveJob(index) => request.without_job(index),
            ResolutionKind::AllowUninstall(id) => {
                let mut relaxed = request.clone();
                relaxed.allow_uninstall(Selector::Solvable(id));
                relaxed
            }
        }
    }
}

/// A minimal set of rules that cannot be satisfied together, plus the
/// resolutions that would remove one of its job-origin rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    rules: Vec<ProblemRule>,
    resolutions: Vec<Resolution>,
}

impl Problem {
    pub(crate) fn from_core(core: &[u32], rules: &RuleSet, pool: &Pool, request: &Request) -> Self {
        let mut problem_rules = Vec::with_capacity(core.len());
        // job index -> first rule of that job; keep rules by solvable
        let mut jobs: BTreeMap<usize, u32> = BTreeMap::new();
        let mut keeps: BTreeMap<SolvableId, u32> = BTreeMap::new();

        for &rule_id in core {
            let Some(rule) = rules.get(rule_id) else {
                continue;
            };
            problem_rules.push(ProblemRule {
                rule_id,
                rule_type: rule.rule_type(),
                source: rule.source(),
                job: rule.job(),
                description: describe_rule(rule, pool, request),
            });

            if let Some(job) = rule.job() {
                jobs.entry(job).or_insert(rule_id);
            } else if rule.rule_type() == RuleType::InstalledKeep {
                if let Some(source) = rule.source() {
                    keeps.entry(source).or_insert(rule_id);
                }
            }
        }

        let mut resolutions = Vec::with_capacity(jobs.len() + keeps.len());
        for (job, rule_id) in jobs {
            resolutions.push(Resolution {
                rule_id,
                kind: ResolutionKind::RemoveJob(job),
                description: describe_job_removal(job, pool, request),
            });
        }
        for (id, rule_id) in keeps {
            resolutions.push(Resolution {
                rule_id,
                kind: ResolutionKind::AllowUninstall(id),
                description: format!("allow removal of installed {}", pool.solvable_str(id)),
            });
        }

        Self {
            rules: problem_rules,
            resolutions,
        }
    }

    pub fn rules(&self) -> &[ProblemRule] {
        &self.rules
    }

    pub fn rule_ids(&self) -> Vec<u32> {
        self.rules.iter().map(|r| r.rule_id).collect()
    }

    pub fn resolutions(&self) -> &[Resolution] {
        &self.resolutions
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "  - {}", rule.description)?;
        }
        if !self.resolutions.is_empty() {
            writeln!(f, "  Possible resolutions:")?;
            for resolution in &self.resolutions {
                writeln!(f, "    * {}", resolution.description)?;
            }
        }
        Ok(())
    }
}

/// Problems found for one unsatisfiable request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for ProblemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.problems.iter().enumerate() {
            writeln!(f, "Problem {}:", i + 1)?;
            write!(f, "{}", problem)?;
        }
        Ok(())
    }
}

fn selector_str(selector: &Selector, pool: &Pool) -> String {
    match *selector {
        Selector::Solvable(id) => pool.solvable_str(id),
        Selector::Provides(dep) | Selector::Name(dep) => pool.dep_str(dep),
    }
}

fn describe_job_removal(job: usize, pool: &Pool, request: &Request) -> String {
    match request.job(job) {
        Some(job) => format!("do not {} {}", job.kind.as_str(), selector_str(&job.selector, pool)),
        None => format!("do not ask for job #{}", job),
    }
}

fn describe_rule(rule: &Rule, pool: &Pool, request: &Request) -> String {
    let source = rule.source().map(|s| pool.solvable_str(s)).unwrap_or_default();
    let dep = rule.dep().map(|d| pool.dep_str(d)).unwrap_or_default();
    let others = |skip: Option<SolvableId>| -> Vec<String> {
        rule.literals()
            .iter()
            .map(|l| l.abs())
            .filter(|&id| Some(id) != skip)
            .map(|id| pool.solvable_str(id))
            .collect()
    };

    match rule.rule_type() {
        RuleType::JobInstall | RuleType::JobErase | RuleType::JobUpdate | RuleType::JobLock => {
            let Some(job) = rule.job().and_then(|j| request.job(j)) else {
                return format!("{} rule", rule.rule_type().as_str());
            };
            let what = selector_str(&job.selector, pool);
            match job.kind {
                JobKind::Install if rule.is_empty() => format!("nothing provides requested {}", what),
                JobKind::Install => format!("installation of {} is requested", what),
                JobKind::Erase => format!("removal of {} is requested", source),
                JobKind::Update => format!("update of {} is requested", source),
                JobKind::Lock => format!("{} is locked", source),
            }
        }
        RuleType::InstalledKeep => format!("{} is installed and must be kept", source),
        RuleType::PackageRequires if rule.len() == 1 => {
            format!("nothing provides {} needed by {}", dep, source)
        }
        RuleType::PackageRequires => format!(
            "{} requires {}, provided by {}",
            source,
            dep,
            others(rule.source()).join(", ")
        ),
        RuleType::PackageConflict => format!(
            "{} conflicts with {}",
            source,
            others(rule.source()).join(", ")
        ),
        RuleType::PackageObsoletes | RuleType::WeakObsoletes => format!(
            "{} obsoletes {}",
            source,
            others(rule.source()).join(", ")
        ),
        RuleType::PackageSameName => {
            format!("cannot install both {}", others(None).join(" and "))
        }
        RuleType::MultiConflict => {
            format!("only one of {} can be installed", others(None).join(", "))
        }
        RuleType::Recommends => format!("{} recommends {}", source, dep),
        RuleType::Suggests => format!("{} suggests {}", source, dep),
        RuleType::Learned => format!("learned rule {}", rule),
    }
}

/// Deletion-based minimization: drop every rule without which the rest is
/// still refuted by unit propagation.
///
/// Cores that unit propagation alone cannot refute are returned unchanged.
pub(crate) fn minimize_core(core: &[u32], rules: &RuleSet) -> Vec<u32> {
    let mut current: Vec<u32> = core.to_vec();
    if !refuted_by_propagation(&current, rules) {
        log::debug!("Core of {} rules is not refuted by propagation alone", current.len());
        return current;
    }

    // Later rules (jobs come first) are tried first
    let mut index = current.len();
    while index > 0 {
        index -= 1;
        let mut candidate = current.clone();
        candidate.remove(index);
        if refuted_by_propagation(&candidate, rules) {
            current = candidate;
        }
    }

    current
}

/// Whether unit propagation over `subset` alone derives a conflict
pub(crate) fn refuted_by_propagation(subset: &[u32], rules: &RuleSet) -> bool {
    let clauses: Vec<&Rule> = subset.iter().filter_map(|&id| rules.get(id)).collect();
    let num_vars = clauses
        .iter()
        .flat_map(|r| r.literals())
        .map(|l| l.unsigned_abs() as usize)
        .max()
        .unwrap_or(0);
    let mut values: Vec<Option<bool>> = vec![None; num_vars + 1];

    let value = |values: &[Option<bool>], literal: Literal| -> Option<bool> {
        values[literal.unsigned_abs() as usize].map(|v| v == (literal > 0))
    };

    loop {
        let mut changed = false;

        for rule in &clauses {
            if rule.is_empty() {
                return true;
            }

            if rule.is_multi_conflict() {
                let installed: Vec<Literal> = rule
                    .literals()
                    .iter()
                    .copied()
                    .filter(|&l| value(&values, l) == Some(false))
                    .collect();
                if installed.len() > 1 {
                    return true;
                }
                if let Some(&chosen) = installed.first() {
                    for &l in rule.literals() {
                        if l != chosen && value(&values, l).is_none() {
                            values[l.unsigned_abs() as usize] = Some(l > 0);
                            changed = true;
                        }
                    }
                }
                continue;
            }

            let mut unassigned = None;
            let mut open = 0;
            let mut satisfied = false;
            for &l in rule.literals() {
                match value(&values, l) {
                    Some(true) => {
                        satisfied = true;
                        break;
                    }
                    Some(false) => {}
                    None => {
                        open += 1;
                        unassigned = Some(l);
                    }
                }
            }
            if satisfied {
                continue;
            }
            match (open, unassigned) {
                (0, _) => return true,
                (1, Some(l)) => {
                    values[l.unsigned_abs() as usize] = Some(l > 0);
                    changed = true;
                }
                _ => {}
            }
        }

        if !changed {
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::SolvableRecord;

    #[test]
    fn test_refuted_by_propagation() {
        let mut rules = RuleSet::new();
        let job = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        let req = rules.add(Rule::requires(1, &[2]));
        let conflict = rules.add(Rule::for_job(RuleType::JobErase, vec![-2], 1));
        let unrelated = rules.add(Rule::requires(3, &[4]));

        assert!(refuted_by_propagation(&[job, req, conflict], &rules));
        assert!(!refuted_by_propagation(&[job, req], &rules));
        assert!(!refuted_by_propagation(&[job, unrelated], &rules));
    }

    #[test]
    fn test_refuted_by_multi_conflict() {
        let mut rules = RuleSet::new();
        let a = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        let b = rules.add(Rule::for_job(RuleType::JobInstall, vec![2], 1));
        let multi = rules.add(Rule::multi_conflict(&[1, 2, 3]));
        assert!(refuted_by_propagation(&[a, b, multi], &rules));
        assert!(!refuted_by_propagation(&[a, multi], &rules));
    }

    #[test]
    fn test_minimize_core_drops_redundant_rules() {
        let mut rules = RuleSet::new();
        let job = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        let req = rules.add(Rule::requires(1, &[]));
        let extra = rules.add(Rule::requires(1, &[2]));
        let erase = rules.add(Rule::for_job(RuleType::JobErase, vec![-2], 1));

        let minimized = minimize_core(&[job, req, extra, erase], &rules);
        assert_eq!(minimized, vec![job, req]);
    }

    #[test]
    fn test_problem_resolutions() {
        let mut pool = Pool::new();
        let system = pool.add_repository("@System", 0);
        pool.set_installed(system).unwrap();
        let repo = pool.add_repository("main", 0);
        let installed = pool.add_solvable(system, SolvableRecord::new("y", "1.0", "noarch")).unwrap();
        let a = pool
            .add_solvable(repo, SolvableRecord::new("a", "1.0", "noarch").conflicts("y"))
            .unwrap();

        let mut request = Request::new();
        request.install(Selector::Solvable(a));

        let mut rules = RuleSet::new();
        let job = rules.add(Rule::for_job(RuleType::JobInstall, vec![a], 0).with_source(a));
        let keep = rules.add(Rule::keep(installed, &[]));
        let conflict = rules.add(Rule::conflict(a, installed));

        let problem = Problem::from_core(&[job, keep, conflict], &rules, &pool, &request);
        assert_eq!(problem.rule_ids(), vec![job, keep, conflict]);
        assert_eq!(problem.rules()[2].description, "a-1.0.noarch conflicts with y-1.0.noarch");

        let descriptions: Vec<&str> = problem
            .resolutions()
            .iter()
            .map(|r| r.description.as_str())
            .collect();
        assert_eq!(
            descriptions,
            vec!["do not install a-1.0.noarch", "allow removal of installed y-1.0.noarch"]
        );

        let relaxed = problem.resolutions()[0].apply(&request);
        assert!(relaxed.is_empty());
        let relaxed = problem.resolutions()[1].apply(&request);
        assert_eq!(relaxed.uninstall_allowed(), &[Selector::Solvable(installed)]);
    }

    #[test]
    fn test_problem_set_display() {
        let mut pool = Pool::new();
        let repo = pool.add_repository("main", 0);
        let a = pool
            .add_solvable(repo, SolvableRecord::new("a", "1.0", "noarch").requires("b >= 2.0"))
            .unwrap();
        let dep = pool.parse_dep("b >= 2.0").unwrap();

        let mut request = Request::new();
        request.install(Selector::Solvable(a));

        let mut rules = RuleSet::new();
        let job = rules.add(Rule::for_job(RuleType::JobInstall, vec![a], 0).with_source(a));
        let req = rules.add(Rule::requires(a, &[]).with_dep(dep));

        let mut set = ProblemSet::new();
        set.push(Problem::from_core(&[job, req], &rules, &pool, &request));
        let rendered = set.to_string();
        assert!(rendered.starts_with("Problem 1:\n"));
        assert!(rendered.contains("nothing provides b >= 2.0 needed by a-1.0.noarch"));
        assert!(rendered.contains("do not install a-1.0.noarch"));
    }
}
