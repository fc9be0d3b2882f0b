use std::fmt;
use std::hash::{Hash, Hasher};

use crate::pool::{DepId, SolvableId};

/// A literal in SAT terms: `+id` means "installed", `-id` "not installed"
pub type Literal = i32;

/// Origin of a rule, used for branching order and problem reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// install(selector): at least one matched provider
    JobInstall,
    /// erase(selector): a matched provider must not be installed
    JobErase,
    /// update(selector): an installed solvable or one of its updates
    JobUpdate,
    /// lock(selector): a matched solvable is not installed, or with
    /// `lock-installed` an installed match stays installed
    JobLock,
    /// An installed solvable stays installed or is replaced
    InstalledKeep,
    /// If A is installed, one of its providers for a requirement must be
    PackageRequires,
    /// A and B cannot both be installed
    PackageConflict,
    /// Hard obsoletes: the obsoleter and the obsoleted cannot coexist
    PackageObsoletes,
    /// Two solvables with the same name
    PackageSameName,
    /// At most one of several same-name solvables
    MultiConflict,
    /// Soft obsoletes hint, never enforced by the SAT core
    WeakObsoletes,
    /// Recommends hint
    Recommends,
    /// Suggests hint
    Suggests,
    /// Learned clause from conflict analysis
    Learned,
}

impl RuleType {
    pub fn is_job(&self) -> bool {
        matches!(
            self,
            RuleType::JobInstall | RuleType::JobErase | RuleType::JobUpdate | RuleType::JobLock
        )
    }

    /// Rules a user can relax: jobs and installed-keep rules
    pub fn is_job_origin(&self) -> bool {
        self.is_job() || matches!(self, RuleType::InstalledKeep)
    }

    /// Hints consumed by the policy only
    pub fn is_weak(&self) -> bool {
        matches!(self, RuleType::WeakObsoletes | RuleType::Recommends | RuleType::Suggests)
    }

    pub fn is_multi_conflict(&self) -> bool {
        matches!(self, RuleType::MultiConflict)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::JobInstall => "job-install",
            RuleType::JobErase => "job-erase",
            RuleType::JobUpdate => "job-update",
            RuleType::JobLock => "job-lock",
            RuleType::InstalledKeep => "keep-installed",
            RuleType::PackageRequires => "requires",
            RuleType::PackageConflict => "conflict",
            RuleType::PackageObsoletes => "obsoletes",
            RuleType::PackageSameName => "same-name",
            RuleType::MultiConflict => "multi-conflict",
            RuleType::WeakObsoletes => "weak-obsoletes",
            RuleType::Recommends => "recommends",
            RuleType::Suggests => "suggests",
            RuleType::Learned => "learned",
        }
    }
}

/// A SAT rule (clause): a disjunction of literals.
///
/// - `[A]` - A must be installed
/// - `[-A]` - A must not be installed
/// - `[-A, B, C]` - if A is installed, B or C must be
/// - `[-A, -B]` - A and B cannot both be installed
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    id: u32,
    /// Solvable whose metadata produced the rule
    source: Option<SolvableId>,
    /// Dependency the rule was built from
    dep: Option<DepId>,
    /// Index of the job in its request
    job: Option<usize>,
    disabled: bool,
}

impl Rule {
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        Self {
            literals,
            rule_type,
            id: 0,
            source: None,
            dep: None,
            job: None,
            disabled: false,
        }
    }

    /// If `source` is installed, one of `providers` must be
    pub fn requires(source: SolvableId, providers: &[SolvableId]) -> Self {
        let mut literals = Vec::with_capacity(providers.len() + 1);
        literals.push(-source);
        literals.extend_from_slice(providers);
        Self::new(literals, RuleType::PackageRequires).with_source(source)
    }

    pub fn conflict(source: SolvableId, other: SolvableId) -> Self {
        Self::new(vec![-source, -other], RuleType::PackageConflict).with_source(source)
    }

    pub fn obsoletes(source: SolvableId, obsoleted: SolvableId, weak: bool) -> Self {
        let rule_type = if weak {
            RuleType::WeakObsoletes
        } else {
            RuleType::PackageObsoletes
        };
        Self::new(vec![-source, -obsoleted], rule_type).with_source(source)
    }

    pub fn same_name(a: SolvableId, b: SolvableId) -> Self {
        Self::new(vec![-a, -b], RuleType::PackageSameName)
    }

    /// At most one of `solvables`; watched on every literal
    pub fn multi_conflict(solvables: &[SolvableId]) -> Self {
        let literals = solvables.iter().map(|&s| -s).collect();
        Self::new(literals, RuleType::MultiConflict)
    }

    /// Installed solvable stays or one of its replacements is installed
    pub fn keep(installed: SolvableId, replacements: &[SolvableId]) -> Self {
        let mut literals = Vec::with_capacity(replacements.len() + 1);
        literals.push(installed);
        literals.extend_from_slice(replacements);
        Self::new(literals, RuleType::InstalledKeep).with_source(installed)
    }

    pub fn for_job(rule_type: RuleType, literals: Vec<Literal>, job: usize) -> Self {
        debug_assert!(rule_type.is_job());
        let mut rule = Self::new(literals, rule_type);
        rule.job = Some(job);
        rule
    }

    /// Weak positive hint: if `source` is installed, prefer one of `providers`
    pub fn hint(rule_type: RuleType, source: SolvableId, providers: &[SolvableId]) -> Self {
        debug_assert!(matches!(rule_type, RuleType::Recommends | RuleType::Suggests));
        let mut literals = Vec::with_capacity(providers.len() + 1);
        literals.push(-source);
        literals.extend_from_slice(providers);
        Self::new(literals, rule_type).with_source(source)
    }

    pub fn learned(literals: Vec<Literal>) -> Self {
        Self::new(literals, RuleType::Learned)
    }

    pub fn with_source(mut self, source: SolvableId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_dep(mut self, dep: DepId) -> Self {
        self.dep = Some(dep);
        self
    }

    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn source(&self) -> Option<SolvableId> {
        self.source
    }

    pub fn dep(&self) -> Option<DepId> {
        self.dep
    }

    pub fn job(&self) -> Option<usize> {
        self.job
    }

    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    pub fn is_weak(&self) -> bool {
        self.rule_type.is_weak()
    }

    pub fn is_multi_conflict(&self) -> bool {
        self.rule_type.is_multi_conflict()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Hash of the literal set, independent of order
    pub fn literal_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut hasher = DefaultHasher::new();
        let mut sorted = self.literals.clone();
        sorted.sort_unstable();
        sorted.hash(&mut hasher);
        hasher.finish()
    }

    /// Same literal set, regardless of order
    pub fn equals_literals(&self, other: &Rule) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }
        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule#{}({:?}, {:?})", self.id, self.rule_type, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { l.to_string() })
            .collect();
        write!(f, "({}) [{}]", self.rule_type.as_str(), literals.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_requires() {
        let rule = Rule::requires(1, &[2, 3, 4]);
        assert_eq!(rule.literals(), &[-1, 2, 3, 4]);
        assert_eq!(rule.rule_type(), RuleType::PackageRequires);
        assert_eq!(rule.source(), Some(1));
    }

    #[test]
    fn test_rule_requires_without_providers_is_assertion() {
        let rule = Rule::requires(7, &[]);
        assert!(rule.is_assertion());
        assert_eq!(rule.literals(), &[-7]);
    }

    #[test]
    fn test_rule_keep() {
        let rule = Rule::keep(3, &[5, 6]);
        assert_eq!(rule.literals(), &[3, 5, 6]);
        assert!(rule.rule_type().is_job_origin());
        assert!(!rule.rule_type().is_job());
    }

    #[test]
    fn test_rule_obsoletes_weak_and_hard() {
        assert!(Rule::obsoletes(1, 2, true).is_weak());
        let hard = Rule::obsoletes(1, 2, false);
        assert!(!hard.is_weak());
        assert_eq!(hard.literals(), &[-1, -2]);
    }

    #[test]
    fn test_rule_multi_conflict() {
        let rule = Rule::multi_conflict(&[1, 2, 3]);
        assert_eq!(rule.literals(), &[-1, -2, -3]);
        assert!(rule.is_multi_conflict());
    }

    #[test]
    fn test_rule_job_carries_index() {
        let rule = Rule::for_job(RuleType::JobInstall, vec![4, 5], 2);
        assert_eq!(rule.job(), Some(2));
        assert!(rule.rule_type().is_job());
    }

    #[test]
    fn test_rule_literal_hash() {
        let rule1 = Rule::new(vec![1, 2, 3], RuleType::PackageRequires);
        let rule2 = Rule::new(vec![3, 1, 2], RuleType::PackageRequires);
        let rule3 = Rule::new(vec![1, 2, 4], RuleType::PackageRequires);

        assert_eq!(rule1.literal_hash(), rule2.literal_hash());
        assert_ne!(rule1.literal_hash(), rule3.literal_hash());
        assert!(rule1.equals_literals(&rule2));
        assert!(!rule1.equals_literals(&rule3));
    }

    #[test]
    fn test_rule_display() {
        let rule = Rule::requires(1, &[2, 3]);
        assert_eq!(rule.to_string(), "(requires) [-1 | +2 | +3]");
    }
}
