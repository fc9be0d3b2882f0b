use std::cmp::Ordering;
use std::collections::HashMap;

use super::decisions::Decisions;
use super::rule::{Literal, RuleType};
use super::rule_set::RuleSet;
use crate::pool::{Pool, SolvableId};

/// Whether the already installed version counts as a preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    Install,
    /// Installed solvables lose their head start, so updates win
    Update,
}

/// Policy for selecting between candidate solvables.
///
/// When several solvables can satisfy a rule, the policy determines which
/// one to try first. It never changes whether a solution exists, only which
/// one is found, and is fully deterministic.
#[derive(Debug, Clone)]
pub struct Policy<'a> {
    pool: &'a Pool,
    /// suggested solvable -> solvables suggesting it
    suggested_by: HashMap<SolvableId, Vec<SolvableId>>,
    /// installed solvable -> solvables obsoleting it
    obsoleted_by: HashMap<SolvableId, Vec<SolvableId>>,
}

impl<'a> Policy<'a> {
    pub fn new(pool: &'a Pool) -> Self {
        Self {
            pool,
            suggested_by: HashMap::new(),
            obsoleted_by: HashMap::new(),
        }
    }

    /// Policy that also consults the weak hints of `rules`
    pub fn with_hints(pool: &'a Pool, rules: &RuleSet) -> Self {
        let mut policy = Self::new(pool);

        for rule in rules.rules_of_type(RuleType::Suggests) {
            let Some(source) = rule.source() else {
                continue;
            };
            for &provider in rule.literals().iter().filter(|&&l| l > 0) {
                policy.suggested_by.entry(provider).or_default().push(source);
            }
        }

        for rule in rules.rules_of_type(RuleType::WeakObsoletes) {
            let Some(source) = rule.source() else {
                continue;
            };
            for &literal in rule.literals() {
                let obsoleted = -literal;
                if obsoleted != source && pool.is_installed(obsoleted) {
                    policy.obsoleted_by.entry(obsoleted).or_default().push(source);
                }
            }
        }

        policy
    }

    /// Pick the literal to branch on among the positive literals of a rule.
    ///
    /// 1. Already installed (install mode only)
    /// 2. Higher repository priority
    /// 3. Higher version
    /// 4. Better architecture
    /// 5. Suggested by something being installed
    /// 6. Lower solvable id
    pub fn choose_branch(
        &self,
        literals: &[Literal],
        mode: PolicyMode,
        decisions: &Decisions,
    ) -> Option<Literal> {
        literals
            .iter()
            .copied()
            .filter(|&l| l > 0)
            .min_by(|&a, &b| self.compare(a, b, mode, decisions))
    }

    /// Value for a solvable no rule asks about: installed solvables stay
    /// unless something being installed obsoletes them, everything else is
    /// left out.
    pub fn free_literal(&self, id: SolvableId, decisions: &Decisions) -> Literal {
        if !self.pool.is_installed(id) {
            return -id;
        }
        let obsoleted = self
            .obsoleted_by
            .get(&id)
            .is_some_and(|by| by.iter().any(|&o| decisions.decided_install(o)));
        if obsoleted {
            -id
        } else {
            id
        }
    }

    fn compare(&self, a: SolvableId, b: SolvableId, mode: PolicyMode, decisions: &Decisions) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let pool = self.pool;

        if mode == PolicyMode::Install {
            let ord = pool.is_installed(b).cmp(&pool.is_installed(a));
            if ord != Ordering::Equal {
                return ord;
            }
        }

        let ord = self.priority(b, mode).cmp(&self.priority(a, mode));
        if ord != Ordering::Equal {
            return ord;
        }

        if let (Ok(sa), Ok(sb)) = (pool.solvable(a), pool.solvable(b)) {
            let ord = sb.evr.compare(&sa.evr);
            if ord != Ordering::Equal {
                return ord;
            }

            let score_a = pool.arch_score(sa.arch).unwrap_or(u32::MAX);
            let score_b = pool.arch_score(sb.arch).unwrap_or(u32::MAX);
            let ord = score_a.cmp(&score_b);
            if ord != Ordering::Equal {
                return ord;
            }
        }

        let ord = self.is_suggested(b, decisions).cmp(&self.is_suggested(a, decisions));
        if ord != Ordering::Equal {
            return ord;
        }

        a.cmp(&b)
    }

    fn priority(&self, id: SolvableId, mode: PolicyMode) -> i32 {
        if mode == PolicyMode::Update && self.pool.is_installed(id) {
            return i32::MIN;
        }
        self.pool.repo_priority(id)
    }

    fn is_suggested(&self, id: SolvableId, decisions: &Decisions) -> bool {
        self.suggested_by
            .get(&id)
            .is_some_and(|by| by.iter().any(|&s| decisions.decided_install(s)))
    }
}
