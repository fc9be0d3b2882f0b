use std::collections::HashMap;

use super::rule::{Rule, RuleType};

/// Collection of SAT rules with sequential ids.
///
/// Package rules and weak hints are deduplicated by literal content; job and
/// keep rules are always stored so each keeps its own origin.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    rules_by_type: HashMap<RuleType, Vec<u32>>,
    /// (literal hash, weak) -> rule id
    rule_hashes: HashMap<(u64, bool), u32>,
    /// learned rule id -> rules it was derived from
    learned_why: HashMap<u32, Vec<u32>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, returning its id or the id of an identical existing rule
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let dedup = !rule.rule_type().is_job_origin() && rule.rule_type() != RuleType::Learned;
        let key = (rule.literal_hash(), rule.is_weak());

        if dedup {
            if let Some(&existing_id) = self.rule_hashes.get(&key) {
                if let Some(existing) = self.get(existing_id) {
                    if existing.equals_literals(&rule) {
                        return existing_id;
                    }
                }
            }
        }

        let id = self.rules.len() as u32;
        rule.set_id(id);

        self.rules_by_type.entry(rule.rule_type()).or_default().push(id);
        if dedup {
            self.rule_hashes.insert(key, id);
        }
        self.rules.push(rule);

        id
    }

    /// Add a learned rule together with the rules it was resolved from
    pub fn add_learned(&mut self, rule: Rule, why: Vec<u32>) -> u32 {
        let id = self.add(rule);
        self.learned_why.insert(id, why);
        id
    }

    pub fn learned_why(&self, id: u32) -> &[u32] {
        self.learned_why.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Rule> {
        self.rules.get_mut(id as usize)
    }

    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules_by_type
            .get(&rule_type)
            .into_iter()
            .flatten()
            .filter_map(move |&id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Enabled rules the SAT core enforces
    pub fn hard_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| !r.is_weak() && !r.is_disabled())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn count_by_type(&self, rule_type: RuleType) -> usize {
        self.rules_by_type.get(&rule_type).map(Vec::len).unwrap_or(0)
    }

    pub fn disable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.disable();
        }
    }

    pub fn enable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.enable();
        }
    }

    pub fn stats(&self) -> RuleSetStats {
        let mut stats = RuleSetStats {
            total: self.rules.len(),
            ..Default::default()
        };

        for rule in &self.rules {
            match rule.rule_type() {
                t if t.is_job() => stats.job += 1,
                RuleType::InstalledKeep => stats.keep += 1,
                RuleType::PackageRequires => stats.requires += 1,
                RuleType::PackageConflict | RuleType::PackageObsoletes => stats.conflict += 1,
                RuleType::PackageSameName | RuleType::MultiConflict => stats.same_name += 1,
                RuleType::Learned => stats.learned += 1,
                _ => stats.weak += 1,
            }
            if rule.is_assertion() {
                stats.assertions += 1;
            }
        }

        stats
    }
}

/// Rule counts per category
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RuleSetStats {
    pub total: usize,
    pub assertions: usize,
    pub job: usize,
    pub keep: usize,
    pub requires: usize,
    pub conflict: usize,
    pub same_name: usize,
    pub weak: usize,
    pub learned: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_add() {
        let mut rules = RuleSet::new();
        let id1 = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        let id2 = rules.add(Rule::requires(1, &[2, 3]));
        assert_eq!(id1, 0);
        assert_eq!(id2, 1);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_rule_set_deduplication() {
        let mut rules = RuleSet::new();
        let id1 = rules.add(Rule::conflict(1, 2));
        let id2 = rules.add(Rule::conflict(2, 1));
        assert_eq!(id1, id2);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_weak_rules_do_not_shadow_hard_rules() {
        let mut rules = RuleSet::new();
        let weak = rules.add(Rule::obsoletes(1, 2, true));
        let hard = rules.add(Rule::conflict(1, 2));
        assert_ne!(weak, hard);
        assert_eq!(rules.hard_rules().count(), 1);
    }

    #[test]
    fn test_job_rules_are_never_merged() {
        let mut rules = RuleSet::new();
        let a = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        let b = rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 1));
        assert_ne!(a, b);
        assert_eq!(rules.get(b).and_then(|r| r.job()), Some(1));
    }

    #[test]
    fn test_learned_why() {
        let mut rules = RuleSet::new();
        rules.add(Rule::requires(1, &[2]));
        let learned = rules.add_learned(Rule::learned(vec![-1]), vec![0]);
        assert_eq!(rules.learned_why(learned), &[0]);
        assert_eq!(rules.count_by_type(RuleType::Learned), 1);
        assert!(rules.learned_why(0).is_empty());
    }

    #[test]
    fn test_disable_excludes_from_hard_rules() {
        let mut rules = RuleSet::new();
        let id = rules.add(Rule::requires(1, &[2]));
        rules.disable(id);
        assert_eq!(rules.hard_rules().count(), 0);
        rules.enable(id);
        assert_eq!(rules.hard_rules().count(), 1);
    }

    #[test]
    fn test_stats() {
        let mut rules = RuleSet::new();
        rules.add(Rule::for_job(RuleType::JobInstall, vec![1], 0));
        rules.add(Rule::requires(1, &[2]));
        rules.add(Rule::same_name(2, 3));
        rules.add(Rule::hint(RuleType::Recommends, 1, &[4]));

        let stats = rules.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.job, 1);
        assert_eq!(stats.requires, 1);
        assert_eq!(stats.same_name, 1);
        assert_eq!(stats.weak, 1);
        assert_eq!(stats.assertions, 1);
    }
}
