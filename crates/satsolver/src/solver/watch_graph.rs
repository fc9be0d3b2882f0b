use super::decisions::Decisions;
use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched-literal index for unit propagation.
///
/// Every hard rule with two or more literals watches two of them; a rule is
/// only looked at again when one of its watched literals becomes false.
/// Multi-conflict rules watch all of their literals instead.
#[derive(Debug, Clone, Default)]
pub struct WatchGraph {
    /// literal index -> rules watching that literal
    watches: Vec<Vec<u32>>,
    /// rule id -> its two watched literals
    rule_watches: Vec<Option<[Literal; 2]>>,
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn watchers_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the graph for every enabled hard rule
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::new();
        for rule in rules.hard_rules() {
            graph.add_rule(rule);
        }
        graph
    }

    /// Watch the first two literals of `rule` (all of them for multi-conflicts)
    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 || rule.is_weak() || rule.is_disabled() {
            return;
        }

        let rule_id = rule.id();

        if rule.is_multi_conflict() {
            for &literal in literals {
                self.watchers_mut(literal).push(rule_id);
            }
            return;
        }

        let idx = rule_id as usize;
        if idx >= self.rule_watches.len() {
            self.rule_watches.resize(idx + 1, None);
        }
        self.rule_watches[idx] = Some([literals[0], literals[1]]);
        self.watchers_mut(literals[0]).push(rule_id);
        self.watchers_mut(literals[1]).push(rule_id);
    }

    /// Rules currently watching `literal`
    pub fn watchers(&self, literal: Literal) -> &[u32] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn watched_literals(&self, rule_id: u32) -> Option<[Literal; 2]> {
        self.rule_watches.get(rule_id as usize).copied().flatten()
    }
}

/// Applies the consequences of one newly true literal.
pub struct Propagator<'a> {
    graph: &'a mut WatchGraph,
    rules: &'a RuleSet,
    decisions: &'a mut Decisions,
}

impl<'a> Propagator<'a> {
    pub fn new(graph: &'a mut WatchGraph, rules: &'a RuleSet, decisions: &'a mut Decisions) -> Self {
        Self {
            graph,
            rules,
            decisions,
        }
    }

    /// Visit every rule watching `-literal`, moving watches or deciding unit
    /// literals (with the rule as reason) at the current level.
    ///
    /// Returns the id of a rule whose literals are all false.
    pub fn propagate(&mut self, literal: Literal) -> Result<(), u32> {
        let false_literal = -literal;
        let idx = WatchGraph::literal_to_index(false_literal);
        if idx >= self.graph.watches.len() {
            return Ok(());
        }

        let rules = self.rules;
        let watching = std::mem::take(&mut self.graph.watches[idx]);
        let mut kept = Vec::with_capacity(watching.len());
        let mut result = Ok(());
        let mut pending = watching.into_iter();

        for rule_id in pending.by_ref() {
            let Some(rule) = rules.get(rule_id) else {
                continue;
            };

            if rule.is_disabled() {
                kept.push(rule_id);
                continue;
            }

            if rule.is_multi_conflict() {
                kept.push(rule_id);
                if let Err(conflict) = self.propagate_multi_conflict(rule, false_literal) {
                    result = Err(conflict);
                    break;
                }
                continue;
            }

            let watched = self.graph.rule_watches.get(rule_id as usize).copied().flatten();
            let Some([w1, w2]) = watched else {
                panic!("rule {} is in the watch list of {} but has no watches", rule_id, false_literal);
            };
            assert!(
                w1 == false_literal || w2 == false_literal,
                "rule {} watched on {} but its watches are [{}, {}]",
                rule_id,
                false_literal,
                w1,
                w2
            );
            let other = if w1 == false_literal { w2 } else { w1 };

            if self.decisions.satisfied(other) {
                kept.push(rule_id);
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&l| l != w1 && l != w2 && !self.decisions.conflict(l));

            if let Some(new_watch) = replacement {
                self.graph.rule_watches[rule_id as usize] = Some([new_watch, other]);
                self.graph.watchers_mut(new_watch).push(rule_id);
                continue;
            }

            kept.push(rule_id);

            if self.decisions.conflict(other) {
                result = Err(rule_id);
                break;
            }

            self.decisions.decide(other, Some(rule_id));
        }

        kept.extend(pending);
        // New watches never land on the false literal itself
        self.graph.watches[idx] = kept;
        result
    }

    /// `false_literal` became false, meaning one of the solvables got
    /// installed: every other one must now be uninstalled.
    fn propagate_multi_conflict(&mut self, rule: &Rule, false_literal: Literal) -> Result<(), u32> {
        for &other in rule.literals() {
            if other == false_literal || self.decisions.satisfied(other) {
                continue;
            }
            if self.decisions.conflict(other) {
                return Err(rule.id());
            }
            self.decisions.decide(other, Some(rule.id()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::rule::RuleType;

    fn rule_set(rules: Vec<Rule>) -> RuleSet {
        let mut set = RuleSet::new();
        for rule in rules {
            set.add(rule);
        }
        set
    }

    #[test]
    fn test_watch_graph_from_rules() {
        let rules = rule_set(vec![
            Rule::for_job(RuleType::JobInstall, vec![1], 0),
            Rule::requires(1, &[2, 3]),
            Rule::hint(RuleType::Recommends, 1, &[4]),
        ]);
        let graph = WatchGraph::from_rules(&rules);

        assert!(graph.watchers(1).is_empty());
        assert_eq!(graph.watchers(-1), &[1]);
        assert_eq!(graph.watchers(2), &[1]);
        assert!(graph.watchers(3).is_empty());
        assert!(graph.watchers(4).is_empty());
        assert_eq!(graph.watched_literals(1), Some([-1, 2]));
    }

    #[test]
    fn test_propagate_moves_watch() {
        let rules = rule_set(vec![Rule::requires(1, &[2, 3])]);
        let mut graph = WatchGraph::from_rules(&rules);
        let mut decisions = Decisions::new(3);

        decisions.decide(-2, None);
        Propagator::new(&mut graph, &rules, &mut decisions).propagate(-2).unwrap();

        assert_eq!(graph.watched_literals(0), Some([3, -1]));
        assert!(graph.watchers(2).is_empty());
        assert_eq!(graph.watchers(3), &[0]);
        assert!(decisions.undecided(1));
    }

    #[test]
    fn test_propagate_unit() {
        let rules = rule_set(vec![Rule::requires(1, &[2])]);
        let mut graph = WatchGraph::from_rules(&rules);
        let mut decisions = Decisions::new(2);

        decisions.decide(1, None);
        Propagator::new(&mut graph, &rules, &mut decisions).propagate(1).unwrap();

        assert!(decisions.decided_install(2));
        assert_eq!(decisions.decision_rule(2), Some(0));
    }

    #[test]
    fn test_propagate_conflict() {
        let rules = rule_set(vec![Rule::conflict(1, 2)]);
        let mut graph = WatchGraph::from_rules(&rules);
        let mut decisions = Decisions::new(2);

        decisions.decide(2, None);
        decisions.decide(1, None);
        let result = Propagator::new(&mut graph, &rules, &mut decisions).propagate(1);

        assert_eq!(result, Err(0));
        assert_eq!(graph.watchers(-1), &[0]);
    }

    #[test]
    fn test_propagate_satisfied_rule_is_left_alone() {
        let rules = rule_set(vec![Rule::requires(1, &[2, 3])]);
        let mut graph = WatchGraph::from_rules(&rules);
        let mut decisions = Decisions::new(3);

        decisions.decide(2, None);
        decisions.decide(1, None);
        Propagator::new(&mut graph, &rules, &mut decisions).propagate(1).unwrap();

        assert!(decisions.undecided(3));
        assert_eq!(graph.watched_literals(0), Some([-1, 2]));
    }

    #[test]
    fn test_propagate_multi_conflict() {
        let rules = rule_set(vec![Rule::multi_conflict(&[1, 2, 3])]);
        let mut graph = WatchGraph::from_rules(&rules);
        let mut decisions = Decisions::new(3);

        decisions.decide(2, None);
        Propagator::new(&mut graph, &rules, &mut decisions).propagate(2).unwrap();

        assert!(decisions.decided_remove(1));
        assert!(decisions.decided_remove(3));
        assert_eq!(decisions.decision_rule(3), Some(0));
    }
}
