use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::matcher::Matcher;
use crate::pool::{Pool, SolvableId};

/// A single operation in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Install a solvable that is not installed
    Install(SolvableId),
    /// Remove an installed solvable
    Erase(SolvableId),
    /// Replace an installed solvable with a newer (or equal) one
    Upgrade { from: SolvableId, to: SolvableId },
    /// Replace an installed solvable with an older one
    Downgrade { from: SolvableId, to: SolvableId },
}

impl Operation {
    /// Solvable installed by this operation
    pub fn installs(&self) -> Option<SolvableId> {
        match *self {
            Operation::Install(id) => Some(id),
            Operation::Upgrade { to, .. } | Operation::Downgrade { to, .. } => Some(to),
            Operation::Erase(_) => None,
        }
    }

    /// Solvable removed by this operation
    pub fn erases(&self) -> Option<SolvableId> {
        match *self {
            Operation::Erase(id) => Some(id),
            Operation::Upgrade { from, .. } | Operation::Downgrade { from, .. } => Some(from),
            Operation::Install(_) => None,
        }
    }

    pub fn describe(&self, pool: &Pool) -> String {
        match *self {
            Operation::Install(id) => format!("install {}", pool.solvable_str(id)),
            Operation::Erase(id) => format!("erase {}", pool.solvable_str(id)),
            Operation::Upgrade { from, to } => {
                format!("upgrade {} to {}", pool.solvable_str(from), pool.solvable_str(to))
            }
            Operation::Downgrade { from, to } => {
                format!("downgrade {} to {}", pool.solvable_str(from), pool.solvable_str(to))
            }
        }
    }
}

/// Ordered result of a successful solve.
///
/// Holds solvable ids only, so it stays usable as a record after the
/// repositories it refers to are removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    operations: Vec<Operation>,
    /// Solvables whose install order could not be derived because of a
    /// requires cycle
    unordered: Vec<SolvableId>,
    /// Installed set after the transaction, in id order
    new_state: Vec<SolvableId>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the operations turning the installed repository into `solution`
    pub fn from_solution(matcher: &Matcher<'_>, solution: &[SolvableId]) -> Self {
        let pool = matcher.pool();

        let mut new_state = solution.to_vec();
        new_state.sort_unstable();
        new_state.dedup();
        let wanted: HashSet<SolvableId> = new_state.iter().copied().collect();

        let present: Vec<SolvableId> = pool
            .installed_repo()
            .and_then(|repo| pool.repository(repo).ok())
            .map(|repo| repo.solvables().iter().copied().filter(|&id| pool.is_live(id)).collect())
            .unwrap_or_default();

        let installs: Vec<SolvableId> = new_state
            .iter()
            .copied()
            .filter(|&id| !pool.is_installed(id))
            .collect();
        let mut erases: BTreeSet<SolvableId> = present
            .iter()
            .copied()
            .filter(|id| !wanted.contains(id))
            .collect();

        let mut nodes = Vec::with_capacity(installs.len());
        for &target in &installs {
            nodes.push(pair_with_erases(matcher, target, &mut erases));
        }

        let (order, unordered) = topological_order(matcher, &nodes);

        let mut operations: Vec<Operation> = erases.into_iter().map(Operation::Erase).collect();
        for index in order {
            let node = &nodes[index];
            operations.extend(node.extra_erases.iter().map(|&id| Operation::Erase(id)));
            operations.push(node.operation);
        }

        if !unordered.is_empty() {
            log::debug!("Transaction has a requires cycle over {} solvable(s)", unordered.len());
        }

        Self {
            operations,
            unordered,
            new_state,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn unordered(&self) -> &[SolvableId] {
        &self.unordered
    }

    pub fn has_cycles(&self) -> bool {
        !self.unordered.is_empty()
    }

    pub fn new_state(&self) -> &[SolvableId] {
        &self.new_state
    }

    /// Solvables that get installed, in operation order
    pub fn installs(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.operations.iter().filter_map(Operation::installs)
    }

    /// Solvables that get removed, in operation order
    pub fn erases(&self) -> impl Iterator<Item = SolvableId> + '_ {
        self.operations.iter().filter_map(Operation::erases)
    }

    /// Operations with upgrades and downgrades split into an erase of the
    /// old solvable followed by an install of the new one
    pub fn steps(&self) -> Vec<Operation> {
        let mut steps = Vec::with_capacity(self.operations.len());
        for op in &self.operations {
            match *op {
                Operation::Upgrade { from, to } | Operation::Downgrade { from, to } => {
                    steps.push(Operation::Erase(from));
                    steps.push(Operation::Install(to));
                }
                other => steps.push(other),
            }
        }
        steps
    }

    pub fn summary(&self) -> TransactionSummary {
        let mut summary = TransactionSummary::default();

        for op in &self.operations {
            match op {
                Operation::Install(_) => summary.installs += 1,
                Operation::Erase(_) => summary.erases += 1,
                Operation::Upgrade { .. } => summary.upgrades += 1,
                Operation::Downgrade { .. } => summary.downgrades += 1,
            }
        }

        summary
    }

    /// One line per operation
    pub fn describe(&self, pool: &Pool) -> Vec<String> {
        self.operations.iter().map(|op| op.describe(pool)).collect()
    }
}

impl<'a> IntoIterator for &'a Transaction {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

/// Summary of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub installs: usize,
    pub erases: usize,
    pub upgrades: usize,
    pub downgrades: usize,
}

impl fmt::Display for TransactionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if self.installs > 0 {
            parts.push(format!("{} install(s)", self.installs));
        }
        if self.upgrades > 0 {
            parts.push(format!("{} upgrade(s)", self.upgrades));
        }
        if self.downgrades > 0 {
            parts.push(format!("{} downgrade(s)", self.downgrades));
        }
        if self.erases > 0 {
            parts.push(format!("{} removal(s)", self.erases));
        }

        if parts.is_empty() {
            write!(f, "Nothing to do")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// An install-side operation plus the erases it takes with it
#[derive(Debug)]
struct Node {
    target: SolvableId,
    operation: Operation,
    extra_erases: Vec<SolvableId>,
}

/// Pair `target` with the pending erase it replaces: a same-name solvable
/// first, otherwise one it obsoletes. Every other pending erase it obsoletes
/// is attached to it.
fn pair_with_erases(matcher: &Matcher<'_>, target: SolvableId, erases: &mut BTreeSet<SolvableId>) -> Node {
    let pool = matcher.pool();
    let Ok(solvable) = pool.solvable(target) else {
        return Node {
            target,
            operation: Operation::Install(target),
            extra_erases: Vec::new(),
        };
    };

    let same_name = erases
        .iter()
        .copied()
        .find(|&id| pool.solvable(id).map(|s| s.name == solvable.name).unwrap_or(false));

    let mut obsoleted: Vec<SolvableId> = solvable
        .obsoletes()
        .iter()
        .flat_map(|&dep| matcher.obsoleted_by(dep).to_vec())
        .filter(|id| *id != target && erases.contains(id))
        .collect();
    obsoleted.sort_unstable();
    obsoleted.dedup();

    let Some(from) = same_name.or_else(|| obsoleted.first().copied()) else {
        return Node {
            target,
            operation: Operation::Install(target),
            extra_erases: Vec::new(),
        };
    };

    erases.remove(&from);
    let extra_erases: Vec<SolvableId> = obsoleted.into_iter().filter(|&id| id != from).collect();
    for id in &extra_erases {
        erases.remove(id);
    }

    let downgrade = pool
        .solvable(from)
        .map(|old| solvable.evr.compare(&old.evr).is_lt())
        .unwrap_or(false);
    let operation = if downgrade {
        Operation::Downgrade { from, to: target }
    } else {
        Operation::Upgrade { from, to: target }
    };

    Node {
        target,
        operation,
        extra_erases,
    }
}

/// Order nodes so that providers of a requirement come before the solvables
/// requiring them (Kahn, lowest id first among ready nodes).
///
/// Nodes caught in a cycle are appended in id order and also returned as
/// the unordered set.
fn topological_order(matcher: &Matcher<'_>, nodes: &[Node]) -> (Vec<usize>, Vec<SolvableId>) {
    let pool = matcher.pool();
    let index_of: HashMap<SolvableId, usize> =
        nodes.iter().enumerate().map(|(i, n)| (n.target, i)).collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

    for (idx, node) in nodes.iter().enumerate() {
        let Ok(solvable) = pool.solvable(node.target) else {
            continue;
        };
        let mut needs: BTreeSet<usize> = BTreeSet::new();
        for &dep in solvable.requires() {
            for provider in matcher.providers_of(dep).iter() {
                if let Some(&dep_idx) = index_of.get(provider) {
                    if dep_idx != idx {
                        needs.insert(dep_idx);
                    }
                }
            }
        }
        for dep_idx in needs {
            dependents[dep_idx].push(idx);
            in_degree[idx] += 1;
        }
    }

    // Ready nodes keyed by solvable id
    let mut ready: BTreeSet<(SolvableId, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(idx, _)| (nodes[idx].target, idx))
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some((_, idx)) = ready.pop_first() {
        order.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert((nodes[dependent].target, dependent));
            }
        }
    }

    let mut unordered = Vec::new();
    if order.len() != nodes.len() {
        let placed: HashSet<usize> = order.iter().copied().collect();
        let mut rest: Vec<usize> = (0..nodes.len()).filter(|i| !placed.contains(i)).collect();
        rest.sort_by_key(|&i| nodes[i].target);
        for idx in rest {
            unordered.push(nodes[idx].target);
            order.push(idx);
        }
    }

    (order, unordered)
}
