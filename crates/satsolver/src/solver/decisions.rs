use super::rule::Literal;
use crate::pool::SolvableId;

/// Assignment trail of the SAT core.
///
/// `decision_map[id]` is `0` when undecided, `+(level + 1)` when decided
/// installed and `-(level + 1)` when decided not installed, so the level of
/// level-0 decisions is still recoverable from the sign-stripped value.
#[derive(Debug, Clone)]
pub struct Decisions {
    decision_map: Vec<i32>,
    reasons: Vec<Option<u32>>,
    /// Decisions in the order they were made, with the forcing rule
    decision_queue: Vec<(Literal, Option<u32>)>,
    level: u32,
}

impl Decisions {
    /// Tracker for solvable ids `1..=num_solvables`
    pub fn new(num_solvables: usize) -> Self {
        Self {
            decision_map: vec![0; num_solvables + 1],
            reasons: vec![None; num_solvables + 1],
            decision_queue: Vec::new(),
            level: 0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    /// Assign `literal` at the current level.
    ///
    /// Returns false if the opposite literal is already decided.
    pub fn decide(&mut self, literal: Literal, rule_id: Option<u32>) -> bool {
        let var = literal.unsigned_abs() as usize;
        let current = self.decision_map[var];

        if current != 0 {
            return (current > 0) == (literal > 0);
        }

        let value = self.level as i32 + 1;
        self.decision_map[var] = if literal > 0 { value } else { -value };
        self.reasons[var] = rule_id;
        self.decision_queue.push((literal, rule_id));
        true
    }

    fn raw(&self, literal: Literal) -> i32 {
        self.decision_map
            .get(literal.unsigned_abs() as usize)
            .copied()
            .unwrap_or(0)
    }

    /// The literal is true under the current assignment
    pub fn satisfied(&self, literal: Literal) -> bool {
        let value = self.raw(literal);
        value != 0 && (value > 0) == (literal > 0)
    }

    /// The literal is false under the current assignment
    pub fn conflict(&self, literal: Literal) -> bool {
        let value = self.raw(literal);
        value != 0 && (value > 0) != (literal > 0)
    }

    pub fn decided(&self, id: SolvableId) -> bool {
        self.raw(id) != 0
    }

    pub fn undecided(&self, id: SolvableId) -> bool {
        !self.decided(id)
    }

    pub fn decided_install(&self, id: SolvableId) -> bool {
        self.raw(id) > 0
    }

    pub fn decided_remove(&self, id: SolvableId) -> bool {
        self.raw(id) < 0
    }

    /// Level at which the literal's variable was assigned
    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        match self.raw(literal) {
            0 => None,
            v => Some(v.unsigned_abs() - 1),
        }
    }

    /// Rule that forced the variable, `None` for branching choices
    pub fn decision_rule(&self, literal: Literal) -> Option<u32> {
        self.reasons
            .get(literal.unsigned_abs() as usize)
            .copied()
            .flatten()
    }

    pub fn queue(&self) -> &[(Literal, Option<u32>)] {
        &self.decision_queue
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }

    /// Undo every decision made above `level`
    pub fn revert_to_level(&mut self, level: u32) {
        while let Some(&(literal, _)) = self.decision_queue.last() {
            match self.decision_level(literal) {
                Some(l) if l > level => {
                    let var = literal.unsigned_abs() as usize;
                    self.decision_map[var] = 0;
                    self.reasons[var] = None;
                    self.decision_queue.pop();
                }
                _ => break,
            }
        }
        self.level = level;
    }

    /// Solvables decided installed, in id order
    pub fn installed(&self) -> Vec<SolvableId> {
        self.decision_map
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0)
            .map(|(id, _)| id as SolvableId)
            .collect()
    }
}
