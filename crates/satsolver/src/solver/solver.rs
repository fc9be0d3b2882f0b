use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::decisions::Decisions;
use super::matcher::Matcher;
use super::policy::{Policy, PolicyMode};
use super::problem::{minimize_core, Problem, ProblemSet};
use super::request::Request;
use super::rule::{Literal, Rule, RuleType};
use super::rule_generator::RuleGenerator;
use super::rule_set::RuleSet;
use super::transaction::Transaction;
use super::watch_graph::{Propagator, WatchGraph};
use crate::config::SolverConfig;
use crate::error::Result;
use crate::pool::{Pool, SolvableId};

/// Result of a solve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Satisfied(Transaction),
    Unsatisfiable(ProblemSet),
    /// The step budget, deadline or cancel flag stopped the search
    Cancelled,
}

impl SolveOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, SolveOutcome::Satisfied(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SolveOutcome::Cancelled)
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            SolveOutcome::Satisfied(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn problems(&self) -> Option<&ProblemSet> {
        match self {
            SolveOutcome::Unsatisfiable(problems) => Some(problems),
            _ => None,
        }
    }
}

/// Solve `request` against `pool` with the default configuration
pub fn solve(pool: &Pool, request: &Request) -> Result<SolveOutcome> {
    Solver::new(pool).solve(request)
}

/// The SAT solver for dependency resolution.
///
/// Implements CDCL (conflict-driven clause learning) over "solvable is
/// installed" variables: unit propagation with two watched literals,
/// first-UIP learning with non-chronological backjumping, and policy-driven
/// branching.
pub struct Solver<'a> {
    pool: &'a Pool,
    config: SolverConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Solver<'a> {
    pub fn new(pool: &'a Pool) -> Self {
        Self {
            pool,
            config: SolverConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Abort the search once `flag` is set; checked at every branch
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn pool(&self) -> &'a Pool {
        self.pool
    }

    /// Resolve `request`.
    ///
    /// `Err` is only returned for requests naming unknown solvables or
    /// dependencies; unsatisfiable and cancelled solves are outcomes.
    pub fn solve(&self, request: &Request) -> Result<SolveOutcome> {
        let start = Instant::now();
        log::info!(
            "Solving {} job(s) over {} solvable(s)",
            request.jobs().len(),
            self.pool.solvable_count()
        );

        let matcher = Matcher::new(self.pool);
        let generated = RuleGenerator::new(&matcher, &self.config).generate(request)?;
        log::info!("Generated {} rules in {:?}", generated.rules.len(), start.elapsed());

        let mut rules = generated.rules;
        let policy = Policy::with_hints(self.pool, &rules);
        let mut budget = Budget::new(&self.config, self.cancel.as_deref(), start);
        let mut problems = ProblemSet::new();
        let max_problems = self.config.max_problems.max(1);

        loop {
            let mut state = SolverState::new(rules.clone(), self.pool.solvable_count(), &generated.considered);

            match self.run_sat(&mut state, &policy, &mut budget) {
                SatResult::Cancelled => {
                    log::info!("Solve cancelled after {} step(s) in {:?}", budget.steps, start.elapsed());
                    return Ok(SolveOutcome::Cancelled);
                }
                SatResult::Satisfied => {
                    if !problems.is_empty() {
                        log::info!("Found {} problem(s) in {:?}", problems.len(), start.elapsed());
                        return Ok(SolveOutcome::Unsatisfiable(problems));
                    }
                    let solution = state.decisions.installed();
                    let transaction = Transaction::from_solution(&matcher, &solution);
                    log::info!(
                        "Dependency resolution completed in {:.3} seconds: {}",
                        start.elapsed().as_secs_f64(),
                        transaction.summary()
                    );
                    log::info!(
                        "Analyzed {} rules, {} decisions, {} learned",
                        state.rules.len(),
                        state.decisions.len(),
                        state.rules.count_by_type(RuleType::Learned)
                    );
                    return Ok(SolveOutcome::Satisfied(transaction));
                }
                SatResult::Unsatisfiable(core) => {
                    let core = if self.config.minimize_cores {
                        minimize_core(&core, &rules)
                    } else {
                        core
                    };
                    if self.config.debug_level > 0 {
                        log::debug!("Unsolvable core: {:?}", core);
                    }
                    problems.push(Problem::from_core(&core, &rules, self.pool, request));

                    if problems.len() >= max_problems {
                        log::debug!("Reached the limit of {} problem(s)", max_problems);
                        return Ok(SolveOutcome::Unsatisfiable(problems));
                    }
                    if !relax_core(&mut rules, &core) {
                        return Ok(SolveOutcome::Unsatisfiable(problems));
                    }
                }
            }
        }
    }

    /// Main SAT loop:
    /// 1. Assert single-literal rules at level 0
    /// 2. Propagate the consequences of every new decision
    /// 3. On conflict, learn a clause and backjump
    /// 4. Otherwise branch on the next open rule, or finish
    fn run_sat(&self, state: &mut SolverState, policy: &Policy<'_>, budget: &mut Budget<'_>) -> SatResult {
        if let Err(conflict) = self.process_assertions(state) {
            log::debug!("Conflicting assertion: rule {}", conflict);
            return SatResult::Unsatisfiable(self.analyze_unsolvable(state, conflict));
        }

        loop {
            if let Err(conflict) = self.propagate(state) {
                if state.decisions.level() == 0 {
                    log::debug!("Conflict at level 0: rule {} is unsolvable", conflict);
                    return SatResult::Unsatisfiable(self.analyze_unsolvable(state, conflict));
                }
                self.analyze_and_backjump(state, conflict);
                continue;
            }

            let Some(literal) = self.select_next(state, policy) else {
                return SatResult::Satisfied;
            };

            if budget.exhausted() {
                return SatResult::Cancelled;
            }

            state.decisions.increment_level();
            if self.config.trace_policy() {
                log::trace!("Level {}: branching on {}", state.decisions.level(), literal);
            }
            state.decisions.decide(literal, None);
        }
    }

    /// Decide every enabled single-literal hard rule at level 0
    fn process_assertions(&self, state: &mut SolverState) -> std::result::Result<(), u32> {
        let assertions: Vec<(u32, Option<Literal>)> = state
            .rules
            .hard_rules()
            .filter(|r| r.len() <= 1)
            .map(|r| (r.id(), r.literals().first().copied()))
            .collect();

        for (rule_id, literal) in assertions {
            let Some(literal) = literal else {
                // Empty rule, e.g. an install job nothing matches
                return Err(rule_id);
            };
            if !state.decisions.decide(literal, Some(rule_id)) {
                return Err(rule_id);
            }
        }

        Ok(())
    }

    /// Propagate every decision not yet propagated
    fn propagate(&self, state: &mut SolverState) -> std::result::Result<(), u32> {
        while state.propagate_index < state.decisions.len() {
            let (literal, _) = state.decisions.queue()[state.propagate_index];
            state.propagate_index += 1;

            if self.config.trace_propagation() {
                log::trace!("Propagating {} at level {}", literal, state.decisions.level());
            }

            Propagator::new(&mut state.watch_graph, &state.rules, &mut state.decisions).propagate(literal)?;
        }
        Ok(())
    }

    /// Next literal to branch on, in this order: job rules, keep rules,
    /// requirements of installed solvables, recommends, free variables
    fn select_next(&self, state: &SolverState, policy: &Policy<'_>) -> Option<Literal> {
        let decisions = &state.decisions;

        for rule_type in [RuleType::JobInstall, RuleType::JobUpdate] {
            let mode = if rule_type == RuleType::JobUpdate {
                PolicyMode::Update
            } else {
                PolicyMode::Install
            };
            for rule in state.rules.rules_of_type(rule_type) {
                if let Some(literal) = open_branch(rule, decisions, policy, mode) {
                    return Some(literal);
                }
            }
        }

        for rule in state.rules.rules_of_type(RuleType::InstalledKeep) {
            if let Some(literal) = open_branch(rule, decisions, policy, PolicyMode::Install) {
                return Some(literal);
            }
        }

        for rule in state.rules.rules_of_type(RuleType::PackageRequires) {
            let active = rule.source().is_some_and(|s| decisions.decided_install(s));
            if !active {
                continue;
            }
            if let Some(literal) = open_branch(rule, decisions, policy, PolicyMode::Install) {
                return Some(literal);
            }
        }

        if self.config.install_recommends {
            for rule in state.rules.rules_of_type(RuleType::Recommends) {
                let active = rule.source().is_some_and(|s| decisions.decided_install(s));
                if !active {
                    continue;
                }
                if let Some(literal) = open_branch(rule, decisions, policy, PolicyMode::Install) {
                    return Some(literal);
                }
            }
        }

        state
            .considered
            .iter()
            .copied()
            .find(|&id| decisions.undecided(id))
            .map(|id| policy.free_literal(id, decisions))
    }

    /// First-UIP conflict analysis, walking the trail backwards from the
    /// conflict. Returns the learned literals (asserting literal first, the
    /// rest by decreasing level), the level to backjump to and the rules
    /// the clause was resolved from.
    fn analyze(&self, state: &SolverState, conflict: u32) -> (Vec<Literal>, u32, Vec<u32>) {
        let decisions = &state.decisions;
        let level = decisions.level();
        let trail = decisions.queue();

        let mut seen: HashSet<u32> = HashSet::new();
        let mut lower: Vec<(u32, Literal)> = Vec::new();
        let mut why = Vec::new();
        let mut at_level = 0usize;
        let mut index = trail.len();
        let mut rule_id = conflict;

        let uip = loop {
            why.push(rule_id);
            let Some(rule) = state.rules.get(rule_id) else {
                panic!("conflict analysis reached unknown rule {}", rule_id);
            };

            for &literal in rule.literals() {
                if !decisions.conflict(literal) || !seen.insert(literal.unsigned_abs()) {
                    continue;
                }
                match decisions.decision_level(literal) {
                    Some(0) => {}
                    Some(l) if l == level => at_level += 1,
                    Some(l) => lower.push((l, literal)),
                    None => unreachable!("false literal {} without a level", literal),
                }
            }

            let next = loop {
                assert!(index > 0, "conflict analysis ran off the decision trail");
                index -= 1;
                let (literal, _) = trail[index];
                if seen.contains(&literal.unsigned_abs()) {
                    break literal;
                }
            };

            assert!(at_level > 0, "conflict without a literal at level {}", level);
            at_level -= 1;
            if at_level == 0 {
                break next;
            }

            rule_id = decisions
                .decision_rule(next)
                .unwrap_or_else(|| panic!("implied literal {} has no reason", next));
        };

        // Highest level first so the second literal is the one to watch
        lower.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let backjump = lower.first().map(|(l, _)| *l).unwrap_or(0);

        let mut learned = Vec::with_capacity(lower.len() + 1);
        learned.push(-uip);
        learned.extend(lower.into_iter().map(|(_, literal)| literal));

        (learned, backjump, why)
    }

    fn analyze_and_backjump(&self, state: &mut SolverState, conflict: u32) {
        let (learned, level, why) = self.analyze(state, conflict);
        let asserting = learned[0];

        if self.config.debug_level > 0 {
            log::debug!(
                "Conflict in rule {} at level {}: learned {:?}, backjumping to {}",
                conflict,
                state.decisions.level(),
                learned,
                level
            );
        }

        state.decisions.revert_to_level(level);
        state.propagate_index = state.decisions.len();

        let rule_id = state.rules.add_learned(Rule::learned(learned), why);
        if let Some(rule) = state.rules.get(rule_id) {
            state.watch_graph.add_rule(rule);
        }

        let decided = state.decisions.decide(asserting, Some(rule_id));
        assert!(decided, "asserting literal {} is false after backjump", asserting);
    }

    /// Rules responsible for a level-0 conflict: the conflicting rule plus
    /// the reasons of every false literal, with learned rules replaced by
    /// the rules they were derived from
    fn analyze_unsolvable(&self, state: &SolverState, conflict: u32) -> Vec<u32> {
        let mut core: BTreeSet<u32> = BTreeSet::new();
        let mut visited: HashSet<u32> = HashSet::new();
        let mut stack = vec![conflict];

        while let Some(rule_id) = stack.pop() {
            if !visited.insert(rule_id) {
                continue;
            }
            let Some(rule) = state.rules.get(rule_id) else {
                continue;
            };

            if rule.rule_type() == RuleType::Learned {
                stack.extend_from_slice(state.rules.learned_why(rule_id));
            } else {
                core.insert(rule_id);
            }

            for &literal in rule.literals() {
                if state.decisions.conflict(literal) {
                    if let Some(reason) = state.decisions.decision_rule(literal) {
                        stack.push(reason);
                    }
                }
            }
        }

        log::debug!("Unsolvable core of {} rule(s)", core.len());
        core.into_iter().collect()
    }
}

/// Branch literal for a rule that is not yet satisfied
fn open_branch(rule: &Rule, decisions: &Decisions, policy: &Policy<'_>, mode: PolicyMode) -> Option<Literal> {
    if rule.is_disabled() || rule.literals().iter().any(|&l| decisions.satisfied(l)) {
        return None;
    }
    let candidates: Vec<Literal> = rule
        .literals()
        .iter()
        .copied()
        .filter(|&l| l > 0 && decisions.undecided(l))
        .collect();
    policy.choose_branch(&candidates, mode, decisions)
}

/// Disable the job (all of its rules) or keep rule with the highest id in
/// `core` so the next round can look for another problem
fn relax_core(rules: &mut RuleSet, core: &[u32]) -> bool {
    let Some(target) = core
        .iter()
        .copied()
        .filter(|&id| rules.get(id).is_some_and(|r| r.rule_type().is_job_origin()))
        .max()
    else {
        log::debug!("Core has no job or keep rule left to relax");
        return false;
    };

    match rules.get(target).and_then(Rule::job) {
        Some(job) => {
            let ids: Vec<u32> = rules
                .iter()
                .filter(|r| r.job() == Some(job))
                .map(Rule::id)
                .collect();
            for id in ids {
                rules.disable(id);
            }
            log::debug!("Disabled job #{} to look for further problems", job);
        }
        None => {
            rules.disable(target);
            log::debug!("Disabled rule {} to look for further problems", target);
        }
    }
    true
}

enum SatResult {
    Satisfied,
    Unsatisfiable(Vec<u32>),
    Cancelled,
}

/// Mutable state of one SAT run
struct SolverState {
    rules: RuleSet,
    decisions: Decisions,
    watch_graph: WatchGraph,
    /// Index of the next decision to propagate
    propagate_index: usize,
    considered: Vec<SolvableId>,
}

impl SolverState {
    fn new(rules: RuleSet, num_solvables: usize, considered: &[SolvableId]) -> Self {
        let watch_graph = WatchGraph::from_rules(&rules);

        Self {
            rules,
            decisions: Decisions::new(num_solvables),
            watch_graph,
            propagate_index: 0,
            considered: considered.to_vec(),
        }
    }
}

/// Cooperative cancellation, checked each time a decision level is pushed
struct Budget<'c> {
    steps: u64,
    max_steps: Option<u64>,
    deadline: Option<Instant>,
    cancel: Option<&'c AtomicBool>,
}

impl<'c> Budget<'c> {
    fn new(config: &SolverConfig, cancel: Option<&'c AtomicBool>, start: Instant) -> Self {
        Self {
            steps: 0,
            max_steps: config.max_steps,
            deadline: config.timeout().map(|t| start + t),
            cancel,
        }
    }

    fn exhausted(&mut self) -> bool {
        self.steps += 1;
        if self.max_steps.is_some_and(|max| self.steps > max) {
            log::debug!("Step budget of {:?} exhausted", self.max_steps);
            return true;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::debug!("Deadline reached");
            return true;
        }
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
