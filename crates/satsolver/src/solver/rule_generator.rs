use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;

use indexmap::IndexMap;

use super::matcher::Matcher;
use super::request::{JobKind, Request, Selector};
use super::rule::{Rule, RuleType};
use super::rule_set::RuleSet;
use crate::config::{ObsoletesMode, SolverConfig};
use crate::error::Result;
use crate::pool::{SolvableId, StringId};

/// Output of rule generation
#[derive(Debug, Clone)]
pub struct GeneratedRules {
    pub rules: RuleSet,
    /// Solvables whose dependencies were expanded, in id order
    pub considered: Vec<SolvableId>,
}

/// Generates SAT rules for a request.
///
/// - Jobs: install is a clause over the matches, erase and lock are units
/// - Installed solvables: stay installed or get replaced
/// - Package requirements: if A is installed, then B|C|D must be installed
/// - Conflicts: A and B cannot both be installed
/// - Same-name: only one version of a name can be installed
/// - Obsoletes, recommends and suggests: weak hints for the policy
///
/// Package rules are only generated for solvables reachable from the jobs and
/// the installed repository.
pub struct RuleGenerator<'a, 'p> {
    matcher: &'a Matcher<'p>,
    config: &'a SolverConfig,
    rules: RuleSet,
    /// Solvables whose package rules have been added
    added: HashSet<SolvableId>,
    queue: VecDeque<SolvableId>,
    /// installed solvable -> available solvables obsoleting it
    installed_obsoleters: HashMap<SolvableId, Vec<SolvableId>>,
}

impl<'a, 'p> RuleGenerator<'a, 'p> {
    pub fn new(matcher: &'a Matcher<'p>, config: &'a SolverConfig) -> Self {
        Self {
            matcher,
            config,
            rules: RuleSet::new(),
            added: HashSet::new(),
            queue: VecDeque::new(),
            installed_obsoleters: HashMap::new(),
        }
    }

    /// Generate all rules for a request
    pub fn generate(mut self, request: &Request) -> Result<GeneratedRules> {
        let start = Instant::now();

        self.collect_installed_obsoleters();

        self.add_job_rules(request)?;
        log::debug!("After job rules: {} rules", self.rules.len());

        self.add_keep_rules(request)?;
        log::debug!("After keep rules: {} rules", self.rules.len());

        self.add_package_rules();
        log::debug!(
            "After package rules: {} rules, {} solvables",
            self.rules.len(),
            self.added.len()
        );

        let mut considered: Vec<SolvableId> = self.added.iter().copied().collect();
        considered.sort_unstable();

        self.add_same_name_rules(&considered);
        log::debug!("After same-name rules: {} rules", self.rules.len());

        if self.config.debug_level > 0 {
            log::info!(
                "Rule generation: {} rules for {} solvables in {:?}",
                self.rules.len(),
                considered.len(),
                start.elapsed()
            );
        }
        log::debug!("Rules by type: {:?}", self.rules.stats());

        Ok(GeneratedRules {
            rules: self.rules,
            considered,
        })
    }

    fn add_rule(&mut self, rule: Rule) -> u32 {
        if self.config.trace_rule_creation() {
            log::trace!("New rule {}", rule);
        }
        self.rules.add(rule)
    }

    fn enqueue(&mut self, id: SolvableId) {
        if !self.added.contains(&id) {
            self.queue.push_back(id);
        }
    }

    /// Map every installed solvable to the available solvables obsoleting it
    fn collect_installed_obsoleters(&mut self) {
        let pool = self.matcher.pool();
        if pool.installed_repo().is_none() {
            return;
        }
        for id in pool.live_solvables() {
            if pool.is_installed(id) || !pool.is_installable(id) {
                continue;
            }
            let Ok(solvable) = pool.solvable(id) else {
                continue;
            };
            for &dep in solvable.obsoletes() {
                for &obsoleted in self.matcher.obsoleted_by(dep).iter() {
                    if obsoleted != id && pool.is_installed(obsoleted) {
                        let list = self.installed_obsoleters.entry(obsoleted).or_default();
                        if !list.contains(&id) {
                            list.push(id);
                        }
                    }
                }
            }
        }
    }

    /// Newer same-name solvables and obsoleters that may replace `installed`
    pub(crate) fn update_candidates(&self, installed: SolvableId) -> Vec<SolvableId> {
        let pool = self.matcher.pool();
        let Ok(current) = pool.solvable(installed) else {
            return Vec::new();
        };

        let mut candidates: Vec<SolvableId> = pool
            .solvables_named(current.name)
            .iter()
            .copied()
            .filter(|&id| id != installed && !pool.is_installed(id) && pool.is_installable(id))
            .filter(|&id| {
                pool.solvable(id)
                    .map(|s| s.evr.compare(&current.evr).is_gt())
                    .unwrap_or(false)
            })
            .collect();

        if let Some(obsoleters) = self.installed_obsoleters.get(&installed) {
            candidates.extend(obsoleters.iter().copied());
        }

        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    fn add_job_rules(&mut self, request: &Request) -> Result<()> {
        let pool = self.matcher.pool();

        for (index, job) in request.jobs().iter().enumerate() {
            let matches = self.matcher.select(&job.selector)?;
            if self.config.debug_level > 1 {
                log::debug!(
                    "Job #{} {} {:?}: {} match(es)",
                    index,
                    job.kind.as_str(),
                    job.selector,
                    matches.len()
                );
            }

            match job.kind {
                JobKind::Install => {
                    let rule = tag(Rule::for_job(RuleType::JobInstall, matches.clone(), index), &job.selector);
                    self.add_rule(rule);
                    for id in matches {
                        self.enqueue(id);
                    }
                }
                JobKind::Erase => {
                    for id in matches {
                        let rule = Rule::for_job(RuleType::JobErase, vec![-id], index).with_source(id);
                        self.add_rule(tag(rule, &job.selector));
                    }
                }
                JobKind::Update => {
                    let installed: Vec<SolvableId> =
                        matches.into_iter().filter(|&id| pool.is_installed(id)).collect();
                    if installed.is_empty() {
                        log::debug!("Job #{} updates nothing installed, skipping", index);
                        continue;
                    }
                    for id in installed {
                        let candidates = self.update_candidates(id);
                        let mut literals = candidates.clone();
                        literals.push(id);
                        let rule = Rule::for_job(RuleType::JobUpdate, literals, index).with_source(id);
                        self.add_rule(tag(rule, &job.selector));
                        for candidate in candidates {
                            self.enqueue(candidate);
                        }
                    }
                }
                JobKind::Lock => {
                    for id in matches {
                        let keep = self.config.lock_installed && pool.is_installed(id);
                        let literal = if keep { id } else { -id };
                        let rule = Rule::for_job(RuleType::JobLock, vec![literal], index).with_source(id);
                        self.add_rule(tag(rule, &job.selector));
                    }
                }
            }
        }

        Ok(())
    }

    fn add_keep_rules(&mut self, request: &Request) -> Result<()> {
        let pool = self.matcher.pool();
        let Some(repo) = pool.installed_repo() else {
            return Ok(());
        };
        let installed: Vec<SolvableId> = pool.repository(repo)?.solvables().to_vec();

        // Locks force their matches out unless `lock_installed` is set
        let lock_erases = !self.config.lock_installed;
        let erased: Vec<&Selector> = request
            .jobs()
            .iter()
            .filter(|j| j.kind == JobKind::Erase || (lock_erases && j.kind == JobKind::Lock))
            .map(|j| &j.selector)
            .collect();

        for id in installed {
            self.enqueue(id);

            if self.config.allow_uninstall {
                continue;
            }
            let exempt = erased
                .iter()
                .copied()
                .chain(request.uninstall_allowed())
                .any(|selector| self.matcher.selector_matches(selector, id));
            if exempt {
                continue;
            }

            let candidates = self.update_candidates(id);
            self.add_rule(Rule::keep(id, &candidates));
            for candidate in candidates {
                self.enqueue(candidate);
            }
        }

        Ok(())
    }

    /// Breadth-first expansion of every queued solvable's relations
    fn add_package_rules(&mut self) {
        let pool = self.matcher.pool();

        while let Some(id) = self.queue.pop_front() {
            if !self.added.insert(id) {
                continue;
            }
            let Ok(solvable) = pool.solvable(id) else {
                continue;
            };

            for &dep in solvable.requires() {
                let providers = self.matcher.providers_of(dep);
                // Satisfied by itself
                if providers.contains(&id) {
                    continue;
                }
                self.add_rule(Rule::requires(id, &providers).with_dep(dep));
                for &provider in providers.iter() {
                    self.enqueue(provider);
                }
            }

            for &dep in solvable.conflicts() {
                for &other in self.matcher.providers_of(dep).iter() {
                    if other != id {
                        self.add_rule(Rule::conflict(id, other).with_dep(dep));
                    }
                }
            }

            for &dep in solvable.obsoletes() {
                for &other in self.matcher.obsoleted_by(dep).iter() {
                    if other == id {
                        continue;
                    }
                    self.add_rule(Rule::obsoletes(id, other, true).with_dep(dep));
                    if self.config.obsoletes_mode == ObsoletesMode::Hard {
                        self.add_rule(Rule::obsoletes(id, other, false).with_dep(dep));
                    }
                }
            }

            for &dep in solvable.recommends() {
                let providers = self.matcher.providers_of(dep);
                if providers.is_empty() || providers.contains(&id) {
                    continue;
                }
                self.add_rule(Rule::hint(RuleType::Recommends, id, &providers).with_dep(dep));
                if self.config.install_recommends {
                    for &provider in providers.iter() {
                        self.enqueue(provider);
                    }
                }
            }

            for &dep in solvable.suggests() {
                let providers = self.matcher.providers_of(dep);
                if providers.is_empty() || providers.contains(&id) {
                    continue;
                }
                self.add_rule(Rule::hint(RuleType::Suggests, id, &providers).with_dep(dep));
            }
        }
    }

    /// At most one solvable of each name, except multiversion names
    fn add_same_name_rules(&mut self, considered: &[SolvableId]) {
        let pool = self.matcher.pool();

        let mut by_name: IndexMap<StringId, Vec<SolvableId>> = IndexMap::new();
        for &id in considered {
            if let Ok(solvable) = pool.solvable(id) {
                by_name.entry(solvable.name).or_default().push(id);
            }
        }

        for (name, ids) in by_name {
            if ids.len() < 2 || self.config.is_multiversion(pool.lookup(name)) {
                continue;
            }
            if ids.len() == 2 {
                self.add_rule(Rule::same_name(ids[0], ids[1]));
            } else {
                self.add_rule(Rule::multi_conflict(&ids));
            }
        }
    }
}

fn tag(rule: Rule, selector: &Selector) -> Rule {
    match *selector {
        Selector::Provides(dep) | Selector::Name(dep) => rule.with_dep(dep),
        Selector::Solvable(id) => rule.with_source(id),
    }
}
