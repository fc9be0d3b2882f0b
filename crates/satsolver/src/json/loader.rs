use std::collections::HashSet;
use std::fs;
use std::path::Path;

use super::schema::{ExpectedResult, JobJson, JobKindJson, RepositoryJson, SolvableJson, Testcase};
use crate::config::SolverConfig;
use crate::pool::{Pool, RepoId, SolvableId, SolvableRecord};
use crate::solver::{Request, Selector, SolveOutcome, Solver};

/// Errors that can occur when loading a testcase
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// A testcase turned into solver inputs
#[derive(Debug)]
pub struct LoadedTestcase {
    pub pool: Pool,
    pub request: Request,
    pub config: SolverConfig,
    pub expected: Option<ExpectedResult>,
}

impl LoadedTestcase {
    pub fn solve(&self) -> crate::Result<SolveOutcome> {
        Solver::new(&self.pool).with_config(self.config.clone()).solve(&self.request)
    }
}

/// Load and parse a testcase file
pub fn load_testcase(path: &Path) -> Result<Testcase, LoadError> {
    let content = fs::read_to_string(path)?;
    parse_testcase(&content)
}

/// Parse a testcase from a string
pub fn parse_testcase(content: &str) -> Result<Testcase, LoadError> {
    let testcase: Testcase = serde_json::from_str(content)?;
    Ok(testcase)
}

/// Write a testcase to a file
pub fn write_testcase(path: &Path, testcase: &Testcase) -> Result<(), LoadError> {
    let content = serde_json::to_string_pretty(testcase)?;
    fs::write(path, content)?;
    Ok(())
}

/// Validate a testcase structure
pub fn validate_testcase(testcase: &Testcase) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    let installed = testcase.repositories.iter().filter(|r| r.installed).count();
    if installed > 1 {
        errors.push(format!("{} repositories are marked installed, at most one may be", installed));
    }

    let mut names = HashSet::new();
    for repo in &testcase.repositories {
        if repo.name.is_empty() {
            errors.push("Repository name cannot be empty".to_string());
        } else if !names.insert(repo.name.as_str()) {
            errors.push(format!("Duplicate repository '{}'", repo.name));
        }

        for solvable in &repo.solvables {
            if solvable.name.is_empty() {
                errors.push(format!("Solvable without a name in repository '{}'", repo.name));
            }
            if solvable.evr.is_empty() {
                errors.push(format!("Solvable '{}' has an empty evr", solvable.name));
            }
        }
    }

    for (index, job) in testcase.jobs.iter().enumerate() {
        if job.selector_count() != 1 {
            errors.push(format!(
                "Job #{} must set exactly one of provides, name or solvable",
                index
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate `testcase` and build its pool, request and configuration
pub fn build_testcase(testcase: &Testcase) -> Result<LoadedTestcase, LoadError> {
    validate_testcase(testcase).map_err(|errors| LoadError::Validation(errors.join("; ")))?;

    let mut pool = Pool::new();
    if let Some(ref arch) = testcase.arch {
        pool.set_architecture(arch);
    }
    populate_pool(&mut pool, &testcase.repositories)?;
    let request = build_request(&mut pool, &testcase.jobs)?;

    Ok(LoadedTestcase {
        pool,
        request,
        config: testcase.config.clone().unwrap_or_default(),
        expected: testcase.result.clone(),
    })
}

/// Add `repositories` and their solvables to `pool`
pub fn populate_pool(pool: &mut Pool, repositories: &[RepositoryJson]) -> Result<Vec<RepoId>, LoadError> {
    let mut ids = Vec::with_capacity(repositories.len());

    for repo in repositories {
        let id = pool.add_repository(&repo.name, repo.priority);
        if repo.installed {
            pool.set_installed(id).map_err(validation)?;
        }
        for solvable in &repo.solvables {
            pool.add_solvable(id, record(solvable)).map_err(validation)?;
        }
        log::debug!("Loaded repository {} with {} solvable(s)", repo.name, repo.solvables.len());
        ids.push(id);
    }

    Ok(ids)
}

/// Turn job records into a request against `pool`
pub fn build_request(pool: &mut Pool, jobs: &[JobJson]) -> Result<Request, LoadError> {
    let mut request = Request::new();

    for job in jobs {
        let selector = selector(pool, job)?;
        match job.kind {
            JobKindJson::Install => request.install(selector),
            JobKindJson::Erase => request.erase(selector),
            JobKindJson::Update => request.update(selector),
            JobKindJson::Lock => request.lock(selector),
            JobKindJson::AllowUninstall => request.allow_uninstall(selector),
        };
    }

    Ok(request)
}

/// Differences between the outcome and what the testcase expects
pub fn check_result(expected: &ExpectedResult, pool: &Pool, outcome: &SolveOutcome) -> Vec<String> {
    let mut mismatches = Vec::new();

    if expected.cancelled != outcome.is_cancelled() {
        mismatches.push(format!("expected cancelled = {}", expected.cancelled));
    }

    if let Some(ref lines) = expected.transaction {
        match outcome.transaction() {
            Some(tx) => {
                let actual = tx.describe(pool);
                if &actual != lines {
                    mismatches.push(format!("expected transaction {:?}, got {:?}", lines, actual));
                }
            }
            None => mismatches.push("expected a transaction".to_string()),
        }
    }

    if let Some(count) = expected.problems {
        let actual = outcome.problems().map(|p| p.len()).unwrap_or(0);
        if actual != count {
            mismatches.push(format!("expected {} problem(s), got {}", count, actual));
        }
    }

    mismatches
}

fn record(solvable: &SolvableJson) -> SolvableRecord {
    let mut record = SolvableRecord::new(&solvable.name, &solvable.evr, &solvable.arch);
    for dep in &solvable.provides {
        record = record.provides(dep);
    }
    for dep in &solvable.requires {
        record = record.requires(dep);
    }
    for dep in &solvable.conflicts {
        record = record.conflicts(dep);
    }
    for dep in &solvable.obsoletes {
        record = record.obsoletes(dep);
    }
    for dep in &solvable.recommends {
        record = record.recommends(dep);
    }
    for dep in &solvable.suggests {
        record = record.suggests(dep);
    }
    record
}

fn selector(pool: &mut Pool, job: &JobJson) -> Result<Selector, LoadError> {
    if let Some(ref expr) = job.provides {
        return Ok(Selector::Provides(pool.parse_dep(expr).map_err(validation)?));
    }
    if let Some(ref expr) = job.name {
        return Ok(Selector::Name(pool.parse_dep(expr).map_err(validation)?));
    }
    if let Some(ref nevra) = job.solvable {
        return find_solvable(pool, nevra)
            .map(Selector::Solvable)
            .ok_or_else(|| LoadError::Validation(format!("Unknown solvable '{}'", nevra)));
    }
    Err(LoadError::Validation("Job without a selector".to_string()))
}

fn find_solvable(pool: &Pool, nevra: &str) -> Option<SolvableId> {
    pool.live_solvables().find(|&id| pool.solvable_str(id) == nevra)
}

fn validation(err: crate::SolverError) -> LoadError {
    LoadError::Validation(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTCASE: &str = r#"{
        "arch": "x86_64",
        "repositories": [
            {
                "name": "@System",
                "installed": true,
                "solvables": [{"name": "x", "evr": "1.0", "arch": "x86_64"}]
            },
            {
                "name": "updates",
                "priority": 5,
                "solvables": [
                    {"name": "x", "evr": "2.0", "arch": "x86_64", "requires": ["libx >= 2"]},
                    {"name": "libx", "evr": "2.1", "arch": "x86_64"}
                ]
            }
        ],
        "jobs": [
            {"kind": "update", "name": "x"},
            {"kind": "lock", "solvable": "libx-2.1.x86_64"}
        ],
        "result": {"transaction": []}
    }"#;

    #[test]
    fn test_parse_testcase() {
        let testcase = parse_testcase(TESTCASE).unwrap();
        assert_eq!(testcase.arch.as_deref(), Some("x86_64"));
        assert_eq!(testcase.repositories.len(), 2);
        assert_eq!(testcase.repositories[1].priority, 5);
        assert_eq!(testcase.jobs[1].kind, JobKindJson::Lock);
        assert!(testcase.config.is_none());
    }

    #[test]
    fn test_build_testcase() {
        let loaded = build_testcase(&parse_testcase(TESTCASE).unwrap()).unwrap();
        assert_eq!(loaded.pool.solvable_count(), 3);
        assert!(loaded.pool.installed_repo().is_some());
        assert_eq!(loaded.request.jobs().len(), 2);
        assert!(matches!(loaded.request.jobs()[1].selector, Selector::Solvable(3)));

        // The lock keeps libx out, so x stays at 1.0
        let outcome = loaded.solve().unwrap();
        let expected = loaded.expected.as_ref().unwrap();
        assert!(check_result(expected, &loaded.pool, &outcome).is_empty());
    }

    #[test]
    fn test_validate_testcase() {
        let mut testcase = parse_testcase(TESTCASE).unwrap();
        assert!(validate_testcase(&testcase).is_ok());

        testcase.repositories[1].installed = true;
        testcase.jobs.push(JobJson {
            kind: JobKindJson::Install,
            provides: None,
            name: None,
            solvable: None,
        });
        let errors = validate_testcase(&testcase).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_unknown_solvable_selector() {
        let mut testcase = parse_testcase(TESTCASE).unwrap();
        testcase.jobs.push(JobJson::solvable(JobKindJson::Erase, "ghost-1.0.noarch"));
        let err = build_testcase(&testcase).unwrap_err();
        assert!(matches!(err, LoadError::Validation(ref msg) if msg.contains("ghost-1.0.noarch")));
    }

    #[test]
    fn test_malformed_dependency() {
        let mut testcase = parse_testcase(TESTCASE).unwrap();
        testcase.repositories[1].solvables[1].requires.push("broken >=".to_string());
        assert!(matches!(build_testcase(&testcase), Err(LoadError::Validation(_))));
    }

    #[test]
    fn test_check_result_mismatch() {
        let loaded = build_testcase(&parse_testcase(TESTCASE).unwrap()).unwrap();
        let outcome = loaded.solve().unwrap();
        let expected = ExpectedResult {
            transaction: Some(vec!["upgrade x-1.0.x86_64 to x-2.0.x86_64".to_string()]),
            problems: Some(1),
            cancelled: false,
        };
        assert_eq!(check_result(&expected, &loaded.pool, &outcome).len(), 2);
    }
}
