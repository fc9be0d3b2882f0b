use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;

/// Root of a testcase file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Testcase {
    /// System architecture; every arch but src/nosrc is allowed when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<RepositoryJson>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<JobJson>,

    /// Solver configuration; defaults apply when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SolverConfig>,

    /// Expected outcome, checked by [`super::check_result`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExpectedResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryJson {
    pub name: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub priority: i32,

    /// Marks the repository holding the installed system
    #[serde(default, skip_serializing_if = "is_false")]
    pub installed: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub solvables: Vec<SolvableJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SolvableJson {
    pub name: String,
    pub evr: String,

    #[serde(default = "default_arch")]
    pub arch: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obsoletes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggests: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKindJson {
    Install,
    Erase,
    Update,
    Lock,
    /// Exempt matching installed solvables from their keep rule
    AllowUninstall,
}

/// A job with exactly one selector field set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobJson {
    pub kind: JobKindJson,

    /// Dependency expression matched against provides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provides: Option<String>,

    /// Dependency expression matched against solvable names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// A solvable written as `name-evr.arch`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solvable: Option<String>,
}

impl JobJson {
    pub fn provides(kind: JobKindJson, expr: &str) -> Self {
        Self {
            kind,
            provides: Some(expr.to_string()),
            name: None,
            solvable: None,
        }
    }

    pub fn name(kind: JobKindJson, expr: &str) -> Self {
        Self {
            kind,
            provides: None,
            name: Some(expr.to_string()),
            solvable: None,
        }
    }

    pub fn solvable(kind: JobKindJson, nevra: &str) -> Self {
        Self {
            kind,
            provides: None,
            name: None,
            solvable: Some(nevra.to_string()),
        }
    }

    pub(crate) fn selector_count(&self) -> usize {
        [self.provides.is_some(), self.name.is_some(), self.solvable.is_some()]
            .iter()
            .filter(|set| **set)
            .count()
    }
}

/// Expected outcome of a testcase
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ExpectedResult {
    /// Operations as rendered by `Transaction::describe`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Vec<String>>,

    /// Number of problems of an unsatisfiable request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problems: Option<usize>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub cancelled: bool,
}

fn default_arch() -> String {
    "noarch".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}
