use satsolver_evr::{Evr, Operator};
use serde::{Deserialize, Serialize};

use super::StringId;

/// Handle of an interned [`Dependency`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DepId(pub(crate) u32);

impl DepId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A dependency expression: a name, optionally restricted to one
/// architecture and to a version range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub name: StringId,
    pub arch: Option<StringId>,
    pub constraint: Option<(Operator, Evr)>,
}

impl Dependency {
    pub fn name(name: StringId) -> Self {
        Self {
            name,
            arch: None,
            constraint: None,
        }
    }

    pub fn versioned(name: StringId, op: Operator, evr: Evr) -> Self {
        Self {
            name,
            arch: None,
            constraint: Some((op, evr)),
        }
    }

    pub fn with_arch(mut self, arch: StringId) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn is_versioned(&self) -> bool {
        self.constraint.is_some()
    }
}

/// The six relation kinds a solvable carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
}

impl DepKind {
    pub const ALL: [DepKind; 6] = [
        DepKind::Provides,
        DepKind::Requires,
        DepKind::Conflicts,
        DepKind::Obsoletes,
        DepKind::Recommends,
        DepKind::Suggests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DepKind::Provides => "provides",
            DepKind::Requires => "requires",
            DepKind::Conflicts => "conflicts",
            DepKind::Obsoletes => "obsoletes",
            DepKind::Recommends => "recommends",
            DepKind::Suggests => "suggests",
        }
    }
}
