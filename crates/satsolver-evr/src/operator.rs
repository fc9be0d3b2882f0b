//! Relation operators for dependency expressions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::EvrError;
use crate::evr::{Evr, EvrCmpMode};

const REL_GT: u8 = 1;
const REL_EQ: u8 = 2;
const REL_LT: u8 = 4;

/// Comparison operator of a versioned dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// <
    Less,
    /// <=
    LessEqual,
    /// =
    Equal,
    /// >=
    GreaterEqual,
    /// >
    Greater,
}

impl Operator {
    /// Relation as a bit set of GT (1), EQ (2) and LT (4)
    pub fn flags(self) -> u8 {
        match self {
            Operator::Less => REL_LT,
            Operator::LessEqual => REL_LT | REL_EQ,
            Operator::Equal => REL_EQ,
            Operator::GreaterEqual => REL_GT | REL_EQ,
            Operator::Greater => REL_GT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Equal => "=",
            Operator::GreaterEqual => ">=",
            Operator::Greater => ">",
        }
    }

    /// Whether a candidate whose comparison against the bound is `ord`
    /// satisfies `candidate <op> bound`
    pub fn accepts(self, ord: Ordering) -> bool {
        self.flags() & ordering_bit(ord) != 0
    }
}

fn ordering_bit(ord: Ordering) -> u8 {
    match ord {
        Ordering::Less => REL_LT,
        Ordering::Equal => REL_EQ,
        Ordering::Greater => REL_GT,
    }
}

impl FromStr for Operator {
    type Err = EvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Operator::Less),
            "<=" | "=<" => Ok(Operator::LessEqual),
            "=" | "==" => Ok(Operator::Equal),
            ">=" | "=>" => Ok(Operator::GreaterEqual),
            ">" => Ok(Operator::Greater),
            _ => Err(EvrError::InvalidOperator(s.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether the version range of a provide (`name <pop> pevr`) overlaps the
/// range a requirement asks for (`name <op> evr`).
///
/// Releases are ignored when either side has none.
pub fn ranges_intersect(pop: Operator, pevr: &Evr, op: Operator, evr: &Evr) -> bool {
    let pflags = pop.flags();
    let flags = op.flags();

    // Both open towards the same side
    if pflags & flags & (REL_GT | REL_LT) != 0 {
        return true;
    }

    let ord = pevr.compare_with(evr, EvrCmpMode::MatchRelease);
    if ord == Ordering::Equal {
        return pflags & flags & REL_EQ != 0;
    }

    // Which side of `evr` the provide range reaches, seen from the requirement
    let reach = if flags == REL_EQ {
        pflags
    } else {
        (flags ^ (REL_GT | REL_LT)) & (pflags | REL_GT | REL_LT)
    };

    // pevr < evr means the provide lies on the GT side of the requirement's bound
    let side = match ord {
        Ordering::Less => REL_GT,
        Ordering::Greater => REL_LT,
        Ordering::Equal => REL_EQ,
    };
    reach & side != 0
}
