//! Parsing of textual dependency expressions (`name [op evr]`)

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::error::EvrError;
use crate::evr::Evr;
use crate::operator::Operator;

lazy_static! {
    static ref RELATION_RE: Regex =
        Regex::new(r"^\s*([^\s<>=]+)\s*(?:(<=|>=|=<|=>|==|=|<|>)\s*(\S+))?\s*$").unwrap();
}

/// A parsed dependency expression before interning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub constraint: Option<(Operator, Evr)>,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some((op, evr)) => write!(f, "{} {} {}", self.name, op, evr),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Parse `name`, `name op evr` or `name<op>evr`
pub fn parse_relation(input: &str) -> Result<Relation, EvrError> {
    let malformed = |reason: String| EvrError::MalformedRelation {
        relation: input.to_string(),
        reason,
    };

    if input.trim().is_empty() {
        return Err(malformed("empty expression".to_string()));
    }

    let caps = RELATION_RE
        .captures(input)
        .ok_or_else(|| malformed("expected `name [op version]`".to_string()))?;

    let name = caps[1].to_string();
    let constraint = match (caps.get(2), caps.get(3)) {
        (Some(op), Some(evr)) => {
            let op: Operator = op.as_str().parse().map_err(|e: EvrError| malformed(e.to_string()))?;
            let evr = Evr::parse(evr.as_str()).map_err(|e| malformed(e.to_string()))?;
            Some((op, evr))
        }
        _ => None,
    };

    Ok(Relation { name, constraint })
}
