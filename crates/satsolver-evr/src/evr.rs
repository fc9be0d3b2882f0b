//! Structured `epoch:version-release` values

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::EvrError;
use crate::vercmp::vercmp;

lazy_static! {
    static ref SEGMENT_RE: Regex = Regex::new(r"^[A-Za-z0-9._+~^]+$").unwrap();
}

/// How releases take part in a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvrCmpMode {
    /// Compare epoch, version and release
    Full,
    /// Ignore the release when either side has none (`B >= 2.0` matches `B-2.0-3`)
    MatchRelease,
}

/// A package version: optional numeric epoch, upstream version, optional release.
///
/// Equality and hashing are structural (`1.0` and `1.00` are different
/// values); ordering is only available through [`Evr::compare`], which
/// treats them as equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evr {
    epoch: Option<u64>,
    version: String,
    release: Option<String>,
}

impl Evr {
    /// Build from already-validated parts
    pub fn new(epoch: Option<u64>, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse `[epoch:]version[-release]`
    pub fn parse(input: &str) -> Result<Self, EvrError> {
        let (epoch, rest) = match input.split_once(':') {
            Some((epoch, rest)) => {
                let value = epoch.parse::<u64>().map_err(|_| EvrError::InvalidEpoch {
                    evr: input.to_string(),
                    epoch: epoch.to_string(),
                })?;
                (Some(value), rest)
            }
            None => (None, input),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) => (version, Some(release)),
            None => (rest, None),
        };

        if !SEGMENT_RE.is_match(version) {
            return Err(EvrError::InvalidEvr(input.to_string()));
        }
        if let Some(release) = release {
            if !SEGMENT_RE.is_match(release) {
                return Err(EvrError::InvalidEvr(input.to_string()));
            }
        }

        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.map(str::to_string),
        })
    }

    /// Epoch, a missing epoch counts as 0
    pub fn epoch(&self) -> u64 {
        self.epoch.unwrap_or(0)
    }

    pub fn has_epoch(&self) -> bool {
        self.epoch.is_some()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    /// Full three-way comparison
    pub fn compare(&self, other: &Evr) -> Ordering {
        self.compare_with(other, EvrCmpMode::Full)
    }

    pub fn compare_with(&self, other: &Evr, mode: EvrCmpMode) -> Ordering {
        let ord = self.epoch().cmp(&other.epoch());
        if ord != Ordering::Equal {
            return ord;
        }

        let ord = vercmp(&self.version, &other.version);
        if ord != Ordering::Equal {
            return ord;
        }

        match (&self.release, &other.release) {
            (Some(a), Some(b)) => vercmp(a, b),
            (None, None) => Ordering::Equal,
            _ if mode == EvrCmpMode::MatchRelease => Ordering::Equal,
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
        }
    }
}

impl FromStr for Evr {
    type Err = EvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}
