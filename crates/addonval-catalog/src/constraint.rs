//! Minimal version-constraint matching used by the in-memory catalog.
//!
//! Supported forms: empty, `*`, `latest`, exact (`1.2.3` / `v1.2.3`),
//! comparison operators (`>=`, `>`, `<=`, `<`, `=`), caret (`^1.2.0`),
//! tilde (`~1.2.0`) and comma-separated conjunctions of the above.

use std::cmp::Ordering;

use crate::error::CatalogError;

/// Dotted numeric version, compared component-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleVersion(Vec<u64>);

impl SimpleVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('v');
        if trimmed.is_empty() {
            return None;
        }
        let core = trimmed.split(['-', '+']).next().unwrap_or(trimmed);
        core.split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(SimpleVersion)
    }

    fn component(&self, idx: usize) -> u64 {
        self.0.get(idx).copied().unwrap_or(0)
    }
}

impl PartialOrd for SimpleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimpleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// Whether `version` satisfies `constraint`.
pub fn satisfies(constraint: &str, version: &str) -> Result<bool, CatalogError> {
    let Some(candidate) = SimpleVersion::parse(version) else {
        return Ok(false);
    };
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" || constraint.eq_ignore_ascii_case("latest") {
        return Ok(true);
    }
    for clause in constraint.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if !clause_matches(clause, &candidate)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_matches(clause: &str, candidate: &SimpleVersion) -> Result<bool, CatalogError> {
    let (op, rest) = split_operator(clause);
    let bound = SimpleVersion::parse(rest)
        .ok_or_else(|| CatalogError::InvalidConstraint(clause.to_string()))?;
    let ord = candidate.cmp(&bound);
    Ok(match op {
        ">=" => ord != Ordering::Less,
        ">" => ord == Ordering::Greater,
        "<=" => ord != Ordering::Greater,
        "<" => ord == Ordering::Less,
        "^" => {
            let major = bound.component(0);
            let upper = if major > 0 {
                SimpleVersion(vec![major + 1])
            } else {
                SimpleVersion(vec![0, bound.component(1) + 1])
            };
            ord != Ordering::Less && *candidate < upper
        }
        "~" => {
            let upper = SimpleVersion(vec![bound.component(0), bound.component(1) + 1]);
            ord != Ordering::Less && *candidate < upper
        }
        _ => ord == Ordering::Equal,
    })
}

fn split_operator(clause: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "^", "~", "="] {
        if let Some(rest) = clause.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", clause)
}
