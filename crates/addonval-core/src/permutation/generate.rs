use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::UnitConfig;

/// Above this many optional dependencies the combination count explodes.
pub const MAX_PERMUTED_DEPENDENCIES: usize = 10;

/// One generated test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permutation {
    pub name: String,
    /// Resource prefix, derived from the config digest.
    pub prefix: String,
    pub unit_config: UnitConfig,
}

impl Permutation {
    pub fn new(name: impl Into<String>, unit_config: UnitConfig) -> Self {
        let digest = unit_config.digest();
        Self {
            name: name.into(),
            prefix: format!("av{}", &digest[..8]),
            unit_config,
        }
    }
}

fn with_overrides(base: &UnitConfig, disabled: &[&str], names: &[&str]) -> UnitConfig {
    let mut config = base.clone();
    for name in names {
        let enabled = Some(!disabled.contains(name));
        match config.dependencies.iter_mut().find(|d| d.offering_name == *name) {
            Some(dep) => dep.enabled = enabled,
            None => config.dependencies.push(UnitConfig {
                offering_name: (*name).to_string(),
                enabled,
                ..UnitConfig::default()
            }),
        }
    }
    config
}

/// Every enable/disable combination of `dependency_names` on the root.
///
/// The all-enabled combination is the default deployment and is left out.
/// Combinations producing an identical config are emitted once.
pub fn generate_permutations(base: &UnitConfig, dependency_names: &[String]) -> Vec<Permutation> {
    let mut names: Vec<&str> = Vec::new();
    for name in dependency_names {
        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }
    if names.len() > MAX_PERMUTED_DEPENDENCIES {
        warn!(
            requested = names.len(),
            limit = MAX_PERMUTED_DEPENDENCIES,
            "too many optional dependencies, permuting the first ones only"
        );
        names.truncate(MAX_PERMUTED_DEPENDENCIES);
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for mask in 1u32..(1u32 << names.len()) {
        let disabled: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, n)| *n)
            .collect();
        let config = with_overrides(base, &disabled, &names);
        if !seen.insert(config.digest()) {
            continue;
        }
        let name = format!("{}-without-{}", base.offering_name, disabled.join("-"));
        out.push(Permutation::new(name, config));
    }
    out
}
