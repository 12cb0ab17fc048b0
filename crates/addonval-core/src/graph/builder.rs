//! Expansion of a root unit's catalog dependencies into an expected
//! deployment set.
//!
//! The walk uses an explicit LIFO work-list instead of call-stack recursion.
//! Children are pushed in reverse declaration order so the expected list
//! comes out in the same pre-order a recursive walk would produce.
//!
//! Two kinds of override are kept separate:
//! - [`DisabledOfferings`] is computed once from the root's direct
//!   dependencies and applies at every depth;
//! - enable/disable/flavor overrides are looked up on the current node's
//!   own `UnitConfig` only.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use addonval_catalog::{
    CatalogService, DependencyDeclaration, Offering, UnitConfig, FALLBACK_FLAVOR,
};
use tracing::{debug, instrument, warn};

use crate::error::{CoreError, CoreResult};
use crate::graph::{DependencyGraphResult, ResolvedUnit};
use crate::metrics::METRICS;
use crate::model::OfferingIdentity;

/// Offering names disabled for a whole build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledOfferings(BTreeSet<String>);

impl DisabledOfferings {
    /// Names of the root's direct dependencies with `enabled == Some(false)`.
    ///
    /// Disables deeper in the tree are not collected.
    pub fn from_root(root: &UnitConfig) -> Self {
        Self(root.disabled_dependency_names().into_iter().collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for DisabledOfferings {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Whether a catalog dependency is deployed at this node.
pub fn is_included(dep: &DependencyDeclaration, node_override: Option<&UnitConfig>) -> bool {
    let explicitly_enabled = node_override.is_some_and(|o| o.enabled == Some(true));
    let explicitly_disabled = node_override.is_some_and(|o| o.enabled == Some(false));
    (dep.on_by_default && !explicitly_disabled) || explicitly_enabled
}

/// Flavor precedence: user override, catalog default, first allowed,
/// then [`FALLBACK_FLAVOR`].
pub fn resolve_flavor(dep: &DependencyDeclaration, node_override: Option<&UnitConfig>) -> String {
    node_override
        .map(|o| o.offering_flavor.as_str())
        .filter(|f| !f.is_empty())
        .or(dep.default_flavor.as_deref().filter(|f| !f.is_empty()))
        .or(dep.allowed_flavors.first().map(String::as_str))
        .unwrap_or(FALLBACK_FLAVOR)
        .to_string()
}

/// One pending expansion.
#[derive(Debug)]
struct WorkItem {
    catalog_id: String,
    offering_id: String,
    version_locator: String,
    flavor: String,
    config: UnitConfig,
    /// Locators expanded on the path to this item (copied, never shared).
    visited: BTreeSet<String>,
    /// Identities on the path to this item, root first.
    path: Vec<OfferingIdentity>,
    /// Identity the parent recorded for this item, if any.
    edge_target: Option<OfferingIdentity>,
}

/// Builds [`DependencyGraphResult`]s against a catalog collaborator.
pub struct GraphBuilder {
    catalog: Arc<dyn CatalogService>,
}

impl GraphBuilder {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }

    /// Expand `unit_config` rooted at `version_locator`.
    ///
    /// The globally disabled set is derived from the root's direct
    /// dependencies. The first unresolvable offering or version aborts the
    /// build.
    pub async fn build(
        &self,
        catalog_id: &str,
        offering_id: &str,
        version_locator: &str,
        flavor: &str,
        unit_config: &UnitConfig,
    ) -> CoreResult<DependencyGraphResult> {
        let disabled = DisabledOfferings::from_root(unit_config);
        self.build_with_disabled(
            catalog_id,
            offering_id,
            version_locator,
            flavor,
            unit_config,
            &disabled,
        )
        .await
    }

    /// Expand with an explicit globally disabled set.
    #[instrument(skip(self, unit_config, disabled), fields(root = %version_locator))]
    pub async fn build_with_disabled(
        &self,
        catalog_id: &str,
        offering_id: &str,
        version_locator: &str,
        flavor: &str,
        unit_config: &UnitConfig,
        disabled: &DisabledOfferings,
    ) -> CoreResult<DependencyGraphResult> {
        let mut result = DependencyGraphResult::default();
        let mut offerings: HashMap<(String, String), Offering> = HashMap::new();
        let mut stack = vec![WorkItem {
            catalog_id: catalog_id.to_string(),
            offering_id: offering_id.to_string(),
            version_locator: version_locator.to_string(),
            flavor: flavor.to_string(),
            config: unit_config.clone(),
            visited: BTreeSet::new(),
            path: Vec::new(),
            edge_target: None,
        }];

        while let Some(item) = stack.pop() {
            if item.visited.contains(&item.version_locator) {
                if let Some(target) = &item.edge_target {
                    record_cycle(&mut result, &item.path, target);
                }
                continue;
            }

            let mut visited = item.visited.clone();
            visited.insert(item.version_locator.clone());

            let key = (item.catalog_id.clone(), item.offering_id.clone());
            let offering = match offerings.entry(key) {
                Entry::Occupied(cached) => cached.into_mut(),
                Entry::Vacant(slot) => {
                    let fetched = self
                        .catalog
                        .get_offering(&item.catalog_id, &item.offering_id)
                        .await?;
                    METRICS.inc_lookups();
                    slot.insert(fetched)
                }
            };
            let version = offering.find_version(&item.version_locator).ok_or_else(|| {
                CoreError::VersionNotFound {
                    offering_id: item.offering_id.clone(),
                    locator: item.version_locator.clone(),
                }
            })?;

            let node_flavor = if item.flavor.is_empty() {
                version.flavor.name.clone().unwrap_or_default()
            } else {
                item.flavor.clone()
            };
            let identity =
                OfferingIdentity::new(offering.name.clone(), version.version.clone(), node_flavor);
            METRICS.inc_nodes_expanded();
            debug!(unit = %identity, "expanding unit");

            result.expected.push(identity.clone());
            result.visited.extend(visited.iter().cloned());

            let mut path = item.path.clone();
            path.push(identity.clone());

            let mut children = Vec::new();
            let mut child_identities = Vec::new();
            for dep in &version.dependencies {
                if disabled.contains(&dep.name) {
                    debug!(dependency = %dep.name, "skipping globally disabled dependency");
                    continue;
                }
                let node_override = item.config.dependency(&dep.name);
                if !is_included(dep, node_override) {
                    continue;
                }

                let dep_flavor = resolve_flavor(dep, node_override);
                let dep_catalog = if dep.catalog_id.is_empty() {
                    item.catalog_id.clone()
                } else {
                    dep.catalog_id.clone()
                };
                let resolved = self
                    .catalog
                    .get_offering_version_locator_by_constraint(
                        &dep_catalog,
                        &dep.offering_id,
                        &dep.version_constraint,
                        &dep_flavor,
                    )
                    .await?;

                METRICS.inc_lookups();
                let child = OfferingIdentity::new(
                    dep.name.clone(),
                    resolved.version.clone(),
                    dep_flavor.clone(),
                );
                result.add_edge(&identity, &child);
                child_identities.push(child.clone());

                let config = item
                    .config
                    .dependencies
                    .iter()
                    .find(|c| {
                        c.offering_name == dep.name
                            && (c.offering_flavor == dep_flavor || c.offering_flavor.is_empty())
                    })
                    .cloned()
                    .unwrap_or_else(|| {
                        UnitConfig::synthesized(
                            dep.name.clone(),
                            dep_flavor.clone(),
                            dep_catalog.clone(),
                            dep.offering_id.clone(),
                            resolved.version_locator.clone(),
                        )
                    });

                children.push(WorkItem {
                    catalog_id: dep_catalog,
                    offering_id: dep.offering_id.clone(),
                    version_locator: resolved.version_locator,
                    flavor: dep_flavor,
                    config,
                    visited: visited.clone(),
                    path: path.clone(),
                    edge_target: Some(child),
                });
            }

            result
                .nodes
                .entry(identity.clone())
                .or_insert_with(|| ResolvedUnit {
                    identity: identity.clone(),
                    catalog_id: item.catalog_id.clone(),
                    offering_id: item.offering_id.clone(),
                    version_locator: item.version_locator.clone(),
                    dependencies: child_identities,
                });

            stack.extend(children.into_iter().rev());
        }

        debug!(
            expected = result.expected.len(),
            edges = result.edge_count(),
            cycles = result.cycles.len(),
            "dependency graph built"
        );
        Ok(result)
    }
}

fn record_cycle(
    result: &mut DependencyGraphResult,
    path: &[OfferingIdentity],
    target: &OfferingIdentity,
) {
    let Some(start) = path.iter().position(|p| p == target) else {
        return;
    };
    let mut cycle: Vec<OfferingIdentity> = path[start..].to_vec();
    cycle.push(target.clone());
    if !result.cycles.contains(&cycle) {
        warn!(chain = %render_chain(&cycle), "circular dependency detected");
        result.cycles.push(cycle);
    }
}

pub(crate) fn render_chain(chain: &[OfferingIdentity]) -> String {
    chain
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}
