//! Dependency graph construction over groups of changes.
//!
//! A group is the set of changes executed by one command. Each change names
//! its dependencies as `object`, `schema.object`, `object.change` or
//! `schema.object.change`; names are resolved against the groups of the
//! batch only, and every resolved name becomes an edge from the group that
//! provides it to the group that needs it.
//!
//! Changes of one object are additionally chained in their order within the
//! object, reversed for rollbacks.

use std::collections::{BTreeMap, HashMap};

use ordo_core::{Change, DependencyKind, NameNormalizer};
use petgraph::graph::NodeIndex;
use tracing::{debug, trace};

use crate::dag::DependencyGraph;
use crate::error::{Error, Result};

/// Builds dependency graphs whose nodes are group ids.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    normalizer: NameNormalizer,
}

#[derive(Debug, Clone, Copy)]
struct Latest {
    group: usize,
    order_within_object: i32,
}

/// Name indexes, tried in declaration order.
#[derive(Debug, Default)]
struct ChangeIndexes {
    object: HashMap<(String, String), Latest>,
    schema_object: HashMap<String, Latest>,
    object_change: HashMap<(String, String), usize>,
    schema_object_change: HashMap<String, usize>,
}

impl ChangeIndexes {
    fn add(&mut self, normalizer: &NameNormalizer, group: usize, change: &Change) {
        let schema = change.schema();
        let object = change.object_name();
        let change_name = change.change_name();
        let latest = Latest {
            group,
            order_within_object: change.order_within_object(),
        };

        keep_latest(
            &mut self.object,
            (schema.to_string(), normalizer.normalize(object)),
            latest,
        );
        keep_latest(
            &mut self.schema_object,
            normalizer.normalize(&format!("{schema}.{object}")),
            latest,
        );
        self.object_change.insert(
            (
                schema.to_string(),
                normalizer.normalize(&format!("{object}.{change_name}")),
            ),
            group,
        );
        self.schema_object_change.insert(
            normalizer.normalize(&format!("{schema}.{object}.{change_name}")),
            group,
        );
    }

    fn resolve(&self, normalizer: &NameNormalizer, schema: &str, target: &str) -> Option<usize> {
        let normalized = normalizer.normalize(target);
        let scoped = (schema.to_string(), normalized.clone());

        self.object
            .get(&scoped)
            .or_else(|| self.schema_object.get(&normalized))
            .map(|latest| latest.group)
            .or_else(|| self.object_change.get(&scoped).copied())
            .or_else(|| self.schema_object_change.get(&normalized).copied())
    }
}

fn keep_latest<K: std::hash::Hash + Eq>(index: &mut HashMap<K, Latest>, key: K, candidate: Latest) {
    match index.get(&key) {
        Some(existing) if existing.order_within_object >= candidate.order_within_object => {}
        _ => {
            index.insert(key, candidate);
        }
    }
}

impl GraphBuilder {
    /// Creates a builder comparing names through `normalizer`.
    #[must_use]
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self { normalizer }
    }

    /// Builds the graph for the given `(group id, changes)` pairs.
    ///
    /// Only changes with code dependencies contribute named edges; names that
    /// resolve outside the batch are ignored. With `rollback` set, the chain
    /// between changes of one object runs from the newest change to the
    /// oldest.
    ///
    /// # Errors
    ///
    /// Returns an error if an internal graph operation fails.
    pub fn build<'a, I>(&self, groups: I, rollback: bool) -> Result<DependencyGraph<usize>>
    where
        I: IntoIterator<Item = (usize, &'a [Change])>,
    {
        let groups: Vec<(usize, &'a [Change])> = groups.into_iter().collect();

        let mut graph = DependencyGraph::new();
        let mut nodes: HashMap<usize, NodeIndex> = HashMap::with_capacity(groups.len());
        let mut indexes = ChangeIndexes::default();
        for &(group, changes) in &groups {
            nodes.insert(group, graph.add_node(group));
            for change in changes {
                indexes.add(&self.normalizer, group, change);
            }
        }
        let node = |group: usize| {
            nodes.get(&group).copied().ok_or_else(|| Error::GraphNodeNotFound {
                node: format!("group {group}"),
            })
        };

        for &(group, changes) in &groups {
            for change in changes {
                let Some(dependencies) = change.code_dependencies() else {
                    continue;
                };
                for dependency in dependencies {
                    match indexes.resolve(&self.normalizer, change.schema(), &dependency.target) {
                        Some(provider) => {
                            graph.add_edge(node(provider)?, node(group)?, dependency.kind)?;
                        }
                        None => trace!(
                            change = %change.key(),
                            dependency = %dependency.target,
                            "dependency not found in this batch; ignoring"
                        ),
                    }
                }
            }
        }

        for chain in self.object_chains(&groups).values() {
            for pair in chain.windows(2) {
                if let [(_, earlier), (_, later)] = pair {
                    let (from, to) = if rollback {
                        (*later, *earlier)
                    } else {
                        (*earlier, *later)
                    };
                    graph.add_edge(node(from)?, node(to)?, DependencyKind::Implicit)?;
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            rollback,
            "built dependency graph"
        );
        Ok(graph)
    }

    /// Groups every change by object, sorted by order within the object.
    fn object_chains(
        &self,
        groups: &[(usize, &[Change])],
    ) -> BTreeMap<(String, String, String), Vec<(i32, usize)>> {
        let mut chains: BTreeMap<(String, String, String), Vec<(i32, usize)>> = BTreeMap::new();
        for &(group, changes) in groups {
            for change in changes {
                let key = (
                    change.change_type().object_group_name().to_string(),
                    change.schema().to_string(),
                    self.normalizer.normalize(change.object_name()),
                );
                chains
                    .entry(key)
                    .or_default()
                    .push((change.order_within_object(), group));
            }
        }
        for chain in chains.values_mut() {
            chain.sort_by_key(|&(order_within_object, _)| order_within_object);
        }
        chains
    }
}
