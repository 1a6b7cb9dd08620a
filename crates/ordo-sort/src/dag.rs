//! Directed dependency graph over opaque node handles.
//!
//! Unlike a plain DAG this graph accepts cycles: mutually dependent views and
//! procedures are valid input. Ordering goes through [`DependencyGraph::condense`],
//! which collapses every strongly connected component into one unit.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::Display;
use std::hash::Hash;

use ordo_core::DependencyKind;
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::{Error, Result};

/// A directed graph whose edges run from a dependency to its dependent.
#[derive(Debug, Clone)]
pub struct DependencyGraph<T>
where
    T: Clone + Eq + Hash + Display,
{
    graph: DiGraph<T, DependencyKind>,
    index_map: HashMap<T, NodeIndex>,
    insertion_order: Vec<NodeIndex>,
}

/// The graph with every strongly connected component collapsed to one node.
#[derive(Debug, Clone)]
pub struct Condensation<T> {
    /// Members of each component, in node insertion order.
    pub components: Vec<Vec<T>>,
    /// Successor components of each component.
    pub successors: Vec<BTreeSet<usize>>,
    /// Number of distinct predecessor components of each component.
    pub in_degree: Vec<usize>,
}

impl<T> DependencyGraph<T>
where
    T: Clone + Eq + Hash + Display,
{
    /// Creates a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index_map: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a node. If the node already exists, this is a no-op.
    ///
    /// Returns the node index for use with other methods.
    pub fn add_node(&mut self, value: T) -> NodeIndex {
        if let Some(&idx) = self.index_map.get(&value) {
            return idx;
        }
        let idx = self.graph.add_node(value.clone());
        self.index_map.insert(value, idx);
        self.insertion_order.push(idx);
        idx
    }

    /// Adds an edge from the dependency `from` to the dependent `to`.
    ///
    /// Self-edges and repeated edges are skipped. Returns true if an edge was
    /// added.
    ///
    /// # Errors
    ///
    /// Returns an error if either node index is invalid.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: DependencyKind) -> Result<bool> {
        self.weight(from)?;
        self.weight(to)?;

        if from == to || self.graph.find_edge(from, to).is_some() {
            return Ok(false);
        }
        self.graph.add_edge(from, to, kind);
        Ok(true)
    }

    /// Returns the kind of the edge between two nodes, if there is one.
    #[must_use]
    pub fn edge_kind(&self, from: NodeIndex, to: NodeIndex) -> Option<DependencyKind> {
        self.graph
            .find_edge(from, to)
            .and_then(|edge| self.graph.edge_weight(edge))
            .copied()
    }

    /// Returns the node index for a value, if it exists.
    #[must_use]
    pub fn get_index(&self, value: &T) -> Option<NodeIndex> {
        self.index_map.get(value).copied()
    }

    /// Returns every node the given node depends on, directly or not.
    ///
    /// The node itself is included only if it lies on a cycle. Results are in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the node index is invalid.
    pub fn transitive_predecessors(&self, node: NodeIndex) -> Result<Vec<T>> {
        self.weight(node)?;

        let mut seen: BTreeSet<NodeIndex> = BTreeSet::new();
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        while let Some(idx) = queue.pop_front() {
            if seen.insert(idx) {
                queue.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
            }
        }

        Ok(self.values(
            self.insertion_order
                .iter()
                .copied()
                .filter(|idx| seen.contains(idx)),
        ))
    }

    /// Collapses strongly connected components into a condensation DAG.
    #[must_use]
    pub fn condense(&self) -> Condensation<T> {
        let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
        let mut member_indices: Vec<Vec<NodeIndex>> = Vec::new();
        for (component, members) in tarjan_scc(&self.graph).into_iter().enumerate() {
            for &idx in &members {
                component_of.insert(idx, component);
            }
            member_indices.push(members);
        }

        let count = member_indices.len();
        let mut successors = vec![BTreeSet::new(); count];
        let mut in_degree = vec![0; count];
        for edge in self.graph.edge_references() {
            let (Some(&from), Some(&to)) = (
                component_of.get(&edge.source()),
                component_of.get(&edge.target()),
            ) else {
                continue;
            };
            if from == to {
                continue;
            }
            let added = successors
                .get_mut(from)
                .is_some_and(|set: &mut BTreeSet<usize>| set.insert(to));
            if added {
                if let Some(degree) = in_degree.get_mut(to) {
                    *degree += 1;
                }
            }
        }

        let position: HashMap<NodeIndex, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect();
        let components = member_indices
            .into_iter()
            .map(|mut members| {
                members.sort_by_key(|idx| position.get(idx).copied().unwrap_or(usize::MAX));
                self.values(members.into_iter())
            })
            .collect();

        Condensation {
            components,
            successors,
            in_degree,
        }
    }

    fn weight(&self, node: NodeIndex) -> Result<&T> {
        self.graph
            .node_weight(node)
            .ok_or_else(|| Error::GraphNodeNotFound {
                node: format!("index {}", node.index()),
            })
    }

    fn values(&self, indices: impl Iterator<Item = NodeIndex>) -> Vec<T> {
        indices
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect()
    }
}

impl<T> Default for DependencyGraph<T>
where
    T: Clone + Eq + Hash + Display,
{
    fn default() -> Self {
        Self::new()
    }
}
