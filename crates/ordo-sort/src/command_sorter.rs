//! The change command sorter: partitions a deployment and orders each part.
//!
//! Commands are split into three partitions that are emitted in a fixed
//! sequence:
//!
//! 1. **Drops**, newest-created first. Incremental objects are ordered by
//!    name; rerunnable objects either by (priority, name) or, on platforms
//!    that need it, by the dependencies found in their live definitions.
//! 2. **Adds**, in dependency order through the graph and group sorter.
//! 3. **Static data**, by each command's legacy order.

use std::collections::{BTreeSet, HashMap};

use ordo_core::{Change, ChangeCommand, ChangeKey, DEFAULT_CHANGE_ORDER, PlatformConfig};
use tracing::{debug, instrument};

use crate::dag::DependencyGraph;
use crate::error::{Error, Result};
use crate::graph::GraphBuilder;
use crate::metrics::{SortMetrics, partitions, time_sort};
use crate::sort_key::{SortKey, assign_positions};
use crate::sorter::GroupSorter;
use crate::text::TextDependencyExtractor;

/// Reads the definition of an object as it currently exists in the target
/// environment.
///
/// Used only when dropping rerunnable objects on platforms that require a
/// drop order. `Ok(None)` means the object has no readable definition and is
/// treated as empty; an error aborts the sort.
pub trait DefinitionSource {
    /// Returns the live definition of the object `change` belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be read.
    fn definition(&self, change: &Change) -> Result<Option<String>>;
}

impl<F> DefinitionSource for F
where
    F: Fn(&Change) -> Option<String>,
{
    fn definition(&self, change: &Change) -> Result<Option<String>> {
        Ok(self(change))
    }
}

/// A [`DefinitionSource`] that knows no definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionSource for NoDefinitions {
    fn definition(&self, _change: &Change) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Orders the change commands of one deployment.
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use ordo_core::prelude::*;
/// use ordo_sort::ChangeCommandSorter;
///
/// # fn main() -> ordo_sort::Result<()> {
/// let view = Arc::new(ChangeType::new(ChangeType::VIEW, true, 20));
/// let change = |name: &str, deps: &[&str]| {
///     let key = ChangeKey::new(ObjectKey::new("sales", name, Arc::clone(&view)), "n/a");
///     Change::new(key, "").with_declared_dependencies(deps.iter().copied())
/// };
///
/// let commands = vec![
///     ExecuteChangeCommand::deploy(vec![change("v_totals", &["v_orders"])]),
///     ExecuteChangeCommand::deploy(vec![change("v_orders", &[])]),
/// ];
///
/// let sorted = ChangeCommandSorter::new(PlatformConfig::default()).sort(commands, false)?;
/// assert_eq!(sorted[0].changes()[0].object_name(), "v_orders");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChangeCommandSorter<D = NoDefinitions> {
    config: PlatformConfig,
    definitions: D,
    extractor: TextDependencyExtractor,
    graph_builder: GraphBuilder,
    group_sorter: GroupSorter,
    metrics: SortMetrics,
}

impl ChangeCommandSorter<NoDefinitions> {
    /// Creates a sorter for the given platform.
    #[must_use]
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            extractor: TextDependencyExtractor::new(config.name_normalizer.clone()),
            graph_builder: GraphBuilder::new(config.name_normalizer.clone()),
            group_sorter: GroupSorter::new(),
            metrics: SortMetrics::new(),
            definitions: NoDefinitions,
            config,
        }
    }
}

impl<D: DefinitionSource> ChangeCommandSorter<D> {
    /// Replaces the source of live definitions used to order drops.
    #[must_use]
    pub fn with_definitions<E: DefinitionSource>(self, definitions: E) -> ChangeCommandSorter<E> {
        ChangeCommandSorter {
            config: self.config,
            definitions,
            extractor: self.extractor,
            graph_builder: self.graph_builder,
            group_sorter: self.group_sorter,
            metrics: self.metrics,
        }
    }

    /// Returns the platform configuration.
    #[must_use]
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Orders `commands` for execution.
    ///
    /// The result holds every input command exactly once: drops, then adds,
    /// then static data. Add commands get their resolved dependency keys set,
    /// and changes without code dependencies get them calculated from their
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCommand`] for a command without a change type,
    /// or the error of the [`DefinitionSource`] when drops are ordered by
    /// their live definitions.
    #[instrument(skip_all, fields(commands = commands.len(), rollback = rollback))]
    pub fn sort<C: ChangeCommand>(&self, commands: Vec<C>, rollback: bool) -> Result<Vec<C>> {
        let _timer = time_sort(self.metrics);

        let keys = commands
            .iter()
            .enumerate()
            .map(|(index, command)| SortKey::from_command(index, command))
            .collect::<Result<Vec<_>>>()?;
        let mut slots: Vec<Option<C>> = commands.into_iter().map(Some).collect();

        let (data, rest): (Vec<SortKey>, Vec<SortKey>) =
            keys.into_iter().partition(|key| key.change_type().is_static_data());
        let (drops, adds): (Vec<SortKey>, Vec<SortKey>) =
            rest.into_iter().partition(SortKey::is_drop);

        self.metrics.record_commands(partitions::DROP, drops.len());
        self.metrics.record_commands(partitions::ADD, adds.len());
        self.metrics.record_commands(partitions::STATIC_DATA, data.len());
        debug!(
            drops = drops.len(),
            adds = adds.len(),
            static_data = data.len(),
            "partitioned change commands"
        );

        let drops = self.sort_drops(drops, &mut slots)?;
        let adds = self.sort_adds(adds, &mut slots, rollback)?;
        let data = sort_static_data(data, &slots);

        Ok(drops
            .iter()
            .chain(&adds)
            .chain(&data)
            .filter_map(|key| slots.get_mut(key.index()).and_then(Option::take))
            .collect())
    }

    fn sort_adds<C: ChangeCommand>(
        &self,
        adds: Vec<SortKey>,
        slots: &mut [Option<C>],
        rollback: bool,
    ) -> Result<Vec<SortKey>> {
        if adds.is_empty() {
            return Ok(adds);
        }

        let members: BTreeSet<usize> = adds.iter().map(SortKey::index).collect();
        let enriched = self.extractor.calculate_dependencies(
            slots
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| members.contains(index))
                .filter_map(|(_, slot)| slot.as_mut())
                .flat_map(|command| command.changes_mut().iter_mut()),
        );
        debug!(enriched, "calculated dependencies of add changes");

        let graph = self.graph_builder.build(
            adds.iter().map(|key| (key.index(), changes_of(slots, key.index()))),
            rollback,
        )?;

        for key in &adds {
            let node = graph
                .get_index(&key.index())
                .ok_or_else(|| Error::GraphNodeNotFound {
                    node: key.to_string(),
                })?;
            let dependency_keys: BTreeSet<ChangeKey> = graph
                .transitive_predecessors(node)?
                .into_iter()
                .filter(|&group| group != key.index())
                .flat_map(|group| changes_of(slots, group))
                .map(|change| change.key().clone())
                .collect();
            if let Some(command) = slots.get_mut(key.index()).and_then(Option::as_mut) {
                command.set_resolved_dependency_keys(dependency_keys);
            }
        }

        Ok(self.order_by_graph(adds, &graph))
    }

    fn sort_drops<C: ChangeCommand>(
        &self,
        drops: Vec<SortKey>,
        slots: &mut [Option<C>],
    ) -> Result<Vec<SortKey>> {
        let (rerunnable, mut incremental): (Vec<SortKey>, Vec<SortKey>) = drops
            .into_iter()
            .partition(|key| key.change_type().is_rerunnable());

        let mut rerunnable = if self.config.drop_order_required && !rerunnable.is_empty() {
            self.sort_rerunnable_drops_by_definition(rerunnable, slots)?
        } else {
            let mut rerunnable = rerunnable;
            rerunnable.sort_by(|a, b| {
                a.change_type()
                    .deploy_order_priority()
                    .cmp(&b.change_type().deploy_order_priority())
                    .then_with(|| a.object_name().cmp(b.object_name()))
            });
            assign_positions(&mut rerunnable);
            rerunnable
        };

        incremental.sort_by(|a, b| a.object_name().cmp(b.object_name()));
        assign_positions(&mut incremental);

        let mut drops = Vec::with_capacity(rerunnable.len() + incremental.len());
        drops.append(&mut rerunnable);
        drops.append(&mut incremental);
        drops.sort_by_key(SortKey::index);
        drops.sort_by_key(SortKey::order);
        drops.reverse();
        Ok(drops)
    }

    /// Orders rerunnable drops by the dependencies of their live definitions.
    ///
    /// Changes with preset code dependencies keep them and are not rescanned.
    fn sort_rerunnable_drops_by_definition<C: ChangeCommand>(
        &self,
        drops: Vec<SortKey>,
        slots: &mut [Option<C>],
    ) -> Result<Vec<SortKey>> {
        for key in &drops {
            let Some(change) = first_change_mut(slots, key.index()) else {
                continue;
            };
            let definition = self.definitions.definition(change)?;
            debug!(
                object = change.object_name(),
                found = definition.is_some(),
                "read live definition for drop"
            );
            change.set_content(definition.unwrap_or_default());
        }

        let members: BTreeSet<usize> = drops.iter().map(SortKey::index).collect();
        self.extractor.calculate_dependencies(
            slots
                .iter_mut()
                .enumerate()
                .filter(|(index, _)| members.contains(index))
                .filter_map(|(_, slot)| slot.as_mut())
                .filter_map(|command| command.changes_mut().first_mut()),
        );

        let graph = self.graph_builder.build(
            drops.iter().map(|key| {
                let changes = changes_of(slots, key.index());
                (key.index(), changes.get(..1).unwrap_or_default())
            }),
            false,
        )?;
        Ok(self.order_by_graph(drops, &graph))
    }

    /// Sorts `keys` through the group sorter and numbers them in that order.
    fn order_by_graph(&self, mut keys: Vec<SortKey>, graph: &DependencyGraph<usize>) -> Vec<SortKey> {
        let position: HashMap<usize, usize> = keys
            .iter()
            .enumerate()
            .map(|(position, key)| (key.index(), position))
            .collect();
        let key_of = |index: &usize| position.get(index).and_then(|&p| keys.get(p));

        let sorted = self.group_sorter.sort(graph, |a, b| match (key_of(a), key_of(b)) {
            (Some(a), Some(b)) => a.default_comparator(b),
            _ => a.cmp(b),
        });

        for (order, index) in (0_i64..).zip(sorted) {
            if let Some(key) = position.get(&index).and_then(|&p| keys.get_mut(p)) {
                key.assign_order(order);
            }
        }
        keys.sort_by_key(SortKey::order);
        keys
    }
}

/// Orders static data by legacy order; bundles of zero or several changes
/// use [`DEFAULT_CHANGE_ORDER`].
fn sort_static_data<C: ChangeCommand>(mut data: Vec<SortKey>, slots: &[Option<C>]) -> Vec<SortKey> {
    data.sort_by_key(|key| match changes_of(slots, key.index()) {
        [single] => single.order(),
        _ => DEFAULT_CHANGE_ORDER,
    });
    assign_positions(&mut data);
    data
}

fn changes_of<C: ChangeCommand>(slots: &[Option<C>], index: usize) -> &[Change] {
    match slots.get(index).and_then(Option::as_ref) {
        Some(command) => command.changes(),
        None => &[],
    }
}

fn first_change_mut<C: ChangeCommand>(slots: &mut [Option<C>], index: usize) -> Option<&mut Change> {
    slots
        .get_mut(index)
        .and_then(Option::as_mut)
        .and_then(|command| command.changes_mut().first_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordo_core::{ChangeType, ExecuteChangeCommand, NameNormalizer, ObjectKey};
    use std::sync::Arc;

    fn change(change_type: &Arc<ChangeType>, object: &str, name: &str) -> Change {
        Change::new(
            ChangeKey::new(ObjectKey::new("schema", object, Arc::clone(change_type)), name),
            "",
        )
    }

    fn view() -> Arc<ChangeType> {
        Arc::new(ChangeType::new(ChangeType::VIEW, true, 20))
    }

    fn names(commands: &[ExecuteChangeCommand]) -> Vec<String> {
        commands
            .iter()
            .filter_map(|c| c.changes().first())
            .map(|c| c.object_name().to_string())
            .collect()
    }

    #[test]
    fn empty_input_sorts_to_empty_output() -> Result<()> {
        let sorted = ChangeCommandSorter::new(PlatformConfig::default())
            .sort(Vec::<ExecuteChangeCommand>::new(), false)?;
        assert!(sorted.is_empty());
        Ok(())
    }

    #[test]
    fn discovered_dependencies_order_adds() -> Result<()> {
        let view = view();
        let commands = vec![
            ExecuteChangeCommand::deploy(vec![
                change(&view, "v_a", "n/a").with_dependency_content("create view v_a as select * from v_b"),
            ]),
            ExecuteChangeCommand::deploy(vec![change(&view, "v_b", "n/a")]),
        ];

        let sorted = ChangeCommandSorter::new(PlatformConfig::default()).sort(commands, false)?;

        assert_eq!(names(&sorted), vec!["v_b", "v_a"]);
        assert_eq!(sorted[1].resolved_dependency_keys().len(), 1);
        Ok(())
    }

    #[test]
    fn rerunnable_drops_use_live_definitions() -> Result<()> {
        let view = view();
        let commands = vec![
            ExecuteChangeCommand::undeploy(vec![change(&view, "v_a", "n/a")]),
            ExecuteChangeCommand::undeploy(vec![change(&view, "v_b", "n/a")]),
        ];
        let definitions = |change: &Change| match change.object_name() {
            "v_a" => Some("create view v_a as select * from v_b".to_string()),
            _ => None,
        };
        let config = PlatformConfig::new(NameNormalizer::Preserve).with_drop_order_required(true);

        let sorted = ChangeCommandSorter::new(config)
            .with_definitions(definitions)
            .sort(commands, false)?;

        assert_eq!(names(&sorted), vec!["v_a", "v_b"]);
        Ok(())
    }

    #[test]
    fn preset_drop_dependencies_survive_definition_lookup() -> Result<()> {
        let view = view();
        let commands = vec![
            ExecuteChangeCommand::undeploy(vec![change(&view, "v_z", "n/a")]),
            ExecuteChangeCommand::undeploy(vec![
                change(&view, "v_a", "n/a").with_declared_dependencies(["v_z"]),
            ]),
        ];
        let config = PlatformConfig::default().with_drop_order_required(true);

        let sorted = ChangeCommandSorter::new(config).sort(commands, false)?;

        assert_eq!(names(&sorted), vec!["v_a", "v_z"]);
        assert_eq!(
            sorted[0].changes()[0].code_dependencies().map(BTreeSet::len),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn definition_errors_abort_the_sort() {
        struct Failing;
        impl DefinitionSource for Failing {
            fn definition(&self, change: &Change) -> Result<Option<String>> {
                Err(Error::definition_lookup(change.object_name(), "connection refused"))
            }
        }

        let config = PlatformConfig::default().with_drop_order_required(true);
        let commands = vec![ExecuteChangeCommand::undeploy(vec![change(&view(), "v_a", "n/a")])];

        let result = ChangeCommandSorter::new(config)
            .with_definitions(Failing)
            .sort(commands, false);

        assert!(matches!(result, Err(Error::DefinitionLookup { .. })));
    }
}
