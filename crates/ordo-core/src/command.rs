//! Execution units ordered by the change command sorter.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::change::{Change, ChangeKey};
use crate::change_type::ChangeType;

/// An atomic unit of execution wrapping one or more changes.
///
/// The sorter reads the drop flag and the changes, and writes back the keys
/// of every change the command was found to depend on. Commands are owned by
/// a single sort call at a time.
pub trait ChangeCommand {
    /// Returns true if this command removes its object.
    fn is_drop(&self) -> bool;

    /// Returns the changes executed by this command, in execution order.
    fn changes(&self) -> &[Change];

    /// Returns the changes for in-place enrichment.
    fn changes_mut(&mut self) -> &mut [Change];

    /// Records the keys of the changes this command depends on.
    fn set_resolved_dependency_keys(&mut self, keys: BTreeSet<ChangeKey>);

    /// Returns the change type the command is sorted under.
    ///
    /// Defaults to the type of the first change. Commands that can be empty
    /// must override this.
    fn change_type(&self) -> Option<Arc<ChangeType>> {
        self.changes().first().map(|change| Arc::clone(change.change_type()))
    }
}

/// Default [`ChangeCommand`]: a bundle of changes to deploy or drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteChangeCommand {
    changes: Vec<Change>,
    drop: bool,
    resolved_dependency_keys: BTreeSet<ChangeKey>,
}

impl ExecuteChangeCommand {
    /// Creates a command deploying the given changes.
    #[must_use]
    pub fn deploy(changes: Vec<Change>) -> Self {
        Self {
            changes,
            drop: false,
            resolved_dependency_keys: BTreeSet::new(),
        }
    }

    /// Creates a command dropping the objects of the given changes.
    #[must_use]
    pub fn undeploy(changes: Vec<Change>) -> Self {
        Self {
            changes,
            drop: true,
            resolved_dependency_keys: BTreeSet::new(),
        }
    }

    /// Returns the keys recorded by the last sort.
    #[must_use]
    pub fn resolved_dependency_keys(&self) -> &BTreeSet<ChangeKey> {
        &self.resolved_dependency_keys
    }
}

impl From<Change> for ExecuteChangeCommand {
    fn from(change: Change) -> Self {
        Self::deploy(vec![change])
    }
}

impl ChangeCommand for ExecuteChangeCommand {
    fn is_drop(&self) -> bool {
        self.drop
    }

    fn changes(&self) -> &[Change] {
        &self.changes
    }

    fn changes_mut(&mut self) -> &mut [Change] {
        &mut self.changes
    }

    fn set_resolved_dependency_keys(&mut self, keys: BTreeSet<ChangeKey>) {
        self.resolved_dependency_keys = keys;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ObjectKey;

    fn view_change(name: &str) -> Change {
        let view = Arc::new(ChangeType::new(ChangeType::VIEW, true, 20));
        Change::new(ChangeKey::new(ObjectKey::new("s", name, view), "n/a"), "")
    }

    #[test]
    fn change_type_comes_from_first_change() {
        let command = ExecuteChangeCommand::deploy(vec![view_change("v1"), view_change("v2")]);
        assert_eq!(
            command.change_type().map(|t| t.name().to_string()),
            Some(ChangeType::VIEW.to_string())
        );
    }

    #[test]
    fn empty_command_has_no_change_type() {
        let command = ExecuteChangeCommand::undeploy(Vec::new());
        assert!(command.is_drop());
        assert!(command.change_type().is_none());
    }

    #[test]
    fn resolved_keys_are_replaced() {
        let mut command = ExecuteChangeCommand::from(view_change("v1"));
        let key = view_change("v0").key().clone();
        command.set_resolved_dependency_keys(BTreeSet::from([key.clone()]));
        assert!(command.resolved_dependency_keys().contains(&key));

        command.set_resolved_dependency_keys(BTreeSet::new());
        assert!(command.resolved_dependency_keys().is_empty());
    }
}
