//! Per-sort handles on change commands.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ordo_core::{ChangeCommand, ChangeType};

use crate::error::{Error, Result};

/// A lightweight wrapper around one command of a sort call.
///
/// Keys are created fresh for every sort and refer to their command by its
/// position in the input. The `order` field is assigned by whichever
/// partition strategy handles the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    index: usize,
    change_type: Arc<ChangeType>,
    object_name: String,
    change_name: String,
    drop: bool,
    order: i64,
}

impl SortKey {
    /// Wraps the command found at `index` in the input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCommand`] if the command reports no change type.
    pub fn from_command<C>(index: usize, command: &C) -> Result<Self>
    where
        C: ChangeCommand + ?Sized,
    {
        let change_type = command.change_type().ok_or(Error::EmptyCommand { index })?;
        let first = command.changes().first();
        Ok(Self {
            index,
            change_type,
            object_name: first.map(|c| c.object_name().to_string()).unwrap_or_default(),
            change_name: first.map(|c| c.change_name().to_string()).unwrap_or_default(),
            drop: command.is_drop(),
            order: 0,
        })
    }

    /// Position of the wrapped command in the input.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Change type the command is sorted under.
    #[must_use]
    pub fn change_type(&self) -> &ChangeType {
        &self.change_type
    }

    /// Object name of the command's first change.
    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Change name of the command's first change.
    #[must_use]
    pub fn change_name(&self) -> &str {
        &self.change_name
    }

    /// True if the command drops its object.
    #[must_use]
    pub fn is_drop(&self) -> bool {
        self.drop
    }

    /// Order assigned during this sort.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    /// Sets the order.
    pub fn assign_order(&mut self, order: i64) {
        self.order = order;
    }

    /// Default tie-break: deploy priority, then object name, then change name.
    ///
    /// Input position settles anything left so the ordering is total.
    #[must_use]
    pub fn default_comparator(&self, other: &Self) -> Ordering {
        self.change_type
            .deploy_order_priority()
            .cmp(&other.change_type.deploy_order_priority())
            .then_with(|| self.object_name.cmp(&other.object_name))
            .then_with(|| self.change_name.cmp(&other.change_name))
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}[{}]#{}",
            self.object_name, self.change_name, self.change_type, self.index
        )
    }
}

/// Assigns `0..n` to the keys in their current order.
pub fn assign_positions(keys: &mut [SortKey]) {
    for (order, key) in (0_i64..).zip(keys.iter_mut()) {
        key.assign_order(order);
    }
}
