//! Custom assertion helpers for integration tests.
//!
//! Commands are identified by the object name of their first change, or by
//! `object.change` when an object has several commands.

use ordo_core::ChangeCommand;

/// Returns `object.change` for the first change of a command.
pub fn label<C: ChangeCommand>(command: &C) -> String {
    command
        .changes()
        .first()
        .map(|change| format!("{}.{}", change.object_name(), change.change_name()))
        .unwrap_or_default()
}

/// Returns the position of the command identified by `name`.
///
/// # Panics
///
/// Panics if no command matches.
pub fn position_of<C: ChangeCommand>(commands: &[C], name: &str) -> usize {
    commands
        .iter()
        .position(|command| {
            command.changes().first().is_some_and(|change| change.object_name() == name)
                || label(command) == name
        })
        .unwrap_or_else(|| panic!("no command named {name} in {:?}", labels(commands)))
}

/// Returns the labels of all commands, in order.
pub fn labels<C: ChangeCommand>(commands: &[C]) -> Vec<String> {
    commands.iter().map(label).collect()
}

/// Asserts that `first` comes before `second`.
///
/// # Panics
///
/// Panics if either command is missing or the order is wrong.
pub fn assert_precedes<C: ChangeCommand>(commands: &[C], first: &str, second: &str) {
    let first_pos = position_of(commands, first);
    let second_pos = position_of(commands, second);
    assert!(
        first_pos < second_pos,
        "Expected {first} before {second}, but order was {:?}",
        labels(commands)
    );
}

/// Partition rank of a command: drops, then adds, then static data.
pub fn partition_rank<C: ChangeCommand>(command: &C) -> u8 {
    let static_data = command
        .change_type()
        .is_some_and(|change_type| change_type.is_static_data());
    match (static_data, command.is_drop()) {
        (true, _) => 2,
        (false, true) => 0,
        (false, false) => 1,
    }
}

/// Asserts that drops precede adds and adds precede static data.
///
/// # Panics
///
/// Panics if the partitions are interleaved.
pub fn assert_partition_order<C: ChangeCommand>(commands: &[C]) {
    let ranks: Vec<u8> = commands.iter().map(partition_rank).collect();
    assert!(
        ranks.windows(2).all(|pair| pair[0] <= pair[1]),
        "Expected drops, adds, static data; got ranks {ranks:?} for {:?}",
        labels(commands)
    );
}

/// Asserts that every in-batch declared or discovered dependency of an add
/// command is placed before it.
///
/// Dependencies are matched by object name within the same schema.
///
/// # Panics
///
/// Panics if a dependency follows its dependent.
pub fn assert_dependencies_respected<C: ChangeCommand>(commands: &[C]) {
    for (position, command) in commands.iter().enumerate() {
        if command.is_drop() {
            continue;
        }
        for change in command.changes() {
            for dependency in change.code_dependencies().into_iter().flatten() {
                let provider = commands.iter().position(|other| {
                    other.changes().iter().any(|c| {
                        c.schema() == change.schema() && c.object_name() == dependency.target
                    })
                });
                if let Some(provider) = provider {
                    assert!(
                        provider <= position,
                        "{} depends on {} but runs first: {:?}",
                        label(command),
                        dependency.target,
                        labels(commands)
                    );
                }
            }
        }
    }
}
