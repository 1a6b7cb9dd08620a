//! Pre-built test fixtures for common test scenarios.
//!
//! Provides factory functions to create test data with sensible defaults.
//! Changes live in [`TEST_SCHEMA`] unless a schema is given, and their types
//! come from the standard catalog.

use std::sync::Arc;

use ordo_core::{
    Change, ChangeKey, ChangeType, ChangeTypeCatalog, DeployExecution, ExecuteChangeCommand,
    ObjectKey,
};

/// Schema used by fixtures that do not name one.
pub const TEST_SCHEMA: &str = "schema";

/// Returns a standard-catalog change type.
///
/// # Panics
///
/// Panics if the standard catalog has no type with that name.
pub fn change_type(name: &str) -> Arc<ChangeType> {
    ChangeTypeCatalog::standard()
        .require(name)
        .expect("change type in the standard catalog")
}

/// Creates a change in [`TEST_SCHEMA`] with empty content.
pub fn change(type_name: &str, object: &str, change_name: &str) -> Change {
    change_in(TEST_SCHEMA, type_name, object, change_name)
}

/// Creates a change in `schema` with empty content.
pub fn change_in(schema: &str, type_name: &str, object: &str, change_name: &str) -> Change {
    Change::new(
        ChangeKey::new(ObjectKey::new(schema, object, change_type(type_name)), change_name),
        "",
    )
}

/// Factory for change commands.
pub struct CommandFactory;

impl CommandFactory {
    /// A deploy command with declared dependencies; its text is never scanned.
    pub fn deploy(
        type_name: &str,
        object: &str,
        change_name: &str,
        dependencies: &[&str],
    ) -> ExecuteChangeCommand {
        ExecuteChangeCommand::deploy(vec![
            change(type_name, object, change_name)
                .with_declared_dependencies(dependencies.iter().copied()),
        ])
    }

    /// A deploy command for one step of an incremental object's history.
    pub fn incremental(
        type_name: &str,
        object: &str,
        change_name: &str,
        order_within_object: i32,
        dependencies: &[&str],
    ) -> ExecuteChangeCommand {
        ExecuteChangeCommand::deploy(vec![
            change(type_name, object, change_name)
                .with_order_within_object(order_within_object)
                .with_declared_dependencies(dependencies.iter().copied()),
        ])
    }

    /// A deploy command whose dependencies are discovered from `content`.
    pub fn scanned(type_name: &str, object: &str, content: &str) -> ExecuteChangeCommand {
        let mut change = change(type_name, object, "n/a");
        change.set_content(content);
        ExecuteChangeCommand::deploy(vec![change])
    }

    /// A command dropping `object`.
    pub fn drop(type_name: &str, object: &str) -> ExecuteChangeCommand {
        ExecuteChangeCommand::undeploy(vec![change(type_name, object, "n/a")])
    }

    /// A static-data command with the given legacy order.
    pub fn static_data(object: &str, order: i32) -> ExecuteChangeCommand {
        ExecuteChangeCommand::deploy(vec![
            change(ChangeType::STATICDATA, object, "n/a").with_order(order),
        ])
    }

    /// A static-data command bundling several changes of `object`.
    pub fn static_data_bundle(object: &str, orders: &[i32]) -> ExecuteChangeCommand {
        ExecuteChangeCommand::deploy(
            orders
                .iter()
                .enumerate()
                .map(|(i, &order)| {
                    change(ChangeType::STATICDATA, object, &format!("part{i}")).with_order(order)
                })
                .collect(),
        )
    }
}

/// Factory for deployment histories.
pub struct HistoryFactory;

impl HistoryFactory {
    /// Forward deployments of [`TEST_SCHEMA`], one per `(id, version)` pair.
    pub fn forward(entries: &[(i64, Option<&str>)]) -> Vec<DeployExecution> {
        entries
            .iter()
            .map(|&(id, version)| DeployExecution::new(id, TEST_SCHEMA, version))
            .collect()
    }

    /// A rollback of [`TEST_SCHEMA`] to `version`.
    pub fn rollback(id: i64, version: Option<&str>) -> DeployExecution {
        DeployExecution::new(id, TEST_SCHEMA, version).as_rollback()
    }

    /// Parses a history stored as a JSON array.
    ///
    /// # Panics
    ///
    /// Panics if the JSON is not a valid history.
    pub fn from_json(json: &str) -> Vec<DeployExecution> {
        serde_json::from_str(json).expect("valid deploy execution history")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordo_core::ChangeCommand;

    #[test]
    fn deploy_command_declares_dependencies() {
        let command = CommandFactory::deploy(ChangeType::VIEW, "v1", "n/a", &["v2"]);
        let deps = command.changes()[0].code_dependencies().cloned().unwrap_or_default();
        assert_eq!(deps.len(), 1);
        assert!(!command.is_drop());
    }

    #[test]
    fn scanned_command_has_no_dependencies_yet() {
        let command = CommandFactory::scanned(ChangeType::SP, "sp1", "call sp2");
        assert!(command.changes()[0].code_dependencies().is_none());
        assert_eq!(command.changes()[0].content(), "call sp2");
    }

    #[test]
    fn history_from_json() {
        let history = HistoryFactory::from_json(
            r#"[{"id": 1, "schema": "schema", "productVersion": "a"},
                {"id": 2, "schema": "schema", "productVersion": "a", "rollback": true}]"#,
        );
        assert_eq!(history.len(), 2);
        assert!(history[1].is_rollback());
    }
}
