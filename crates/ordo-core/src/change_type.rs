//! Change type metadata supplied by the target platform.
//!
//! A [`ChangeType`] tells the orderer how objects of one category behave:
//! whether they are fully replaced on every deploy (rerunnable) or altered
//! incrementally, where they sit in the default deploy order, and whether
//! their text is worth scanning for references to other objects.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};

/// Category of database object with its ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeType {
    name: String,
    rerunnable: bool,
    deploy_order_priority: i32,
    dependency_scan: bool,
}

impl ChangeType {
    /// Tables; altered incrementally.
    pub const TABLE: &'static str = "TABLE";
    /// Reference data loaded after all schema objects.
    pub const STATICDATA: &'static str = "STATICDATA";
    /// Foreign keys; chained with their table's changes.
    pub const FOREIGN_KEY: &'static str = "FOREIGN_KEY";
    /// Legacy incremental trigger type, chained with its table's changes.
    pub const TRIGGER_INCREMENTAL: &'static str = "TRIGGER";
    /// Rerunnable triggers.
    pub const TRIGGER: &'static str = "TRIGGER2";
    /// Data migrations.
    pub const MIGRATION: &'static str = "MIGRATION";
    /// Views.
    pub const VIEW: &'static str = "VIEW";
    /// Stored procedures.
    pub const SP: &'static str = "SP";
    /// Functions.
    pub const FUNCTION: &'static str = "FUNCTION";
    /// Sequences.
    pub const SEQUENCE: &'static str = "SEQUENCE";
    /// Indexes.
    pub const INDEX: &'static str = "INDEX";
    /// User-defined types.
    pub const USERTYPE: &'static str = "USERTYPE";
    /// Rules.
    pub const RULE: &'static str = "RULE";
    /// Column defaults.
    pub const DEFAULT: &'static str = "DEFAULT";
    /// Packages.
    pub const PACKAGE: &'static str = "PACKAGE";
    /// Package bodies.
    pub const PACKAGE_BODY: &'static str = "PACKAGE_BODY";

    /// Creates a change type. Text dependency scanning is enabled by default.
    #[must_use]
    pub fn new(name: impl Into<String>, rerunnable: bool, deploy_order_priority: i32) -> Self {
        Self {
            name: name.into(),
            rerunnable,
            deploy_order_priority,
            dependency_scan: true,
        }
    }

    /// Enables or disables text dependency scanning for this type.
    #[must_use]
    pub fn with_dependency_scan(mut self, enabled: bool) -> Self {
        self.dependency_scan = enabled;
        self
    }

    /// Returns the type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if objects of this type are fully replaced on each deploy.
    #[must_use]
    pub fn is_rerunnable(&self) -> bool {
        self.rerunnable
    }

    /// Returns the default deploy-order priority; lower deploys first.
    #[must_use]
    pub fn deploy_order_priority(&self) -> i32 {
        self.deploy_order_priority
    }

    /// Returns true if object text of this type is scanned for dependencies.
    #[must_use]
    pub fn is_dependency_scan_enabled(&self) -> bool {
        self.dependency_scan
    }

    /// Returns true for the static-data type.
    #[must_use]
    pub fn is_static_data(&self) -> bool {
        self.name == Self::STATICDATA
    }

    /// Name used when grouping the changes of one object into a chain.
    ///
    /// Foreign keys and legacy incremental triggers belong to their table.
    #[must_use]
    pub fn object_group_name(&self) -> &str {
        match self.name.as_str() {
            Self::FOREIGN_KEY | Self::TRIGGER_INCREMENTAL => Self::TABLE,
            other => other,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Registry of the change types a platform supports, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ChangeTypeCatalog {
    types: BTreeMap<String, Arc<ChangeType>>,
}

impl ChangeTypeCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default change types of a relational platform.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for change_type in [
            ChangeType::new(ChangeType::SEQUENCE, true, 1),
            ChangeType::new(ChangeType::TABLE, false, 10),
            ChangeType::new(ChangeType::FUNCTION, true, 15),
            ChangeType::new(ChangeType::VIEW, true, 20),
            ChangeType::new(ChangeType::SP, true, 30),
            ChangeType::new(ChangeType::STATICDATA, true, 40).with_dependency_scan(false),
            ChangeType::new(ChangeType::MIGRATION, false, 41).with_dependency_scan(false),
            ChangeType::new(ChangeType::INDEX, false, 49),
            ChangeType::new(ChangeType::FOREIGN_KEY, false, 50),
            ChangeType::new(ChangeType::TRIGGER_INCREMENTAL, false, 51),
            ChangeType::new(ChangeType::TRIGGER, true, 52),
        ] {
            catalog.register(change_type);
        }
        catalog
    }

    /// Adds or replaces a change type, returning the shared handle.
    pub fn register(&mut self, change_type: ChangeType) -> Arc<ChangeType> {
        let change_type = Arc::new(change_type);
        self.types
            .insert(change_type.name().to_string(), Arc::clone(&change_type));
        change_type
    }

    /// Looks up a change type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ChangeType>> {
        self.types.get(name).cloned()
    }

    /// Looks up a change type by name, failing if it is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownChangeType`] if no type has that name.
    pub fn require(&self, name: &str) -> Result<Arc<ChangeType>> {
        self.get(name).ok_or_else(|| Error::unknown_change_type(name))
    }

    /// Iterates registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChangeType>> {
        self.types.values()
    }
}
