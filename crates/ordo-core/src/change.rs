//! The change model: one versioned definition unit of a database object.
//!
//! A [`Change`] is identified by its [`ChangeKey`] (schema, change type,
//! object name and change name). Besides its content it carries the
//! dependency information the orderer works with:
//!
//! - **Code dependencies**: names this change depends on, either declared up
//!   front or discovered by scanning the content. Written once; a change whose
//!   code dependencies are already set is never rescanned.
//! - **Include / exclude sets**: explicit corrections applied on top of a scan.
//! - **Order within object**: position of an incremental change in its
//!   object's history.
//! - **Legacy order**: fallback ordering for static data.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::change_type::ChangeType;

/// Legacy order used when a change does not specify one.
pub const DEFAULT_CHANGE_ORDER: i32 = 500;

/// Identifies a database object of a given type within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Logical schema holding the object.
    pub schema: String,
    /// Object name as written in the source files.
    pub object_name: String,
    /// Category of the object.
    pub change_type: Arc<ChangeType>,
}

impl ObjectKey {
    /// Creates an object key.
    #[must_use]
    pub fn new(
        schema: impl Into<String>,
        object_name: impl Into<String>,
        change_type: Arc<ChangeType>,
    ) -> Self {
        Self {
            schema: schema.into(),
            object_name: object_name.into(),
            change_type,
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}[{}]", self.schema, self.object_name, self.change_type)
    }
}

/// Identifies one change of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChangeKey {
    /// The object this change belongs to.
    pub object_key: ObjectKey,
    /// Name of the change within the object.
    pub change_name: String,
}

impl ChangeKey {
    /// Creates a change key.
    #[must_use]
    pub fn new(object_key: ObjectKey, change_name: impl Into<String>) -> Self {
        Self {
            object_key,
            change_name: change_name.into(),
        }
    }
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}[{}]",
            self.object_key.schema,
            self.object_key.object_name,
            self.change_name,
            self.object_key.change_type
        )
    }
}

/// How a dependency became known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyKind {
    /// Found by scanning the change's text.
    Discovered,
    /// Declared by the author, or added through an include set.
    Explicit,
    /// Implied by the order of changes within one object.
    Implicit,
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovered => "discovered",
            Self::Explicit => "explicit",
            Self::Implicit => "implicit",
        })
    }
}

/// A named dependency of a change.
///
/// The target is resolved against the batch being deployed: `object`,
/// `schema.object`, `object.change` or `schema.object.change`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeDependency {
    /// Name of the depended-upon object or change.
    pub target: String,
    /// Provenance of the dependency.
    pub kind: DependencyKind,
}

impl CodeDependency {
    /// Creates a dependency on `target`.
    #[must_use]
    pub fn new(target: impl Into<String>, kind: DependencyKind) -> Self {
        Self {
            target: target.into(),
            kind,
        }
    }
}

/// One object's versioned definition unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    key: ChangeKey,
    content: String,
    dependency_content: Option<String>,
    code_dependencies: Option<BTreeSet<CodeDependency>>,
    include_dependencies: BTreeSet<String>,
    exclude_dependencies: BTreeSet<String>,
    order_within_object: i32,
    order: i32,
}

impl Change {
    /// Creates a change with the given identity and content.
    #[must_use]
    pub fn new(key: ChangeKey, content: impl Into<String>) -> Self {
        Self {
            key,
            content: content.into(),
            dependency_content: None,
            code_dependencies: None,
            include_dependencies: BTreeSet::new(),
            exclude_dependencies: BTreeSet::new(),
            order_within_object: 0,
            order: DEFAULT_CHANGE_ORDER,
        }
    }

    /// Sets the position of this change in its object's history.
    #[must_use]
    pub fn with_order_within_object(mut self, order_within_object: i32) -> Self {
        self.order_within_object = order_within_object;
        self
    }

    /// Sets the legacy order used to sequence static data.
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Declares dependencies up front; the change will not be scanned.
    #[must_use]
    pub fn with_declared_dependencies<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.code_dependencies = Some(
            targets
                .into_iter()
                .map(|target| CodeDependency::new(target, DependencyKind::Explicit))
                .collect(),
        );
        self
    }

    /// Names always added to the scanned dependencies.
    #[must_use]
    pub fn with_include_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Names always removed from the scanned dependencies.
    #[must_use]
    pub fn with_exclude_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the text scanned for dependencies (defaults to the content).
    #[must_use]
    pub fn with_dependency_content(mut self, content: impl Into<String>) -> Self {
        self.dependency_content = Some(content.into());
        self
    }

    /// Returns the change key.
    #[must_use]
    pub fn key(&self) -> &ChangeKey {
        &self.key
    }

    /// Returns the object key.
    #[must_use]
    pub fn object_key(&self) -> &ObjectKey {
        &self.key.object_key
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.key.object_key.schema
    }

    /// Returns the object name.
    #[must_use]
    pub fn object_name(&self) -> &str {
        &self.key.object_key.object_name
    }

    /// Returns the change name.
    #[must_use]
    pub fn change_name(&self) -> &str {
        &self.key.change_name
    }

    /// Returns the change type.
    #[must_use]
    pub fn change_type(&self) -> &Arc<ChangeType> {
        &self.key.object_key.change_type
    }

    /// Returns the raw content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replaces the content, dropping any dependency-content override.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.dependency_content = None;
    }

    /// Returns the text to scan for dependencies.
    #[must_use]
    pub fn content_for_dependency_calculation(&self) -> &str {
        self.dependency_content.as_deref().unwrap_or(&self.content)
    }

    /// Returns the code dependencies, or `None` if not yet calculated.
    #[must_use]
    pub fn code_dependencies(&self) -> Option<&BTreeSet<CodeDependency>> {
        self.code_dependencies.as_ref()
    }

    /// Sets the code dependencies.
    pub fn set_code_dependencies(&mut self, dependencies: BTreeSet<CodeDependency>) {
        self.code_dependencies = Some(dependencies);
    }

    /// Returns the names always added to scanned dependencies.
    #[must_use]
    pub fn include_dependencies(&self) -> &BTreeSet<String> {
        &self.include_dependencies
    }

    /// Returns the names always removed from scanned dependencies.
    #[must_use]
    pub fn exclude_dependencies(&self) -> &BTreeSet<String> {
        &self.exclude_dependencies
    }

    /// Returns the position of this change in its object's history.
    #[must_use]
    pub fn order_within_object(&self) -> i32 {
        self.order_within_object
    }

    /// Returns the legacy order.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<ChangeType> {
        Arc::new(ChangeType::new(ChangeType::TABLE, false, 10))
    }

    fn key(object: &str, change: &str) -> ChangeKey {
        ChangeKey::new(ObjectKey::new("schema1", object, table()), change)
    }

    #[test]
    fn new_change_has_no_code_dependencies() {
        let change = Change::new(key("orders", "init"), "create table orders (id int)");
        assert!(change.code_dependencies().is_none());
        assert_eq!(change.order(), DEFAULT_CHANGE_ORDER);
        assert_eq!(change.order_within_object(), 0);
    }

    #[test]
    fn declared_dependencies_are_explicit() {
        let change = Change::new(key("orders", "fk"), "")
            .with_declared_dependencies(["customers", "schema2.regions"]);
        let deps = change.code_dependencies().cloned().unwrap_or_default();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.kind == DependencyKind::Explicit));
    }

    #[test]
    fn dependency_content_overrides_content_until_replaced() {
        let mut change =
            Change::new(key("ref", "data"), "1,2,3").with_dependency_content("orders customers");
        assert_eq!(change.content_for_dependency_calculation(), "orders customers");

        change.set_content("create view v as select 1");
        assert_eq!(
            change.content_for_dependency_calculation(),
            "create view v as select 1"
        );
    }

    #[test]
    fn new_content_keeps_code_dependencies() {
        let mut change = Change::new(key("orders", "init"), "").with_declared_dependencies(["x"]);
        change.set_content("create table orders (x int)");
        assert_eq!(change.code_dependencies().map(BTreeSet::len), Some(1));
    }

    #[test]
    fn change_key_display_includes_type() {
        assert_eq!(key("orders", "init").to_string(), "schema1.orders.init[TABLE]");
    }
}
