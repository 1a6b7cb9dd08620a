//! Discovery of dependencies from object definition text.

use std::collections::BTreeSet;

use ordo_core::{Change, CodeDependency, DependencyKind, NameNormalizer};
use tracing::trace;

use super::comment::{log_fallback, split_tokens, strip_comments};
use crate::metrics::SortMetrics;

/// An item whose code dependencies can be discovered from its text.
pub trait TextDependencyExtractable {
    /// Name other items use to refer to this one.
    fn object_name(&self) -> &str;

    /// Text scanned for references.
    fn content_for_dependency_calculation(&self) -> &str;

    /// Dependencies already known; `Some` means the item is not rescanned.
    fn code_dependencies(&self) -> Option<&BTreeSet<CodeDependency>>;

    /// Stores the calculated dependencies.
    fn set_code_dependencies(&mut self, dependencies: BTreeSet<CodeDependency>);

    /// Names always added to the discovered dependencies.
    fn include_dependencies(&self) -> &BTreeSet<String>;

    /// Names always removed from the discovered dependencies.
    fn exclude_dependencies(&self) -> &BTreeSet<String>;

    /// Whether this item's text is eligible for scanning.
    fn is_dependency_scan_enabled(&self) -> bool;
}

impl TextDependencyExtractable for Change {
    fn object_name(&self) -> &str {
        Change::object_name(self)
    }

    fn content_for_dependency_calculation(&self) -> &str {
        Change::content_for_dependency_calculation(self)
    }

    fn code_dependencies(&self) -> Option<&BTreeSet<CodeDependency>> {
        Change::code_dependencies(self)
    }

    fn set_code_dependencies(&mut self, dependencies: BTreeSet<CodeDependency>) {
        Change::set_code_dependencies(self, dependencies);
    }

    fn include_dependencies(&self) -> &BTreeSet<String> {
        Change::include_dependencies(self)
    }

    fn exclude_dependencies(&self) -> &BTreeSet<String> {
        Change::exclude_dependencies(self)
    }

    fn is_dependency_scan_enabled(&self) -> bool {
        self.change_type().is_dependency_scan_enabled()
    }
}

/// Finds references to other objects of the same batch in object text.
#[derive(Debug, Clone, Default)]
pub struct TextDependencyExtractor {
    normalizer: NameNormalizer,
    metrics: SortMetrics,
}

impl TextDependencyExtractor {
    /// Creates an extractor comparing names through `normalizer`.
    #[must_use]
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self {
            normalizer,
            metrics: SortMetrics::new(),
        }
    }

    /// Calculates the code dependencies of every eligible item in the batch.
    ///
    /// Only names of objects in the batch are recognized. Items that already
    /// have code dependencies, or whose type is not scanned, are left as they
    /// are. Returns the number of items that were enriched.
    pub fn calculate_dependencies<'a, T, I>(&self, items: I) -> usize
    where
        T: TextDependencyExtractable + ?Sized + 'a,
        I: IntoIterator<Item = &'a mut T>,
    {
        let mut items: Vec<&'a mut T> = items.into_iter().collect();
        let universe: BTreeSet<String> = items
            .iter()
            .map(|item| self.normalizer.normalize(item.object_name()))
            .collect();

        let mut enriched = 0;
        for item in &mut items {
            if item.code_dependencies().is_some() || !item.is_dependency_scan_enabled() {
                continue;
            }

            let object_name = item.object_name();
            let own_name = self.normalizer.normalize(object_name);
            let excluded: BTreeSet<String> = item
                .exclude_dependencies()
                .iter()
                .map(|name| self.normalizer.normalize(name))
                .collect();
            let mut dependencies: BTreeSet<CodeDependency> = self
                .discover_names(
                    object_name,
                    item.content_for_dependency_calculation(),
                    &universe,
                )
                .into_iter()
                .filter(|name| *name != own_name && !excluded.contains(name))
                .map(|name| CodeDependency::new(name, DependencyKind::Discovered))
                .collect();
            dependencies.extend(
                item.include_dependencies()
                    .iter()
                    .map(|name| CodeDependency::new(name.clone(), DependencyKind::Explicit)),
            );

            trace!(
                object = object_name,
                dependencies = dependencies.len(),
                "calculated text dependencies"
            );
            item.set_code_dependencies(dependencies);
            enriched += 1;
        }
        enriched
    }

    /// Returns the normalized words of `content` that are in `names`.
    ///
    /// `names` must already be normalized. Comments are ignored. `label` tags
    /// the warning logged if the text cannot be scanned.
    #[must_use]
    pub fn discover_names(
        &self,
        label: &str,
        content: &str,
        names: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        let stripped = strip_comments(content).unwrap_or_else(|error| {
            log_fallback(label, &error);
            self.metrics.record_comment_fallback();
            content.to_string()
        });
        split_tokens(&stripped)
            .map(|word| self.normalizer.normalize(word))
            .filter(|word| names.contains(word))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordo_core::{ChangeKey, ChangeType, ObjectKey};
    use std::sync::Arc;

    fn sp(schema: &str, name: &str, content: &str) -> Change {
        let sp = Arc::new(ChangeType::new(ChangeType::SP, true, 30));
        Change::new(ChangeKey::new(ObjectKey::new(schema, name, sp), "n/a"), content)
    }

    fn deps(change: &Change) -> BTreeSet<CodeDependency> {
        change.code_dependencies().cloned().unwrap_or_default()
    }

    fn discovered(name: &str) -> CodeDependency {
        CodeDependency::new(name, DependencyKind::Discovered)
    }

    #[test]
    fn calculates_dependencies_within_batch() {
        let mut batch = vec![
            sp("schema1", "sp1", "sp1 sp2('a')")
                .with_include_dependencies(["manuallyAddedDependency"]),
            sp("schema1", "sp2", "sp2"),
            sp("schema1", "sp#", "sp# sp1 ('a')sp2('a')"),
            sp("schema1", "spA", "spA sp1('a') ('a')sp2('a') sp#")
                .with_exclude_dependencies(["sp1", "sp2"]),
        ];

        let enriched = TextDependencyExtractor::default().calculate_dependencies(batch.iter_mut());

        assert_eq!(enriched, 4);
        assert_eq!(
            deps(&batch[0]),
            BTreeSet::from([
                discovered("sp2"),
                CodeDependency::new("manuallyAddedDependency", DependencyKind::Explicit),
            ])
        );
        assert!(deps(&batch[1]).is_empty());
        assert_eq!(deps(&batch[2]), BTreeSet::from([discovered("sp1"), discovered("sp2")]));
        assert_eq!(deps(&batch[3]), BTreeSet::from([discovered("sp#")]));
    }

    #[test]
    fn names_match_across_schemas() {
        let mut batch = vec![
            sp("schema1", "sp1", "sp1 sp2"),
            sp("schema2", "sp2", "sp2"),
            sp("schema1", "sp3", "sp3 sp1 sp2"),
            sp("schema2", "spA", "spA sp1 sp2 sp3").with_exclude_dependencies(["sp1", "sp2"]),
        ];

        TextDependencyExtractor::default().calculate_dependencies(batch.iter_mut());

        assert_eq!(deps(&batch[0]), BTreeSet::from([discovered("sp2")]));
        assert_eq!(deps(&batch[2]), BTreeSet::from([discovered("sp1"), discovered("sp2")]));
        assert_eq!(deps(&batch[3]), BTreeSet::from([discovered("sp3")]));
    }

    #[test]
    fn preset_dependencies_are_not_rescanned() {
        let mut batch = vec![
            sp("schema1", "sp1", "sp1 sp2").with_declared_dependencies(["other"]),
            sp("schema1", "sp2", "sp2"),
        ];

        TextDependencyExtractor::default().calculate_dependencies(batch.iter_mut());

        assert_eq!(
            deps(&batch[0]),
            BTreeSet::from([CodeDependency::new("other", DependencyKind::Explicit)])
        );
    }

    #[test]
    fn unscanned_types_are_left_unset() {
        let data = Arc::new(
            ChangeType::new(ChangeType::STATICDATA, true, 40).with_dependency_scan(false),
        );
        let mut batch = vec![
            Change::new(ChangeKey::new(ObjectKey::new("s", "ref", data), "n/a"), "sp1"),
            sp("s", "sp1", "sp1"),
        ];

        TextDependencyExtractor::default().calculate_dependencies(batch.iter_mut());

        assert!(batch[0].code_dependencies().is_none());
        assert!(batch[1].code_dependencies().is_some());
    }

    #[test]
    fn self_reference_is_removed_after_folding() {
        let extractor = TextDependencyExtractor::new(NameNormalizer::UpperCase);
        let mut batch = vec![sp("s", "Orders", "create table ORDERS (x int)")];

        extractor.calculate_dependencies(batch.iter_mut());

        assert!(deps(&batch[0]).is_empty());
    }

    #[test]
    fn folded_names_collapse_and_honour_exclusions() {
        let extractor = TextDependencyExtractor::new(NameNormalizer::UpperCase);
        let mut batch = vec![
            sp("s", "SP1", "call sp2; call SP2; call sp3").with_exclude_dependencies(["SP3"]),
            sp("s", "sp2", ""),
            sp("s", "sp3", ""),
        ];

        extractor.calculate_dependencies(batch.iter_mut());

        assert_eq!(deps(&batch[0]), BTreeSet::from([discovered("SP2")]));
    }

    #[test]
    fn exclusions_are_folded_like_names() {
        let extractor = TextDependencyExtractor::new(NameNormalizer::UpperCase);
        let mut batch = vec![
            sp("s", "sp1", "call SP2 sp3").with_exclude_dependencies(["sp2"]),
            sp("s", "sp2", ""),
            sp("s", "sp3", ""),
        ];

        extractor.calculate_dependencies(batch.iter_mut());

        assert_eq!(deps(&batch[0]), BTreeSet::from([discovered("SP3")]));
    }

    #[test]
    fn case_sensitive_names_are_distinct_objects() {
        let mut batch = vec![
            sp("s", "t", "select * from T"),
            sp("s", "T", "select 1"),
        ];

        TextDependencyExtractor::default().calculate_dependencies(batch.iter_mut());

        assert_eq!(deps(&batch[0]), BTreeSet::from([discovered("T")]));
        assert!(deps(&batch[1]).is_empty());
    }

    #[test]
    fn discover_names_ignores_comments() {
        let names = BTreeSet::from(
            ["sp1", "sp2", "sp_3", "sp4", "sp5"].map(str::to_string),
        );
        let found = TextDependencyExtractor::default().discover_names(
            "test1",
            "create procedure sp1\n\
             // Comment sp2\n\
             -- Comment sp2\n\
             call sp_3(1234)  -- end of line comment sp5\n\
             /* Comment sp5 */\n\
             /* Comment\n\
             sp5\n\
             \n\
             sp5 */\n\
             call sp4(1234)\n\
             end\n",
            &names,
        );
        assert_eq!(found, BTreeSet::from(["sp1", "sp_3", "sp4"].map(str::to_string)));
    }

    #[test]
    fn discover_names_does_not_match_prefixes() {
        let names = BTreeSet::from(["sp1", "obj1"].map(str::to_string));
        let found = TextDependencyExtractor::default().discover_names(
            "testPrefix",
            "create procedure sp1\nobj1\nobj1_prefix1\nobj1_prefix1_prefix2\n",
            &names,
        );
        assert_eq!(found, names);
    }
}
