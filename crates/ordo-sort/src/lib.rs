//! # ordo-sort
//!
//! Ordering engine for database change deployments.
//!
//! This crate decides the order in which already-identified changes run,
//! providing:
//!
//! - **Text Analysis**: Comment stripping and discovery of the objects a
//!   definition refers to
//! - **Dependency Graphs**: Name resolution of declared and discovered
//!   dependencies within one batch
//! - **Cycle-Tolerant Sorting**: Topological order over strongly connected
//!   components with a deterministic tie-break
//! - **Command Sorting**: Drop, add and static-data partitions, each with its
//!   own strategy
//! - **Rollback Detection**: Replay of deployment history to tell rollbacks
//!   from forward deployments
//!
//! ## Guarantees
//!
//! - **Deterministic**: Same inputs always produce the same order
//! - **Total**: Cycles never fail a sort; their members stay adjacent
//! - **Batch-Local**: Names that resolve outside the batch are ignored
//!
//! ## Example
//!
//! ```rust
//! use ordo_core::prelude::*;
//! use ordo_sort::{ChangeCommandSorter, RollbackDetector};
//!
//! # fn main() -> ordo_sort::Result<()> {
//! let catalog = ChangeTypeCatalog::standard();
//! let table = catalog.require(ChangeType::TABLE)?;
//! let view = catalog.require(ChangeType::VIEW)?;
//!
//! let orders = Change::new(
//!     ChangeKey::new(ObjectKey::new("sales", "orders", table), "init"),
//!     "create table orders (id int)",
//! );
//! let totals = Change::new(
//!     ChangeKey::new(ObjectKey::new("sales", "v_totals", view), "n/a"),
//!     "create view v_totals as select count(*) from orders",
//! );
//!
//! let history = vec![
//!     DeployExecution::new(1, "sales", Some("1.0")),
//!     DeployExecution::new(2, "sales", Some("1.1")),
//! ];
//! let rollback = RollbackDetector::new().determine_rollback("1.2", &history)?;
//!
//! let commands = vec![
//!     ExecuteChangeCommand::deploy(vec![totals]),
//!     ExecuteChangeCommand::deploy(vec![orders]),
//! ];
//! let sorted = ChangeCommandSorter::new(PlatformConfig::default()).sort(commands, rollback)?;
//! assert_eq!(sorted[0].changes()[0].object_name(), "orders");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command_sorter;
pub mod dag;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod rollback;
pub mod sort_key;
pub mod sorter;
pub mod text;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::command_sorter::{ChangeCommandSorter, DefinitionSource, NoDefinitions};
    pub use crate::dag::DependencyGraph;
    pub use crate::error::{Error, Result};
    pub use crate::graph::GraphBuilder;
    pub use crate::metrics::SortMetrics;
    pub use crate::rollback::{DeployExecutionSource, RollbackDetector};
    pub use crate::sort_key::SortKey;
    pub use crate::sorter::GroupSorter;
    pub use crate::text::{TextDependencyExtractable, TextDependencyExtractor, remove_comments};
}

pub use command_sorter::{ChangeCommandSorter, DefinitionSource, NoDefinitions};
pub use error::{Error, Result};
pub use rollback::{DeployExecutionSource, RollbackDetector};
pub use text::{TextDependencyExtractor, remove_comments, split_tokens};
