//! # ordo-core
//!
//! Core abstractions for the ordo deployment orderer.
//!
//! This crate provides the types shared by every ordo component:
//!
//! - **Change Model**: [`Change`], its identity keys and code dependencies
//! - **Change Types**: platform metadata driving deploy order
//! - **Commands**: the [`ChangeCommand`] seam and its default implementation
//! - **Deploy History**: [`DeployExecution`] records for rollback detection
//! - **Platform Config**: name normalization and drop-order settings
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ordo_core::prelude::*;
//!
//! let table = Arc::new(ChangeType::new(ChangeType::TABLE, false, 10));
//! let key = ChangeKey::new(ObjectKey::new("sales", "orders", table), "init");
//! let change = Change::new(key, "create table orders (id int)")
//!     .with_declared_dependencies(["customers"]);
//! let command = ExecuteChangeCommand::deploy(vec![change]);
//! assert!(!command.is_drop());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod change;
pub mod change_type;
pub mod command;
pub mod config;
pub mod deploy;
pub mod error;
pub mod normalize;
pub mod observability;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use ordo_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::change::{
        Change, ChangeKey, CodeDependency, DEFAULT_CHANGE_ORDER, DependencyKind, ObjectKey,
    };
    pub use crate::change_type::{ChangeType, ChangeTypeCatalog};
    pub use crate::command::{ChangeCommand, ExecuteChangeCommand};
    pub use crate::config::PlatformConfig;
    pub use crate::deploy::{DeployExecution, NO_VERSION_AVAILABLE};
    pub use crate::error::{Error, Result};
    pub use crate::normalize::NameNormalizer;
}

// Re-export key types at crate root for ergonomics
pub use change::{Change, ChangeKey, CodeDependency, DEFAULT_CHANGE_ORDER, DependencyKind, ObjectKey};
pub use change_type::{ChangeType, ChangeTypeCatalog};
pub use command::{ChangeCommand, ExecuteChangeCommand};
pub use config::PlatformConfig;
pub use deploy::{DeployExecution, NO_VERSION_AVAILABLE};
pub use error::{Error, Result};
pub use normalize::NameNormalizer;
pub use observability::{LogFormat, init_logging};
