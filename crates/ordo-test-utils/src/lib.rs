//! Shared test utilities for ordo integration tests.
//!
//! This crate provides:
//! - Factory functions for changes, commands and deployment histories
//! - Ordering assertions over sorted command lists
//! - [`init_test_logging`] for tests that want to see engine logs
//!
//! # Example
//!
//! ```rust
//! use ordo_core::ChangeType;
//! use ordo_test_utils::{CommandFactory, assert_precedes};
//!
//! let commands = vec![
//!     CommandFactory::deploy(ChangeType::VIEW, "v_orders", "n/a", &[]),
//!     CommandFactory::deploy(ChangeType::VIEW, "v_totals", "n/a", &["v_orders"]),
//! ];
//! assert_precedes(&commands, "v_orders", "v_totals");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ordo_sort=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
