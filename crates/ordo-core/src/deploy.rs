//! Deployment history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version label compared for executions that never recorded one.
pub const NO_VERSION_AVAILABLE: &str = "no-version-available";

/// One past deployment of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployExecution {
    /// Monotonic execution id.
    pub id: i64,
    /// Logical schema that was deployed.
    pub schema: String,
    /// Product version deployed, if it was recorded.
    #[serde(default)]
    pub product_version: Option<String>,
    /// True if this execution rolled the schema back to an earlier version.
    #[serde(default)]
    pub rollback: bool,
    /// When the deployment ran.
    #[serde(default)]
    pub deploy_time: Option<DateTime<Utc>>,
}

impl DeployExecution {
    /// Creates a forward deployment record.
    #[must_use]
    pub fn new(id: i64, schema: impl Into<String>, product_version: Option<&str>) -> Self {
        Self {
            id,
            schema: schema.into(),
            product_version: product_version.map(str::to_string),
            rollback: false,
            deploy_time: None,
        }
    }

    /// Marks the record as a rollback.
    #[must_use]
    pub fn as_rollback(mut self) -> Self {
        self.rollback = true;
        self
    }

    /// Sets the deploy time.
    #[must_use]
    pub fn with_deploy_time(mut self, deploy_time: DateTime<Utc>) -> Self {
        self.deploy_time = Some(deploy_time);
        self
    }

    /// Returns true if this execution was a rollback.
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        self.rollback
    }

    /// Version used for comparisons; a missing version compares as
    /// [`NO_VERSION_AVAILABLE`].
    #[must_use]
    pub fn effective_version(&self) -> &str {
        self.product_version.as_deref().unwrap_or(NO_VERSION_AVAILABLE)
    }
}
