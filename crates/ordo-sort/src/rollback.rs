//! Rollback detection from deployment history.
//!
//! A schema's history is replayed in id order. Forward deployments stack up;
//! a rollback unwinds the stack down to the deployment of the version it
//! returns to and takes that deployment's place. What remains on the stack
//! are the *active* deployments. Deploying a version that is active but not
//! the latest is a rollback.

use ordo_core::DeployExecution;
use ordo_core::observability::history_span;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::metrics::SortMetrics;

/// Supplies the deployment history of a schema.
pub trait DeployExecutionSource {
    /// Returns every recorded execution for `schema`, in any order.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be read.
    fn deploy_executions(&self, schema: &str) -> Result<Vec<DeployExecution>>;
}

impl DeployExecutionSource for [DeployExecution] {
    fn deploy_executions(&self, schema: &str) -> Result<Vec<DeployExecution>> {
        Ok(self
            .iter()
            .filter(|execution| execution.schema == schema)
            .cloned()
            .collect())
    }
}

impl DeployExecutionSource for Vec<DeployExecution> {
    fn deploy_executions(&self, schema: &str) -> Result<Vec<DeployExecution>> {
        self.as_slice().deploy_executions(schema)
    }
}

/// Decides whether a deployment rolls a schema back.
#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackDetector {
    metrics: SortMetrics,
}

impl RollbackDetector {
    /// Creates a detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ids of the deployments still in effect, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentDeployHistory`] if a rollback returns to
    /// a version that is not active.
    pub fn active_deployments(&self, executions: &[DeployExecution]) -> Result<Vec<i64>> {
        Ok(active(executions)?.iter().map(|execution| execution.id).collect())
    }

    /// Returns true if deploying `candidate` rolls the schema back.
    ///
    /// That is the case when `candidate` is the version of an active
    /// deployment other than the latest one. New versions and redeploys of
    /// the latest version are forward deployments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InconsistentDeployHistory`] if the history is
    /// inconsistent.
    pub fn determine_rollback(&self, candidate: &str, executions: &[DeployExecution]) -> Result<bool> {
        log_executions(executions.iter(), "deploy executions");
        let active = active(executions)?;
        log_executions(active.iter().copied(), "active deploy executions");

        let rollback = match active.split_last() {
            None => false,
            Some((latest, _)) if latest.effective_version() == candidate => false,
            Some((_, earlier)) => earlier
                .iter()
                .any(|execution| execution.effective_version() == candidate),
        };

        self.metrics.record_rollback_detection(rollback);
        Ok(rollback)
    }

    /// Returns true if deploying `candidate` rolls back every schema.
    ///
    /// An empty schema set is not a rollback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MixedRollbackState`] if some schemas would roll back
    /// and others would not, or any error raised while reading or replaying
    /// a schema's history.
    pub fn determine_rollback_across_schemas<I, S, E>(
        &self,
        candidate: &str,
        schemas: I,
        source: &E,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        E: DeployExecutionSource + ?Sized,
    {
        let mut rollback_schemas = Vec::new();
        let mut forward_schemas = Vec::new();

        for schema in schemas {
            let schema = schema.as_ref();
            let _span = history_span(schema, candidate).entered();
            info!(candidate, schema, "checking rollback status");

            let history = source.deploy_executions(schema)?;
            if self.determine_rollback(candidate, &history)? {
                rollback_schemas.push(schema.to_string());
            } else {
                forward_schemas.push(schema.to_string());
            }
        }

        match (rollback_schemas.is_empty(), forward_schemas.is_empty()) {
            (true, _) => Ok(false),
            (false, true) => Ok(true),
            (false, false) => Err(Error::MixedRollbackState {
                rollback_schemas,
                forward_schemas,
            }),
        }
    }
}

fn active(executions: &[DeployExecution]) -> Result<Vec<&DeployExecution>> {
    let mut sorted: Vec<&DeployExecution> = executions.iter().collect();
    sorted.sort_by_key(|execution| execution.id);

    let mut stack: Vec<&DeployExecution> = Vec::with_capacity(sorted.len());
    for execution in sorted {
        if execution.is_rollback() {
            loop {
                let previous = stack.pop().ok_or_else(|| Error::InconsistentDeployHistory {
                    execution_id: execution.id,
                    version: execution.effective_version().to_string(),
                })?;
                if previous.effective_version() == execution.effective_version() {
                    break;
                }
            }
        }
        stack.push(execution);
    }
    Ok(stack)
}

fn log_executions<'a>(executions: impl ExactSizeIterator<Item = &'a DeployExecution>, label: &str) {
    info!(count = executions.len(), "found {label} for this schema");
    for execution in executions {
        debug!(
            id = execution.id,
            version = execution.effective_version(),
            deploy_time = ?execution.deploy_time,
            rollback = execution.rollback,
            "deploy execution"
        );
    }
}
