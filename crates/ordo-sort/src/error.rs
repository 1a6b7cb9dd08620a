//! Error types for the ordering engine.

/// The result type used throughout ordo-sort.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ordering changes or reading deploy history.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A rollback execution names a version that is not active.
    ///
    /// The deployment history is corrupt or incomplete; ordering must stop.
    #[error(
        "found a rollback deployment without the corresponding version: \
         execution {execution_id} rolled back to '{version}'"
    )]
    InconsistentDeployHistory {
        /// Id of the offending rollback execution.
        execution_id: i64,
        /// Version the execution claims to roll back to.
        version: String,
    },

    /// Some schemas would roll back while others would deploy forward.
    #[error(
        "schemas {rollback_schemas:?} were calculated for rollback, though \
         {forward_schemas:?} were not; cannot proceed in this mixed mode"
    )]
    MixedRollbackState {
        /// Schemas whose history makes this deploy a rollback.
        rollback_schemas: Vec<String>,
        /// Schemas whose history makes this deploy a forward deploy.
        forward_schemas: Vec<String>,
    },

    /// A command has no changes and no change type to sort it by.
    #[error("change command at position {index} has no changes")]
    EmptyCommand {
        /// Position of the command in the input.
        index: usize,
    },

    /// A live object definition could not be read.
    #[error("failed to read the definition of {object}: {message}")]
    DefinitionLookup {
        /// The object whose definition was requested.
        object: String,
        /// Description of the failure.
        message: String,
    },

    /// A graph node was not found (internal graph operation error).
    #[error("graph node not found: {node}")]
    GraphNodeNotFound {
        /// The node identifier.
        node: String,
    },

    /// An error from the shared model.
    #[error(transparent)]
    Core(#[from] ordo_core::Error),
}

impl Error {
    /// Creates a definition lookup error.
    #[must_use]
    pub fn definition_lookup(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DefinitionLookup {
            object: object.into(),
            message: message.into(),
        }
    }
}
