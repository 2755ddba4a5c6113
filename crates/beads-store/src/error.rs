//! Storage error types.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g., "issue", "dependency").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The entity already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists {
        /// The kind of entity.
        entity: String,
        /// The conflicting identifier.
        id: String,
    },

    /// A validation constraint was violated.
    #[error("validation error on {field}: {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// Description of the validation failure.
        message: String,
    },

    /// Adding a dependency would create a cycle in the blocking graph.
    #[error("dependency would create a cycle: {}", path.join(" -> "))]
    CycleDetected {
        /// The issue ids along the cycle, ending at the repeated node.
        path: Vec<String>,
    },

    /// Blocked-cache propagation exceeded the depth cap.
    #[error("blocked cache rebuild exceeded depth limit {limit}")]
    DepthExceeded {
        /// The configured propagation cap.
        limit: usize,
    },

    /// The store has been closed and no longer accepts operations.
    #[error("store is inactive")]
    StoreInactive,

    /// The database is locked by another process.
    #[error("database locked: {0}")]
    DatabaseLocked(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A transaction operation failed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// A schema migration failed.
    #[error("migration {name} failed: {reason}")]
    Migration {
        /// Name of the migration that failed.
        name: String,
        /// Underlying error description.
        reason: String,
    },

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given entity kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StorageError::AlreadyExists`].
    pub fn already_exists(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StorageError::Validation`].
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the error is transient and the operation may
    /// succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseLocked(_) | Self::Connection(_) | Self::Transaction(_)
        )
    }
}

impl From<beads_core::validation::ValidationError> for StorageError {
    fn from(e: beads_core::validation::ValidationError) -> Self {
        Self::Validation {
            field: e.field().to_owned(),
            message: e.to_string(),
        }
    }
}
