//! Error types for svn-fixture
//!
//! Every fallible operation in the crate returns [`Result<T>`], whose error side
//! is [`FixtureError`]. Backend failures are propagated unchanged; nothing here
//! retries or rolls back a partially applied revision.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the svn-fixture library
pub type Result<T> = std::result::Result<T, FixtureError>;

/// Main error type for all fixture operations
#[derive(Debug, Error)]
pub enum FixtureError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// A repository name or one of its locations is already taken
    #[error("Duplicate repository '{name}': {reason}")]
    DuplicateRepository {
        /// Name of the repository being registered
        name: String,
        /// What collided
        reason: String,
    },

    /// A structural or property operation targeted a missing or wrong-kind node
    #[error("Node error at {path:?}: {message}")]
    Node {
        /// Path the operation targeted
        path: PathBuf,
        /// Description of the failure
        message: String,
    },

    /// A timestamp value could not be parsed
    #[error("Cannot format {0:?} as a timestamp")]
    Format(String),

    /// The version-control engine reported a failure
    #[error("Backend error during {operation}: {message}")]
    Backend {
        /// Primitive or command that failed
        operation: String,
        /// Engine output describing the failure
        message: String,
    },

    /// No revision with this name is declared on the repository
    #[error("Revision not found: {0}")]
    RevisionNotFound(String),

    /// The repository has no working copy session yet
    #[error("Repository '{0}' is not checked out")]
    NotCheckedOut(String),

    /// The revision number does not exist in storage
    #[error("No such revision: {0}")]
    NoSuchRevision(u64),

    /// A fixture manifest is structurally invalid
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FixtureError {
    /// Create a node error for `path`
    pub fn node(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        FixtureError::Node {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a backend error for the named operation
    pub fn backend(operation: impl Into<String>, msg: impl Into<String>) -> Self {
        FixtureError::Backend {
            operation: operation.into(),
            message: msg.into(),
        }
    }

    /// Create a duplicate repository error
    pub fn duplicate(name: impl Into<String>, reason: impl Into<String>) -> Self {
        FixtureError::DuplicateRepository {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        FixtureError::Internal(msg.into())
    }

    /// Check if this error came from a node operation
    pub fn is_node_error(&self) -> bool {
        matches!(self, FixtureError::Node { .. })
    }

    /// Check if this error was raised by the version-control engine
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            FixtureError::Backend { .. } | FixtureError::NoSuchRevision(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            FixtureError::DuplicateRepository { name, reason } => {
                format!(
                    "Repository '{}' cannot be created: {}. Destroy the existing fixture or choose another name.",
                    name, reason
                )
            }
            FixtureError::NotCheckedOut(name) => {
                format!("Repository '{}' has no working copy. Call checkout() or commit through the repository.", name)
            }
            FixtureError::RevisionNotFound(name) => {
                format!("No revision named '{}' is declared on this repository.", name)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FixtureError::duplicate("test", "name already registered");
        assert_eq!(
            err.to_string(),
            "Duplicate repository 'test': name already registered"
        );

        let err = FixtureError::Format("yesterday-ish".to_string());
        assert_eq!(err.to_string(), "Cannot format \"yesterday-ish\" as a timestamp");
    }

    #[test]
    fn test_error_classification() {
        assert!(FixtureError::node("/tmp/x", "missing").is_node_error());
        assert!(!FixtureError::node("/tmp/x", "missing").is_backend_error());
        assert!(FixtureError::backend("commit", "locked").is_backend_error());
        assert!(FixtureError::NoSuchRevision(4).is_backend_error());
        assert!(!FixtureError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "test"
        ))
        .is_node_error());
    }

    #[test]
    fn test_user_message_mentions_name() {
        let err = FixtureError::NotCheckedOut("hello_world".to_string());
        assert!(err.user_message().contains("hello_world"));
    }
}
