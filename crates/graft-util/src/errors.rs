use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all graft operations.
#[derive(Debug, Error, Diagnostic)]
pub enum GraftError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. Graft.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Graft.toml for syntax errors"))]
    Manifest { message: String },

    /// Invalid or malformed component repository description.
    #[error("Repository error: {message}")]
    #[diagnostic(help("Check the repository.toml referenced by [repository] in Graft.toml"))]
    Repository { message: String },

    /// Component metadata is structurally invalid (e.g. a configuration extends itself).
    #[error("Invalid metadata for {component}: {message}")]
    Metadata { component: String, message: String },

    /// Dependency resolution failed as a whole (strict conflicts, unresolved dependencies).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// The resolution engine reached a state that violates one of its invariants.
    #[error("Illegal resolution state: {message}")]
    IllegalState { message: String },

    /// An artifact could not be located.
    #[error("Artifact error: {message}")]
    Artifact { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl GraftError {
    /// Shorthand for an [`GraftError::IllegalState`] error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type GraftResult<T> = miette::Result<T>;
