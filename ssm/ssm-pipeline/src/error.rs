//! Error types for pipeline orchestration.
//!
//! Failures from external collaborators propagate unmodified and terminate
//! the run; there is no retry and no partial-state rollback. The variants
//! only classify the failing call so diagnostics say which stage gave up.

use thiserror::Error;

use crate::ports::RegistrationKind;
use ssm_types::ProjectError;

/// Errors that can occur while orchestrating the preparation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Data-model error (missing parameter, bad transform, ...).
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// External grooming failed.
    #[error("grooming failed: {0}")]
    Groom(String),

    /// Image load or image operation failed.
    #[error("image operation failed: {0}")]
    Image(String),

    /// Mesh load failed.
    #[error("mesh load failed: {0}")]
    Mesh(String),

    /// Image registration failed.
    #[error("{kind} registration failed: {reason}")]
    Registration {
        /// Which registration kind was requested.
        kind: RegistrationKind,
        /// Why it failed.
        reason: String,
    },

    /// Data augmentation failed.
    #[error("data augmentation failed: {0}")]
    Augmentation(String),

    /// Loader construction failed.
    #[error("loader construction failed: {0}")]
    Loader(String),

    /// A stage that needs training subjects found none.
    #[error("no training subjects; run the split stage first")]
    EmptyTrainingSet,
}

impl PipelineError {
    /// Creates a grooming error.
    #[must_use]
    pub fn groom(reason: impl Into<String>) -> Self {
        Self::Groom(reason.into())
    }

    /// Creates an image error.
    #[must_use]
    pub fn image(reason: impl Into<String>) -> Self {
        Self::Image(reason.into())
    }

    /// Creates a mesh error.
    #[must_use]
    pub fn mesh(reason: impl Into<String>) -> Self {
        Self::Mesh(reason.into())
    }

    /// Creates a registration error.
    #[must_use]
    pub fn registration(kind: RegistrationKind, reason: impl Into<String>) -> Self {
        Self::Registration {
            kind,
            reason: reason.into(),
        }
    }

    /// Creates an augmentation error.
    #[must_use]
    pub fn augmentation(reason: impl Into<String>) -> Self {
        Self::Augmentation(reason.into())
    }

    /// Creates a loader error.
    #[must_use]
    pub fn loader(reason: impl Into<String>) -> Self {
        Self::Loader(reason.into())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_registration_names_kind() {
        let err = PipelineError::registration(RegistrationKind::Rigid, "did not converge");
        assert!(err.to_string().contains("rigid"));
        assert!(err.to_string().contains("did not converge"));
    }

    #[test]
    fn error_from_project_error() {
        let err: PipelineError = ProjectError::missing_parameter("groom", "reflect").into();
        assert!(err.to_string().contains("reflect"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
