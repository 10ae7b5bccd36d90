//! Error types for the ssm-types crate.

use thiserror::Error;

/// Errors that can occur while working with projects, subjects, and
/// their serialized artifacts.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// A required stage parameter is missing.
    #[error("missing parameter \"{key}\" in stage \"{stage}\"")]
    MissingParameter {
        /// Stage name the parameter was looked up in.
        stage: String,
        /// Parameter key.
        key: String,
    },

    /// A stage parameter could not be parsed as the expected type.
    #[error("invalid parameter \"{key}\" in stage \"{stage}\": {reason}")]
    InvalidParameter {
        /// Stage name.
        stage: String,
        /// Parameter key.
        key: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A flat transform vector has the wrong number of elements.
    #[error("invalid transform: expected {expected} elements, got {got}")]
    InvalidTransform {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        got: usize,
    },

    /// A serialized transform string could not be parsed.
    #[error("failed to parse transform: {0}")]
    ParseTransform(String),

    /// A serialized physical region could not be parsed.
    #[error("failed to parse region: {0}")]
    ParseRegion(String),

    /// An unknown split label was encountered.
    #[error("unknown split label \"{0}\"")]
    UnknownSplitLabel(String),

    /// Subject index out of bounds.
    #[error("subject index {index} out of bounds ({count} subjects)")]
    SubjectOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of subjects in the project.
        count: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProjectError {
    /// Creates a missing parameter error.
    #[must_use]
    pub fn missing_parameter(stage: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingParameter {
            stage: stage.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(
        stage: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            stage: stage.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse transform error.
    #[must_use]
    pub fn parse_transform(reason: impl Into<String>) -> Self {
        Self::ParseTransform(reason.into())
    }

    /// Creates a parse region error.
    #[must_use]
    pub fn parse_region(reason: impl Into<String>) -> Self {
        Self::ParseRegion(reason.into())
    }
}

impl From<std::io::Error> for ProjectError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for ssm-types operations.
pub type Result<T> = std::result::Result<T, ProjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_missing_parameter() {
        let err = ProjectError::missing_parameter("groom", "reflect_axis");
        assert!(err.to_string().contains("groom"));
        assert!(err.to_string().contains("reflect_axis"));
    }

    #[test]
    fn error_invalid_transform() {
        let err = ProjectError::InvalidTransform {
            expected: 16,
            got: 12,
        };
        assert!(err.to_string().contains("16"));
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn error_subject_out_of_bounds() {
        let err = ProjectError::SubjectOutOfBounds { index: 7, count: 5 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ProjectError = io_err.into();
        assert!(matches!(err, ProjectError::Io(_)));
    }

    #[test]
    fn error_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("bogus").unwrap_err();
        let err: ProjectError = json_err.into();
        assert!(matches!(err, ProjectError::Serialization(_)));
    }
}
