//! Project: the ordered subject collection and per-stage parameters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, Result};
use crate::subject::Subject;

/// String key/value parameters for one pipeline stage.
///
/// Values are strings; boolean-like parameters accept `"1"` or `"True"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameters {
    #[serde(flatten)]
    values: BTreeMap<String, String>,
}

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style parameter set.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Gets a boolean-like parameter. `"1"` and `"True"` are true;
    /// anything else (including absence) is false.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1" | "True"))
    }

    /// Gets an unsigned integer parameter. Absent keys are `Ok(None)`.
    ///
    /// The stage name is only used to label the error.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::InvalidParameter`] if the value is present
    /// but not an unsigned integer.
    pub fn get_usize(&self, stage: &str, key: &str) -> Result<Option<usize>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<usize>()
                    .map_err(|e| ProjectError::invalid_parameter(stage, key, e.to_string()))
            })
            .transpose()
    }

    /// Returns true if no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Ordered collection of subjects plus per-stage parameters.
///
/// The subject list follows a whole-collection read-modify-write protocol:
/// stages clone the list out with [`Project::subjects`], mutate their copy,
/// and write it back with [`Project::set_subjects`]. There is deliberately
/// no per-subject update, so a stage can never lose edits made earlier in
/// the same pass.
///
/// # Example
///
/// ```
/// use ssm_types::{Parameters, Project, Subject};
///
/// let mut project = Project::new("/data/study");
/// project.push_subject(Subject::new("s0", "s0.nrrd"));
/// project.set_parameters("groom", Parameters::new().with("reflect", "1"));
///
/// let mut subjects = project.subjects();
/// subjects[0].excluded = true;
/// project.set_subjects(subjects);
///
/// assert!(project.subject(0).unwrap().excluded);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    /// Filesystem root the project's stage outputs live under.
    path: PathBuf,

    /// Subjects in study order.
    subjects: Vec<Subject>,

    /// Parameters keyed by stage name.
    #[serde(default)]
    parameters: BTreeMap<String, Parameters>,
}

impl Project {
    /// Creates an empty project rooted at the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            subjects: Vec::new(),
            parameters: BTreeMap::new(),
        }
    }

    /// Returns the project root path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a subject to the collection.
    pub fn push_subject(&mut self, subject: Subject) {
        self.subjects.push(subject);
    }

    /// Returns the number of subjects.
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Clones out the full subject list for a read-modify-write pass.
    #[must_use]
    pub fn subjects(&self) -> Vec<Subject> {
        self.subjects.clone()
    }

    /// Writes the full subject list back.
    pub fn set_subjects(&mut self, subjects: Vec<Subject>) {
        self.subjects = subjects;
    }

    /// Read-only access to one subject.
    #[must_use]
    pub fn subject(&self, index: usize) -> Option<&Subject> {
        self.subjects.get(index)
    }

    /// Read-only access to one subject, as an error on out-of-bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::SubjectOutOfBounds`] if `index` is past the
    /// end of the subject list.
    pub fn require_subject(&self, index: usize) -> Result<&Subject> {
        self.subjects
            .get(index)
            .ok_or(ProjectError::SubjectOutOfBounds {
                index,
                count: self.subjects.len(),
            })
    }

    /// Read-only iteration over subjects in index order.
    pub fn iter_subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }

    /// Returns the parameters for a stage, if any are set.
    #[must_use]
    pub fn parameters(&self, stage: &str) -> Option<&Parameters> {
        self.parameters.get(stage)
    }

    /// Replaces the parameters for a stage.
    pub fn set_parameters(&mut self, stage: impl Into<String>, parameters: Parameters) {
        self.parameters.insert(stage.into(), parameters);
    }

    /// Looks up a single stage parameter.
    #[must_use]
    pub fn parameter(&self, stage: &str, key: &str) -> Option<&str> {
        self.parameters.get(stage).and_then(|p| p.get(key))
    }

    /// Looks up a single stage parameter, as an error when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::MissingParameter`] if the stage or key is
    /// not present.
    pub fn require_parameter(&self, stage: &str, key: &str) -> Result<&str> {
        self.parameter(stage, key)
            .ok_or_else(|| ProjectError::missing_parameter(stage, key))
    }

    /// Serializes the project to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ProjectError::from)
    }

    /// Deserializes a project from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ProjectError::from)
    }
}
