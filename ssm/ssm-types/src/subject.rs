//! Subjects and their split/extra attributes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::error::{ProjectError, Result};
use crate::transform;

/// Extra-attribute key holding the assigned split.
pub const SPLIT_KEY: &str = "split";

/// Extra-attribute key holding the serialized registration transform.
pub const REGISTRATION_TRANSFORM_KEY: &str = "registration_transform";

/// Which partition a subject belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitLabel {
    /// Training partition.
    Train,
    /// Validation partition.
    Val,
    /// Held-out test partition.
    Test,
}

impl SplitLabel {
    /// Returns the label as the lowercase string used in extra attributes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitLabel {
    type Err = ProjectError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "train" => Ok(Self::Train),
            "val" => Ok(Self::Val),
            "test" => Ok(Self::Test),
            other => Err(ProjectError::UnknownSplitLabel(other.to_string())),
        }
    }
}

/// Free-form per-subject attributes with typed fast paths.
///
/// The recognized keys (`split`, `registration_transform`) are stored as
/// typed optional fields; everything else lands in a residual string map so
/// unrecognized columns written by other tools survive a round-trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubjectExtras {
    /// Assigned split label, if the split stage has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split: Option<SplitLabel>,

    /// Serialized registration transform (space-separated 16 numbers,
    /// row-major), if the registration cascade has run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_transform: Option<String>,

    /// Unrecognized keys, preserved verbatim.
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

impl SubjectExtras {
    /// Looks up an attribute value by key, resolving typed fields first.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        match key {
            SPLIT_KEY => self.split.map(SplitLabel::as_str),
            REGISTRATION_TRANSFORM_KEY => self.registration_transform.as_deref(),
            _ => self.other.get(key).map(String::as_str),
        }
    }

    /// Inserts an attribute by key, routing recognized keys into their
    /// typed fields so [`SubjectExtras::value`] always sees the write.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::UnknownSplitLabel`] if the value for the
    /// split key does not name a split.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        match key {
            SPLIT_KEY => self.split = Some(value.parse()?),
            REGISTRATION_TRANSFORM_KEY => self.registration_transform = Some(value),
            _ => {
                self.other.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Inserts a residual attribute directly, bypassing key routing.
    ///
    /// The key must not be a recognized key; those entries would be
    /// shadowed by the typed fields in [`SubjectExtras::value`]. Use
    /// [`SubjectExtras::insert`] when the key is not known statically.
    pub fn insert_other(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.other.insert(key.into(), value.into());
    }
}

/// One sample of the study population.
///
/// Mutated in place by pipeline stages; owned by the project's subject
/// list, which is always read, modified, and written back as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Display name.
    pub name: String,

    /// Source image filename.
    pub image_file: PathBuf,

    /// Groomed mesh filename.
    #[serde(default)]
    pub groomed_file: PathBuf,

    /// Alignment transform from grooming, flat row-major 16-vector.
    #[serde(default = "identity_flat")]
    pub alignment_transform: Vec<f64>,

    /// Procrustes transform, flat row-major 16-vector.
    #[serde(default = "identity_flat")]
    pub procrustes_transform: Vec<f64>,

    /// World-space particle filename.
    #[serde(default)]
    pub world_particle_file: PathBuf,

    /// Excluded from the next grooming run.
    #[serde(default)]
    pub excluded: bool,

    /// Held fixed (not movable) during particle optimization.
    #[serde(default)]
    pub fixed: bool,

    /// Free-form attributes.
    #[serde(default)]
    pub extras: SubjectExtras,
}

fn identity_flat() -> Vec<f64> {
    transform::matrix_to_flat(&Matrix4::identity()).to_vec()
}

impl Subject {
    /// Creates a subject with identity transforms and no flags set.
    #[must_use]
    pub fn new(name: impl Into<String>, image_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            image_file: image_file.into(),
            groomed_file: PathBuf::new(),
            alignment_transform: identity_flat(),
            procrustes_transform: identity_flat(),
            world_particle_file: PathBuf::new(),
            excluded: false,
            fixed: false,
            extras: SubjectExtras::default(),
        }
    }

    /// Sets the groomed mesh filename.
    #[must_use]
    pub fn with_groomed_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.groomed_file = path.into();
        self
    }

    /// Sets the alignment transform.
    #[must_use]
    pub fn with_alignment(mut self, flat: Vec<f64>) -> Self {
        self.alignment_transform = flat;
        self
    }

    /// Sets the procrustes transform.
    #[must_use]
    pub fn with_procrustes(mut self, flat: Vec<f64>) -> Self {
        self.procrustes_transform = flat;
        self
    }

    /// Sets the world particle filename.
    #[must_use]
    pub fn with_world_particle_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.world_particle_file = path.into();
        self
    }

    /// Returns the alignment transform as a matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored vector is not 16 elements.
    pub fn alignment_matrix(&self) -> Result<Matrix4<f64>> {
        transform::matrix_from_flat(&self.alignment_transform)
    }

    /// Returns the procrustes transform as a matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored vector is not 16 elements.
    pub fn procrustes_matrix(&self) -> Result<Matrix4<f64>> {
        transform::matrix_from_flat(&self.procrustes_transform)
    }

    /// Returns the assigned split, if any.
    #[must_use]
    pub fn split(&self) -> Option<SplitLabel> {
        self.extras.split
    }
}
