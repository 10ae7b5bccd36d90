//! Core data model for the shape-model preparation pipeline.
//!
//! This crate holds the types shared by every pipeline stage:
//!
//! # Study population
//!
//! - [`Subject`] - one sample: filenames, transforms, flags, extras
//! - [`SplitLabel`] - train/val/test assignment
//! - [`Project`] - ordered subject collection plus per-stage [`Parameters`]
//!
//! # Geometry
//!
//! - [`transform`] - flat-vector / [`nalgebra::Matrix4`] conversions and
//!   composition helpers
//! - [`PhysicalRegion`] - axis-aligned box with a byte-stable text format
//! - [`GroomedMesh`] - minimal point-set mesh for bounds and centering
//!
//! # Example
//!
//! ```
//! use ssm_types::{Project, SplitLabel, Subject};
//!
//! let mut project = Project::new("/data/study");
//! project.push_subject(Subject::new("s0", "images/s0.nrrd"));
//!
//! let mut subjects = project.subjects();
//! subjects[0].extras.split = Some(SplitLabel::Train);
//! project.set_subjects(subjects);
//!
//! assert_eq!(project.subject(0).unwrap().split(), Some(SplitLabel::Train));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Tests may unwrap; library code must not.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod mesh;
mod project;
mod region;
mod subject;
pub mod transform;

pub use error::{ProjectError, Result};
pub use mesh::GroomedMesh;
pub use project::{Parameters, Project};
pub use region::PhysicalRegion;
pub use subject::{Subject, SubjectExtras, SplitLabel, REGISTRATION_TRANSFORM_KEY, SPLIT_KEY};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        GroomedMesh, Parameters, PhysicalRegion, Project, ProjectError, SplitLabel, Subject,
        SubjectExtras,
    };
}
