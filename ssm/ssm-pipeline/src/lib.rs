//! Split/grooming/registration orchestration for shape-model preparation.
//!
//! This crate drives the preparation pipeline that turns a groomed study
//! population into training inputs: a deterministic train/val/test split,
//! per-split grooming dispatch, reference-frame construction, training
//! image grooming, a cascaded registration of validation/test images, data
//! augmentation, and loader manifest preparation.
//!
//! The heavy lifting (grooming, image resampling, registration,
//! augmentation, loader construction) happens in an external toolkit; this
//! crate only coordinates it through the narrow traits in [`ports`], so
//! every stage is testable against fakes.
//!
//! # Stages
//!
//! Stages run strictly in sequence; each finishes all file writes before
//! the next begins, and any failure halts the run.
//!
//! 1. [`create_split`] - assign split labels (seeded shuffle, 10/10/80)
//! 2. [`groom_training_shapes`] / [`groom_validation_shapes`] - flag
//!    subjects and delegate to the external groomer
//! 3. [`prepare_reference_frame`] - canonical reference image + training
//!    bounding box
//! 4. [`groom_training_images`] - resample/crop training images into the
//!    reference frame
//! 5. [`groom_val_test_images`] - translation/rigid/similarity cascade
//! 6. [`run_data_augmentation`] - sample augmented training data
//! 7. [`prepare_data_loaders`] - hand file manifests to the loader factory
//!
//! # Example
//!
//! ```
//! use ssm_pipeline::{create_split, split_indices};
//! use ssm_types::{Project, SplitLabel, Subject};
//!
//! let mut project = Project::new("/data/study");
//! for i in 0..20 {
//!     project.push_subject(Subject::new(format!("s{i}"), format!("s{i}.nrrd")));
//! }
//!
//! create_split(&mut project);
//! assert_eq!(split_indices(&project, SplitLabel::Test).len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Tests may unwrap; library code must not.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod augment;
mod error;
mod groom;
mod layout;
mod loaders;
pub mod ports;
mod reference;
mod reflect;
mod register;
mod split;
mod train_images;

pub use augment::{run_data_augmentation, AugmentationConfig};
pub use error::{PipelineError, Result};
pub use groom::{
    groom_training_shapes, groom_validation_shapes, prepare_validation_particles, reference_index,
};
pub use layout::{StageLayout, STAGE_DIR};
pub use loaders::prepare_data_loaders;
pub use ports::{
    AugmentationRequest, Augmentor, Groomer, ImageGeometry, ImageRegistrar, ImageSource,
    Interpolation, LoaderFactory, MeshSource, RegistrationKind, SamplerKind, VolumeImage,
};
pub use reference::{
    load_training_bounding_box, prepare_reference_frame, training_bounding_box,
    TRAINING_BOX_MARGIN,
};
pub use reflect::{ReflectAxis, ReflectRule, GROOM_STAGE};
pub use register::{groom_val_test_images, LARGE_CROP_PAD, MEDIUM_CROP_PAD};
pub use split::{create_split, split_indices, holdout_size, SPLIT_SEED};
pub use train_images::groom_training_images;

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        create_split, groom_training_images, groom_training_shapes, groom_val_test_images,
        groom_validation_shapes, prepare_data_loaders, prepare_reference_frame,
        run_data_augmentation, split_indices, AugmentationConfig, PipelineError, ReflectRule,
        StageLayout,
    };
    pub use super::ports::{
        Augmentor, Groomer, ImageRegistrar, ImageSource, LoaderFactory, MeshSource, VolumeImage,
    };
}
