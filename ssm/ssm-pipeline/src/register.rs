//! Validation/test registration cascade.
//!
//! Validation and test subjects are aligned to the reference image by a
//! staged rigid-then-similarity registration, refining through three
//! progressively tighter crops. The coarse-to-fine stages keep each
//! registration's search space small: the pad sequence (80, 20, 0) and
//! the transform-kind sequence (translation, rigid, similarity) are fixed
//! because each stage registers against the previous stage's on-disk crop.

use std::path::PathBuf;

use nalgebra::Matrix4;
use tracing::{debug, info};

use ssm_types::{transform, PhysicalRegion, Project, SplitLabel};

use crate::error::Result;
use crate::layout::StageLayout;
use crate::ports::{ImageGeometry, ImageRegistrar, ImageSource, Interpolation, RegistrationKind, VolumeImage};
use crate::reference::load_training_bounding_box;
use crate::reflect::ReflectRule;
use crate::split::split_indices;

/// Pad of the loose crop used for the translation stage.
pub const LARGE_CROP_PAD: f64 = 80.0;

/// Pad of the medium crop used for the rigid stage.
pub const MEDIUM_CROP_PAD: f64 = 20.0;

/// One pre-cropped rendition of the reference image.
struct CroppedReference {
    path: PathBuf,
    region: PhysicalRegion,
    geometry: ImageGeometry,
    kind: RegistrationKind,
}

fn write_cropped_reference<I: ImageSource>(
    images: &I,
    layout: &StageLayout,
    region: PhysicalRegion,
    path: PathBuf,
    kind: RegistrationKind,
) -> Result<CroppedReference> {
    let mut image = images.load(&layout.reference_image())?;
    image.crop(&region)?;
    image.write(&path)?;
    Ok(CroppedReference {
        path,
        region,
        geometry: image.geometry(),
        kind,
    })
}

/// Registers every validation and test subject against the reference.
///
/// Per subject: reflection correction, recentering on the reference
/// center, then the three crop/register/resample stages. Transforms
/// compose in application order, each new stage premultiplying the
/// accumulated matrix; the final transform is serialized into the
/// subject's `registration_transform` extra attribute and the full
/// subject list is written back once after the loop.
///
/// # Errors
///
/// Any registration, image, or IO failure aborts the run with no partial
/// transform saved.
pub fn groom_val_test_images<I, R>(
    images: &I,
    registrar: &R,
    project: &mut Project,
    layout: &StageLayout,
) -> Result<()>
where
    I: ImageSource,
    R: ImageRegistrar,
{
    layout.ensure_val_test_images()?;

    let reference = images.load(&layout.reference_image())?;
    let reference_center = reference.center();
    let bounds = load_training_bounding_box(layout)?;

    let stages = [
        write_cropped_reference(
            images,
            layout,
            bounds.pad(LARGE_CROP_PAD),
            layout.large_cropped_reference(),
            RegistrationKind::Translation,
        )?,
        write_cropped_reference(
            images,
            layout,
            bounds.pad(MEDIUM_CROP_PAD),
            layout.medium_cropped_reference(),
            RegistrationKind::Rigid,
        )?,
        write_cropped_reference(
            images,
            layout,
            bounds,
            layout.cropped_reference(),
            RegistrationKind::Similarity,
        )?,
    ];

    let rule = ReflectRule::from_project(project);

    let mut indices = split_indices(project, SplitLabel::Val);
    indices.extend(split_indices(project, SplitLabel::Test));
    info!(count = indices.len(), "Registering validation/test images");

    let mut subjects = project.subjects();
    for index in indices {
        let subject = &mut subjects[index];
        debug!(index, image = %subject.image_file.display(), "Registering");

        let mut image = images.load(&subject.image_file)?;
        let image_file = layout.val_test_image(index);

        // 1. Reflection correction is the first transform component
        let mut accumulated = Matrix4::identity();
        if let Some(axis) = rule.needs_reflection(subject) {
            let reflection = axis.matrix();
            image.apply_transform(&reflection)?;
            accumulated = reflection;
        }

        // 2. Coarse alignment: match centers via an origin shift
        let translation = reference_center - image.center();
        let origin = image.origin();
        image.set_origin(origin + translation);
        image.write(&image_file)?;
        transform::add_translation(&mut accumulated, &translation);

        // 3..5. Crop, register, resample; each result premultiplies
        for stage in &stages {
            image.crop(&stage.region)?;
            image.write(&image_file)?;
            let estimated = registrar.register(&stage.path, &image_file, stage.kind)?;
            image.resample_into(&estimated, &stage.geometry, Interpolation::Linear, false)?;
            accumulated = estimated * accumulated;
        }

        subject.extras.registration_transform = Some(transform::matrix_to_string(&accumulated));
    }
    project.set_subjects(subjects);

    Ok(())
}
