//! Per-subject training image grooming.

use tracing::{debug, info};

use ssm_types::{Project, SplitLabel};

use crate::error::Result;
use crate::layout::StageLayout;
use crate::ports::{ImageSource, Interpolation, VolumeImage};
use crate::reference::load_training_bounding_box;
use crate::split::split_indices;

/// Grooms every training subject's image into the reference frame.
///
/// For each training subject in index order: load the image, compose the
/// procrustes transform onto the alignment transform
/// (`combined = procrustes * alignment`), resample into the reference
/// image's geometry with linear interpolation and mesh-transform
/// semantics, crop to the persisted training bounding box, and write
/// `train_images/<index>.nrrd`. The first failure halts the run.
///
/// # Errors
///
/// Propagates image-load, transform, and IO failures unmodified.
pub fn groom_training_images<I: ImageSource>(
    images: &I,
    project: &Project,
    layout: &StageLayout,
) -> Result<()> {
    layout.ensure_train_images()?;

    let reference = images.load(&layout.reference_image())?;
    let target = reference.geometry();
    let bounds = load_training_bounding_box(layout)?;

    let indices = split_indices(project, SplitLabel::Train);
    info!(count = indices.len(), "Grooming training images");

    for index in indices {
        let subject = project.require_subject(index)?;
        debug!(index, image = %subject.image_file.display(), "Grooming");

        let mut image = images.load(&subject.image_file)?;
        let combined = subject.procrustes_matrix()? * subject.alignment_matrix()?;
        image.resample_into(&combined, &target, Interpolation::Linear, true)?;
        image.crop(&bounds)?;
        image.write(&layout.train_image(index))?;
    }

    Ok(())
}
