//! Reference frame construction.
//!
//! The alignment stage nominates one training subject as the reference;
//! this module centers that subject's image at the origin, applies the
//! reflection rule, persists it as the canonical reference image, and
//! persists the training bounding box for every later stage to reuse.

use std::fs;

use tracing::{debug, info};

use ssm_types::{PhysicalRegion, Project, SplitLabel};

use crate::error::Result;
use crate::groom::reference_index;
use crate::layout::StageLayout;
use crate::ports::{ImageSource, MeshSource, VolumeImage};
use crate::reflect::ReflectRule;
use crate::split::split_indices;

/// Additive margin around the union of training mesh extents.
pub const TRAINING_BOX_MARGIN: f64 = 10.0;

/// Computes the training bounding box.
///
/// Union of every training mesh's bounds after its alignment transform,
/// padded by [`TRAINING_BOX_MARGIN`] per axis.
///
/// # Errors
///
/// Returns [`crate::PipelineError::EmptyTrainingSet`] when no subject is
/// assigned to the training split, and propagates mesh-load failures.
pub fn training_bounding_box<M: MeshSource>(
    meshes: &M,
    project: &Project,
) -> Result<PhysicalRegion> {
    let indices = split_indices(project, SplitLabel::Train);
    if indices.is_empty() {
        return Err(crate::PipelineError::EmptyTrainingSet);
    }

    let mut region = PhysicalRegion::empty();
    for index in indices {
        let subject = project.require_subject(index)?;
        let mut mesh = meshes.load_mesh(&subject.groomed_file)?;
        mesh.apply_transform(&subject.alignment_matrix()?);
        region = region.union(&mesh.bounds());
    }
    Ok(region.pad(TRAINING_BOX_MARGIN))
}

/// Reads the persisted training bounding box back from disk.
///
/// # Errors
///
/// Returns an error if the file is missing or malformed.
pub fn load_training_bounding_box(layout: &StageLayout) -> Result<PhysicalRegion> {
    let text = fs::read_to_string(layout.bounding_box())?;
    let region: PhysicalRegion = text.parse().map_err(ssm_types::ProjectError::from)?;
    Ok(region)
}

/// Builds and persists the reference image and training bounding box.
///
/// The reference subject's groomed mesh supplies the centering offset: the
/// image origin is shifted so the mesh center lands at the world origin.
/// Reflection is applied when the groom-stage rule matches the reference
/// subject.
///
/// # Errors
///
/// Propagates missing-parameter, image, mesh, and IO failures; nothing is
/// retried.
pub fn prepare_reference_frame<I, M>(
    images: &I,
    meshes: &M,
    project: &Project,
    layout: &StageLayout,
) -> Result<()>
where
    I: ImageSource,
    M: MeshSource,
{
    layout.ensure_root()?;

    let index = reference_index(project)?;
    let subject = project.require_subject(index)?;
    info!(reference = index, name = %subject.name, "Building reference frame");

    let mut image = images.load(&subject.image_file)?;
    let mesh = meshes.load_mesh(&subject.groomed_file)?;

    // Center the reference at the origin
    let center = mesh.center();
    image.set_origin(image.origin() - center.coords);

    let rule = ReflectRule::from_project(project);
    if let Some(axis) = rule.needs_reflection(subject) {
        debug!(axis = axis.index(), "Reflecting reference image");
        image.apply_transform(&axis.matrix())?;
    }

    image.write(&layout.reference_image())?;

    let bounds = training_bounding_box(meshes, project)?;
    fs::write(layout.bounding_box(), bounds.to_string())?;
    debug!(%bounds, "Persisted training bounding box");

    Ok(())
}
