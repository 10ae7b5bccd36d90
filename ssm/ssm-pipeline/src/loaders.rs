//! Loader manifest preparation.
//!
//! Pure file-path bookkeeping: gather per-split image and particle file
//! lists and hand them to the external loader factory. No data is
//! transformed here.

use tracing::info;

use ssm_types::{Project, SplitLabel};

use crate::error::Result;
use crate::layout::StageLayout;
use crate::ports::LoaderFactory;
use crate::split::split_indices;

/// Builds the train, validation, and test loaders.
///
/// The training loader reads the augmentation CSV manifest; the
/// validation loader pairs each validation image with its world-space
/// particle file; the test loader takes images only.
///
/// # Errors
///
/// Propagates the factory's failure unmodified; loaders are built in
/// train, validation, test order and a failure stops the sequence.
pub fn prepare_data_loaders<L: LoaderFactory>(
    factory: &L,
    project: &Project,
    layout: &StageLayout,
    batch_size: usize,
) -> Result<()> {
    layout.ensure_loaders()?;
    let loader_dir = layout.loader_dir();

    let val_indices = split_indices(project, SplitLabel::Val);
    let mut val_images = Vec::with_capacity(val_indices.len());
    let mut val_particles = Vec::with_capacity(val_indices.len());
    for index in val_indices {
        let subject = project.require_subject(index)?;
        val_images.push(layout.val_test_image(index));
        val_particles.push(subject.world_particle_file.clone());
    }

    let test_images: Vec<_> = split_indices(project, SplitLabel::Test)
        .into_iter()
        .map(|index| layout.val_test_image(index))
        .collect();

    info!(
        val = val_images.len(),
        test = test_images.len(),
        batch_size,
        "Preparing data loaders"
    );

    factory.build_train_loader(&loader_dir, &layout.total_data_csv(), batch_size)?;
    factory.build_validation_loader(&loader_dir, &val_images, &val_particles)?;
    factory.build_test_loader(&loader_dir, &test_images)?;

    Ok(())
}
