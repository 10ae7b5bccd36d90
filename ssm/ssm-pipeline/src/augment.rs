//! Data augmentation dispatch.

use std::fs;

use tracing::info;

use ssm_types::{Project, SplitLabel};

use crate::error::Result;
use crate::layout::StageLayout;
use crate::ports::{AugmentationRequest, Augmentor, SamplerKind};
use crate::split::split_indices;

/// Knobs for one augmentation run.
///
/// # Example
///
/// ```
/// use ssm_pipeline::{AugmentationConfig, SamplerKind};
///
/// let config = AugmentationConfig::new(300)
///     .with_percent_variability(0.95)
///     .with_sampler(SamplerKind::Gaussian);
/// assert_eq!(config.num_samples, 300);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationConfig {
    /// Number of augmented samples to generate.
    pub num_samples: usize,
    /// Requested embedding dimensionality (0 = derive from variability).
    pub num_dims: usize,
    /// Fraction of shape variability to retain.
    pub percent_variability: f64,
    /// Sampling distribution.
    pub sampler: SamplerKind,
    /// Number of mixture components (mixture sampler only, 0 = auto).
    pub mixture_num: usize,
    /// Worker process count for the backend.
    pub processes: usize,
}

impl AugmentationConfig {
    /// Creates a config generating the given number of samples.
    #[must_use]
    pub const fn new(num_samples: usize) -> Self {
        Self {
            num_samples,
            num_dims: 0,
            percent_variability: 0.95,
            sampler: SamplerKind::Gaussian,
            mixture_num: 0,
            processes: 1,
        }
    }

    /// Sets the requested embedding dimensionality.
    #[must_use]
    pub const fn with_num_dims(mut self, num_dims: usize) -> Self {
        self.num_dims = num_dims;
        self
    }

    /// Sets the retained variability fraction.
    #[must_use]
    pub const fn with_percent_variability(mut self, percent_variability: f64) -> Self {
        self.percent_variability = percent_variability;
        self
    }

    /// Sets the sampler.
    #[must_use]
    pub const fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = sampler;
        self
    }

    /// Sets the mixture component count.
    #[must_use]
    pub const fn with_mixture_num(mut self, mixture_num: usize) -> Self {
        self.mixture_num = mixture_num;
        self
    }

    /// Sets the backend worker process count.
    #[must_use]
    pub const fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes;
        self
    }
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self::new(300)
    }
}

/// Runs data augmentation over the groomed training images.
///
/// Gathers the training image files (in subject index order) and their
/// world-space particle files, hands them to the external [`Augmentor`],
/// and persists the retained embedded dimensionality to
/// `embedded_dim.txt`.
///
/// # Errors
///
/// Propagates the backend's failure unmodified; the dimensionality file
/// is only written on success.
pub fn run_data_augmentation<A: Augmentor>(
    augmentor: &A,
    project: &Project,
    layout: &StageLayout,
    config: &AugmentationConfig,
) -> Result<usize> {
    layout.ensure_augmentation()?;

    let indices = split_indices(project, SplitLabel::Train);
    let mut image_files = Vec::with_capacity(indices.len());
    let mut particle_files = Vec::with_capacity(indices.len());
    for index in indices {
        let subject = project.require_subject(index)?;
        image_files.push(layout.train_image(index));
        particle_files.push(subject.world_particle_file.clone());
    }

    let request = AugmentationRequest {
        output_dir: layout.augmentation_dir(),
        image_files,
        particle_files,
        num_samples: config.num_samples,
        num_dims: config.num_dims,
        percent_variability: config.percent_variability,
        sampler: config.sampler,
        mixture_num: config.mixture_num,
        processes: config.processes,
    };

    let embedded_dim = augmentor.augment(&request)?;
    fs::write(layout.embedded_dim(), embedded_dim.to_string())?;
    info!(embedded_dim, "Data augmentation complete");

    Ok(embedded_dim)
}
