//! Capability interfaces for the external toolkit.
//!
//! The orchestration layer never implements grooming, registration,
//! augmentation, or loader construction itself; it drives them through the
//! narrow traits here. Production code plugs in toolkit-backed adapters,
//! tests plug in fakes.

use std::fmt;
use std::path::{Path, PathBuf};

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use ssm_types::{GroomedMesh, PhysicalRegion, Project};

/// Interpolation used when resampling an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Trilinear interpolation.
    Linear,
    /// Nearest-neighbor interpolation.
    NearestNeighbor,
}

/// Registration transform family, from loosest to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationKind {
    /// Translation only.
    Translation,
    /// Rotation plus translation.
    Rigid,
    /// Rotation, translation, and isotropic scale.
    Similarity,
}

impl RegistrationKind {
    /// Returns the lowercase name the registration backend expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::Rigid => "rigid",
            Self::Similarity => "similarity",
        }
    }
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin/dimensions/spacing/coordinate-system bundle of a volume image.
///
/// `center` assumes an axis-aligned coordinate system; the pipeline only
/// ever recenters images whose direction matrix is identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageGeometry {
    /// Physical position of the first voxel.
    pub origin: Point3<f64>,
    /// Voxel counts per axis.
    pub dims: [usize; 3],
    /// Physical voxel spacing per axis.
    pub spacing: Vector3<f64>,
    /// Direction cosine matrix.
    pub coordsys: Matrix3<f64>,
}

impl ImageGeometry {
    /// Creates a geometry with an identity coordinate system.
    #[must_use]
    pub fn new(origin: Point3<f64>, dims: [usize; 3], spacing: Vector3<f64>) -> Self {
        Self {
            origin,
            dims,
            spacing,
            coordsys: Matrix3::identity(),
        }
    }

    /// Sets the direction cosine matrix.
    #[must_use]
    pub fn with_coordsys(mut self, coordsys: Matrix3<f64>) -> Self {
        self.coordsys = coordsys;
        self
    }

    /// Physical extent per axis.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extent(&self) -> Vector3<f64> {
        Vector3::new(
            self.dims[0] as f64 * self.spacing.x,
            self.dims[1] as f64 * self.spacing.y,
            self.dims[2] as f64 * self.spacing.z,
        )
    }

    /// Physical center of the image.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.origin + self.extent() * 0.5
    }
}

/// External grooming stage.
///
/// Grooming reads the subjects' exclusion and fixed flags, then mutates
/// subject transforms in place. No value is returned; the transforms are
/// consumed by later stages.
pub trait Groomer {
    /// Runs grooming over the project.
    ///
    /// # Errors
    ///
    /// Propagates the groomer's failure unmodified; the project may be left
    /// partially flagged but nothing has been written to disk.
    fn groom(&self, project: &mut Project) -> Result<()>;
}

/// Mesh loading.
pub trait MeshSource {
    /// Loads a groomed mesh from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    fn load_mesh(&self, path: &Path) -> Result<GroomedMesh>;
}

/// A loaded volume image.
///
/// Mirrors the toolkit image contract: accessors over geometry, in-place
/// mutation, and explicit writes. Every mutation short of `write` is
/// in-memory only.
pub trait VolumeImage {
    /// Returns the image geometry.
    fn geometry(&self) -> ImageGeometry;

    /// Physical position of the first voxel.
    fn origin(&self) -> Point3<f64> {
        self.geometry().origin
    }

    /// Physical center of the image.
    fn center(&self) -> Point3<f64> {
        self.geometry().center()
    }

    /// Moves the image by replacing its origin.
    fn set_origin(&mut self, origin: Point3<f64>);

    /// Applies a 4x4 transform to the image in its own frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the transform.
    fn apply_transform(&mut self, matrix: &Matrix4<f64>) -> Result<()>;

    /// Applies a transform and resamples into a target geometry.
    ///
    /// `mesh_transform` selects mesh-transform semantics (the matrix maps
    /// mesh coordinates rather than image coordinates), which the training
    /// grooming path uses and the registration cascade does not.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the transform.
    fn resample_into(
        &mut self,
        matrix: &Matrix4<f64>,
        target: &ImageGeometry,
        interpolation: Interpolation,
        mesh_transform: bool,
    ) -> Result<()>;

    /// Crops the image to a physical region.
    ///
    /// # Errors
    ///
    /// Returns an error if the region does not intersect the image.
    fn crop(&mut self, region: &PhysicalRegion) -> Result<()>;

    /// Writes the image to disk.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    fn write(&self, path: &Path) -> Result<()>;
}

/// Image loading.
pub trait ImageSource {
    /// Loaded image type.
    type Image: VolumeImage;

    /// Loads an image from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable.
    fn load(&self, path: &Path) -> Result<Self::Image>;
}

/// External image registration.
pub trait ImageRegistrar {
    /// Registers `moving` against `fixed`, both given as paths to images
    /// already written to disk, and returns the estimated 4x4 transform.
    ///
    /// # Errors
    ///
    /// Returns an error if registration fails; no partial transform is
    /// produced.
    fn register(
        &self,
        fixed: &Path,
        moving: &Path,
        kind: RegistrationKind,
    ) -> Result<Matrix4<f64>>;
}

/// Statistical sampler used for augmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    /// Single multivariate Gaussian.
    Gaussian,
    /// Mixture of Gaussians.
    Mixture,
    /// Kernel density estimate.
    Kde,
}

impl SamplerKind {
    /// Returns the lowercase name the augmentation backend expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gaussian => "gaussian",
            Self::Mixture => "mixture",
            Self::Kde => "kde",
        }
    }
}

/// Everything the augmentation backend needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationRequest {
    /// Directory augmented samples are written to.
    pub output_dir: PathBuf,
    /// Groomed training image files, in subject index order.
    pub image_files: Vec<PathBuf>,
    /// World-space particle files, matching `image_files` by position.
    pub particle_files: Vec<PathBuf>,
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

/// External PCA-based data augmentation.
pub trait Augmentor {
    /// Runs augmentation and returns the retained embedded dimensionality.
    ///
    /// # Errors
    ///
    /// Propagates the backend's failure unmodified.
    fn augment(&self, request: &AugmentationRequest) -> Result<usize>;
}

/// External loader construction.
pub trait LoaderFactory {
    /// Builds the training loader from the augmentation CSV manifest.
    ///
    /// # Errors
    ///
    /// Propagates the backend's failure unmodified.
    fn build_train_loader(&self, loader_dir: &Path, data_csv: &Path, batch_size: usize)
        -> Result<()>;

    /// Builds the validation loader from image/particle file lists.
    ///
    /// # Errors
    ///
    /// Propagates the backend's failure unmodified.
    fn build_validation_loader(
        &self,
        loader_dir: &Path,
        image_files: &[PathBuf],
        particle_files: &[PathBuf],
    ) -> Result<()>;

    /// Builds the test loader from an image file list.
    ///
    /// # Errors
    ///
    /// Propagates the backend's failure unmodified.
    fn build_test_loader(&self, loader_dir: &Path, image_files: &[PathBuf]) -> Result<()>;
}
