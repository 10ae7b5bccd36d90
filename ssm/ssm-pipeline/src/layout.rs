//! Stage-output file layout.
//!
//! All pipeline artifacts live under a project-relative `deepssm/`
//! directory. The names are a file contract shared with the downstream
//! training tooling and must not change.

use std::fs;
use std::path::{Path, PathBuf};

use ssm_types::Project;

use crate::error::Result;

/// Directory name for stage outputs, relative to the project root.
pub const STAGE_DIR: &str = "deepssm";

/// Resolves the fixed file layout for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    root: PathBuf,
}

impl StageLayout {
    /// Layout rooted under the project's path.
    #[must_use]
    pub fn for_project(project: &Project) -> Self {
        Self {
            root: project.path().join(STAGE_DIR),
        }
    }

    /// Layout rooted at an explicit directory.
    #[must_use]
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Stage output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical reference image.
    #[must_use]
    pub fn reference_image(&self) -> PathBuf {
        self.root.join("reference_image.nrrd")
    }

    /// Persisted training bounding box.
    #[must_use]
    pub fn bounding_box(&self) -> PathBuf {
        self.root.join("bounding_box.txt")
    }

    /// Groomed training images directory.
    #[must_use]
    pub fn train_images_dir(&self) -> PathBuf {
        self.root.join("train_images")
    }

    /// Groomed training image for one subject index.
    #[must_use]
    pub fn train_image(&self, index: usize) -> PathBuf {
        self.train_images_dir().join(format!("{index}.nrrd"))
    }

    /// Validation/test images directory.
    #[must_use]
    pub fn val_test_images_dir(&self) -> PathBuf {
        self.root.join("val_and_test_images")
    }

    /// Validation/test image for one subject index.
    #[must_use]
    pub fn val_test_image(&self, index: usize) -> PathBuf {
        self.val_test_images_dir().join(format!("{index}.nrrd"))
    }

    /// Reference cropped with the loose (pad 80) box.
    #[must_use]
    pub fn large_cropped_reference(&self) -> PathBuf {
        self.root.join("large_cropped_reference_image.nrrd")
    }

    /// Reference cropped with the medium (pad 20) box.
    #[must_use]
    pub fn medium_cropped_reference(&self) -> PathBuf {
        self.root.join("medium_cropped_reference_image.nrrd")
    }

    /// Reference cropped with the exact training box.
    #[must_use]
    pub fn cropped_reference(&self) -> PathBuf {
        self.root.join("cropped_reference_image.nrrd")
    }

    /// Retained embedding dimensionality, single integer as text.
    #[must_use]
    pub fn embedded_dim(&self) -> PathBuf {
        self.root.join("embedded_dim.txt")
    }

    /// Augmentation output directory.
    #[must_use]
    pub fn augmentation_dir(&self) -> PathBuf {
        self.root.join("augmentation")
    }

    /// Augmentation sample manifest CSV.
    #[must_use]
    pub fn total_data_csv(&self) -> PathBuf {
        self.augmentation_dir().join("TotalData.csv")
    }

    /// Loader output directory.
    #[must_use]
    pub fn loader_dir(&self) -> PathBuf {
        self.root.join("torch_loaders")
    }

    /// Creates the stage root if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Creates the training images directory if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn ensure_train_images(&self) -> Result<()> {
        fs::create_dir_all(self.train_images_dir())?;
        Ok(())
    }

    /// Creates the validation/test images directory if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn ensure_val_test_images(&self) -> Result<()> {
        fs::create_dir_all(self.val_test_images_dir())?;
        Ok(())
    }

    /// Creates the augmentation directory if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn ensure_augmentation(&self) -> Result<()> {
        fs::create_dir_all(self.augmentation_dir())?;
        Ok(())
    }

    /// Creates the loader directory if absent.
    ///
    /// # Errors
    ///
    /// Returns an error on IO failure.
    pub fn ensure_loaders(&self) -> Result<()> {
        fs::create_dir_all(self.loader_dir())?;
        Ok(())
    }
}
