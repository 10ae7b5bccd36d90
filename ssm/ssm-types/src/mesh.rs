//! Minimal groomed-mesh geometry.

use nalgebra::{Matrix4, Point3, Vector3};

use crate::region::PhysicalRegion;

/// Point set of a groomed surface mesh.
///
/// The orchestration layer only needs mesh geometry for centering and
/// bounding-box math, so connectivity is not carried. Loading from disk is
/// behind the `MeshSource` port in the pipeline crate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroomedMesh {
    /// Vertex positions in physical coordinates.
    pub points: Vec<Point3<f64>>,
}

impl GroomedMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Creates a mesh from a list of points.
    #[must_use]
    pub fn from_points(points: Vec<Point3<f64>>) -> Self {
        Self { points }
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the mesh has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Applies a homogeneous 4x4 transform to all points in place.
    pub fn apply_transform(&mut self, matrix: &Matrix4<f64>) {
        for point in &mut self.points {
            *point = matrix.transform_point(point);
        }
    }

    /// Translates all points in place.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        for point in &mut self.points {
            *point += offset;
        }
    }

    /// Computes the axis-aligned bounds of the mesh.
    ///
    /// Returns an empty region for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> PhysicalRegion {
        PhysicalRegion::from_points(self.points.iter())
    }

    /// Returns the center of the mesh's bounding box.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        self.bounds().center()
    }
}
