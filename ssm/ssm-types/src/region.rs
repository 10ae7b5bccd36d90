//! Axis-aligned physical region.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ProjectError;

/// An axis-aligned min/max box in physical (world) coordinates.
///
/// Used for the training bounding box and the progressively padded crop
/// regions of the registration cascade. The text serialization round-trips
/// byte-for-byte, which matters because the region is persisted once and
/// re-read by later stages.
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use ssm_types::PhysicalRegion;
///
/// let region = PhysicalRegion::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 10.0, 10.0),
/// );
///
/// let padded = region.pad(10.0);
/// assert_eq!(padded.min, Point3::new(-10.0, -10.0, -10.0));
/// assert_eq!(padded.max, Point3::new(20.0, 20.0, 20.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalRegion {
    /// Minimum corner (smallest x, y, z values).
    pub min: Point3<f64>,
    /// Maximum corner (largest x, y, z values).
    pub max: Point3<f64>,
}

impl PhysicalRegion {
    /// Creates a new region from minimum and maximum corners.
    ///
    /// The corners are corrected if min > max for any axis.
    #[must_use]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self {
            min: Point3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Point3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }

    /// Creates an empty (invalid) region, useful as a starting point for
    /// expanding to include points.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates the tightest region containing all the given points.
    ///
    /// Returns an empty region if the iterator is empty.
    #[must_use]
    pub fn from_points<'a>(points: impl Iterator<Item = &'a Point3<f64>>) -> Self {
        let mut region = Self::empty();
        for point in points {
            region.expand_to_include(point);
        }
        region
    }

    /// Check if the region is empty (min > max for any axis).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the size (extent per axis) of the region.
    #[inline]
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Get the center of the region.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Expand the region in place to include a point.
    pub fn expand_to_include(&mut self, point: &Point3<f64>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    /// Compute the union (enclosing region) of two regions.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Pad the region by a uniform additive margin on all sides.
    ///
    /// Negative margins shrink the region.
    #[must_use]
    pub fn pad(&self, margin: f64) -> Self {
        Self {
            min: Point3::new(
                self.min.x - margin,
                self.min.y - margin,
                self.min.z - margin,
            ),
            max: Point3::new(
                self.max.x + margin,
                self.max.y + margin,
                self.max.z + margin,
            ),
        }
    }

}

impl Default for PhysicalRegion {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for PhysicalRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min: {} {} {}\nmax: {} {} {}",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

impl FromStr for PhysicalRegion {
    type Err = ProjectError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        fn parse_corner(line: &str, prefix: &str) -> Result<Point3<f64>, ProjectError> {
            let rest = line.trim().strip_prefix(prefix).ok_or_else(|| {
                ProjectError::parse_region(format!("expected \"{prefix}\" line, got \"{line}\""))
            })?;
            let values: Vec<f64> = rest
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|e| ProjectError::parse_region(format!("{e} in \"{line}\"")))?;
            if values.len() != 3 {
                return Err(ProjectError::parse_region(format!(
                    "expected 3 coordinates, got {} in \"{line}\"",
                    values.len()
                )));
            }
            Ok(Point3::new(values[0], values[1], values[2]))
        }

        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let min_line = lines
            .next()
            .ok_or_else(|| ProjectError::parse_region("empty region text"))?;
        let max_line = lines
            .next()
            .ok_or_else(|| ProjectError::parse_region("missing max line"))?;

        let min = parse_corner(min_line, "min:")?;
        let max = parse_corner(max_line, "max:")?;
        Ok(Self { min, max })
    }
}
