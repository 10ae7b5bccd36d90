//! 4x4 spatial transform helpers.
//!
//! Transforms move between two representations: a flat row-major 16-element
//! vector (how they are stored on subjects and serialized into extra
//! attributes) and a [`Matrix4`] (how they are composed during computation).
//!
//! Composition is by matrix multiplication in application order: the
//! most-recently-computed transform premultiplies the accumulated one,
//! so `combined = new * accumulated` applies `accumulated` first.

use nalgebra::{Matrix4, Vector3};

use crate::error::{ProjectError, Result};

/// Number of elements in a flat 4x4 transform vector.
pub const TRANSFORM_LEN: usize = 16;

/// Converts a flat row-major 16-element vector to a 4x4 matrix.
///
/// # Errors
///
/// Returns [`ProjectError::InvalidTransform`] if the slice does not have
/// exactly 16 elements.
///
/// # Example
///
/// ```
/// use ssm_types::transform;
///
/// let flat: Vec<f64> = (0..16).map(f64::from).collect();
/// let matrix = transform::matrix_from_flat(&flat).unwrap();
/// assert_eq!(matrix[(0, 1)], 1.0);
/// assert_eq!(matrix[(1, 0)], 4.0);
/// ```
pub fn matrix_from_flat(values: &[f64]) -> Result<Matrix4<f64>> {
    if values.len() != TRANSFORM_LEN {
        return Err(ProjectError::InvalidTransform {
            expected: TRANSFORM_LEN,
            got: values.len(),
        });
    }
    Ok(Matrix4::from_row_slice(values))
}

/// Flattens a 4x4 matrix into a row-major 16-element array.
#[must_use]
pub fn matrix_to_flat(matrix: &Matrix4<f64>) -> [f64; TRANSFORM_LEN] {
    let mut flat = [0.0; TRANSFORM_LEN];
    for row in 0..4 {
        for col in 0..4 {
            flat[row * 4 + col] = matrix[(row, col)];
        }
    }
    flat
}

/// Serializes a matrix as 16 space-separated numbers, row-major.
///
/// Uses the default float formatting, which is shortest-exact: re-parsing
/// the string recovers the same bits, and re-serializing reproduces the
/// string byte-for-byte.
#[must_use]
pub fn matrix_to_string(matrix: &Matrix4<f64>) -> String {
    let flat = matrix_to_flat(matrix);
    let parts: Vec<String> = flat.iter().map(ToString::to_string).collect();
    parts.join(" ")
}

/// Parses a matrix from 16 space-separated numbers, row-major.
///
/// # Errors
///
/// Returns [`ProjectError::ParseTransform`] if the string does not contain
/// exactly 16 parseable numbers.
pub fn matrix_from_string(text: &str) -> Result<Matrix4<f64>> {
    let values: Vec<f64> = text
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| ProjectError::parse_transform(format!("{e} in \"{text}\"")))?;
    matrix_from_flat(&values)
}

/// Builds a reflection matrix that negates the given axis (0 = X, 1 = Y,
/// 2 = Z). Other axes are untouched.
///
/// # Panics
///
/// Panics if `axis_index` is not 0, 1, or 2.
#[must_use]
pub fn reflection_matrix(axis_index: usize) -> Matrix4<f64> {
    assert!(axis_index < 3, "reflection axis must be 0, 1, or 2");
    let mut matrix = Matrix4::identity();
    matrix[(axis_index, axis_index)] = -1.0;
    matrix
}

/// Builds a pure translation matrix.
#[must_use]
pub fn translation_matrix(translation: &Vector3<f64>) -> Matrix4<f64> {
    let mut matrix = Matrix4::identity();
    matrix[(0, 3)] = translation.x;
    matrix[(1, 3)] = translation.y;
    matrix[(2, 3)] = translation.z;
    matrix
}

/// Adds a translation to the last column of a transform in place.
pub fn add_translation(matrix: &mut Matrix4<f64>, translation: &Vector3<f64>) {
    matrix[(0, 3)] += translation.x;
    matrix[(1, 3)] += translation.y;
    matrix[(2, 3)] += translation.z;
}
