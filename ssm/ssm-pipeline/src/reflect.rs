//! Reflection correction rule.
//!
//! Some study populations mix left/right anatomy; the groom stage can
//! configure a rule that reflects selected subjects along one axis so all
//! shapes share a side. The rule is keyed on an arbitrary extra-attribute
//! column and a target value.

use nalgebra::Matrix4;
use tracing::warn;

use ssm_types::{transform, Parameters, Project, Subject};

/// Stage name whose parameters configure grooming, including reflection.
pub const GROOM_STAGE: &str = "groom";

/// Reflection axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectAxis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl ReflectAxis {
    /// Matrix row/column index of the axis.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Parses an axis label. Only `"X"`, `"Y"`, and `"Z"` are recognized.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "Z" => Some(Self::Z),
            _ => None,
        }
    }

    /// Reflection matrix negating this axis.
    #[must_use]
    pub fn matrix(self) -> Matrix4<f64> {
        transform::reflection_matrix(self.index())
    }
}

/// Configured reflection rule for a project.
///
/// An unrecognized axis label leaves the axis unset and disables
/// reflection even when the column matches; this matches the toolkit's
/// historical behavior, which downstream outputs depend on. A warning is
/// logged so the misconfiguration is at least visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectRule {
    enabled: bool,
    column: Option<String>,
    choice: Option<String>,
    axis: Option<ReflectAxis>,
}

impl ReflectRule {
    /// A rule that never reflects.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            column: None,
            choice: None,
            axis: None,
        }
    }

    /// Reads the rule from a parameter set.
    ///
    /// Reflection is off unless `reflect` is `"1"` or `"True"`. The rule
    /// then reads `reflect_column`, `reflect_choice`, and `reflect_axis`.
    #[must_use]
    pub fn from_params(params: &Parameters) -> Self {
        if !params.get_bool("reflect") {
            return Self::disabled();
        }

        let column = params.get("reflect_column").map(str::to_string);
        let choice = params.get("reflect_choice").map(str::to_string);
        let axis = match params.get("reflect_axis") {
            Some(label) => {
                let parsed = ReflectAxis::from_label(label);
                if parsed.is_none() {
                    warn!(axis = label, "Unrecognized reflection axis; reflection disabled");
                }
                parsed
            }
            None => {
                warn!("Reflection enabled but no axis configured; reflection disabled");
                None
            }
        };

        Self {
            enabled: true,
            column,
            choice,
            axis,
        }
    }

    /// Reads the rule from the project's groom-stage parameters.
    ///
    /// A project without a groom stage has reflection off.
    #[must_use]
    pub fn from_project(project: &Project) -> Self {
        project
            .parameters(GROOM_STAGE)
            .map_or_else(Self::disabled, Self::from_params)
    }

    /// Decides whether a subject needs reflection, and along which axis.
    ///
    /// Returns `Some(axis)` only when the rule is enabled, the axis label
    /// was recognized, and the subject's value at the configured column
    /// equals the configured choice.
    #[must_use]
    pub fn needs_reflection(&self, subject: &Subject) -> Option<ReflectAxis> {
        if !self.enabled {
            return None;
        }
        let axis = self.axis?;
        let column = self.column.as_deref()?;
        let choice = self.choice.as_deref()?;
        if subject.extras.value(column) == Some(choice) {
            Some(axis)
        } else {
            None
        }
    }
}

impl Default for ReflectRule {
    fn default() -> Self {
        Self::disabled()
    }
}
