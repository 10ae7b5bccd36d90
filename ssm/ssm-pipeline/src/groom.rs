//! Grooming dispatch.
//!
//! The pipeline never grooms shapes itself; it sets each subject's
//! exclusion/fixed flags for the target stage and delegates to the
//! external [`Groomer`]. A groomer failure propagates unmodified and
//! leaves the project partially flagged but with nothing written.

use tracing::{debug, info};

use ssm_types::{Project, SplitLabel};

use crate::error::Result;
use crate::ports::Groomer;
use crate::reflect::GROOM_STAGE;

/// Grooms the training shapes only.
///
/// Every subject whose split is not `train` is excluded, then the external
/// groomer runs. The groomer mutates subject transforms in place; they are
/// consumed by the reference-frame and training-image stages.
///
/// # Errors
///
/// Propagates the groomer's failure unmodified.
pub fn groom_training_shapes<G: Groomer>(groomer: &G, project: &mut Project) -> Result<()> {
    let mut subjects = project.subjects();
    for subject in &mut subjects {
        subject.excluded = subject.split() != Some(SplitLabel::Train);
    }
    project.set_subjects(subjects);

    info!(
        subject_count = project.subject_count(),
        "Grooming training shapes"
    );
    groomer.groom(project)
}

/// Flags the project for grooming the validation particles.
///
/// Test subjects are excluded; training subjects are marked fixed so the
/// optimizer does not move them while validation particles settle.
pub fn prepare_validation_particles(project: &mut Project) {
    let mut subjects = project.subjects();
    for subject in &mut subjects {
        subject.excluded = subject.split() == Some(SplitLabel::Test);
        subject.fixed = subject.split() == Some(SplitLabel::Train);
    }
    project.set_subjects(subjects);
    debug!("Prepared project for validation particle grooming");
}

/// Grooms the validation shapes.
///
/// # Errors
///
/// Propagates the groomer's failure unmodified.
pub fn groom_validation_shapes<G: Groomer>(groomer: &G, project: &mut Project) -> Result<()> {
    prepare_validation_particles(project);
    info!(
        subject_count = project.subject_count(),
        "Grooming validation shapes"
    );
    groomer.groom(project)
}

/// Index of the reference subject chosen by the alignment stage.
///
/// # Errors
///
/// Returns an error if the groom stage's `alignment_reference_chosen`
/// parameter is missing or not an integer.
pub fn reference_index(project: &Project) -> Result<usize> {
    const KEY: &str = "alignment_reference_chosen";
    let index = project
        .parameters(GROOM_STAGE)
        .map_or(Ok(None), |params| params.get_usize(GROOM_STAGE, KEY))?
        .ok_or_else(|| ssm_types::ProjectError::missing_parameter(GROOM_STAGE, KEY))?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::split::create_split;
    use ssm_types::{Parameters, Subject};
    use std::cell::RefCell;

    /// Records the (excluded, fixed) flags visible at groom time.
    struct RecordingGroomer {
        snapshots: RefCell<Vec<Vec<(bool, bool)>>>,
        fail: bool,
    }

    impl RecordingGroomer {
        fn new() -> Self {
            Self {
                snapshots: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                snapshots: RefCell::new(Vec::new()),
                fail: true,
            }
        }
    }

    impl Groomer for RecordingGroomer {
        fn groom(&self, project: &mut Project) -> Result<()> {
            if self.fail {
                return Err(PipelineError::groom("reference shape degenerate"));
            }
            let flags = project
                .iter_subjects()
                .map(|s| (s.excluded, s.fixed))
                .collect();
            self.snapshots.borrow_mut().push(flags);
            Ok(())
        }
    }

    fn split_project(count: usize) -> Project {
        let mut project = Project::new("/data/study");
        for i in 0..count {
            project.push_subject(Subject::new(format!("s{i}"), format!("s{i}.nrrd")));
        }
        create_split(&mut project);
        project
    }

    #[test]
    fn training_groom_excludes_non_training() {
        let mut project = split_project(20);
        let groomer = RecordingGroomer::new();
        groom_training_shapes(&groomer, &mut project).unwrap();

        let snapshots = groomer.snapshots.borrow();
        let flags = &snapshots[0];
        for (index, subject) in project.iter_subjects().enumerate() {
            let expected = subject.split() != Some(SplitLabel::Train);
            assert_eq!(flags[index].0, expected, "subject {index}");
        }
    }

    #[test]
    fn validation_groom_excludes_test_and_fixes_train() {
        let mut project = split_project(20);
        let groomer = RecordingGroomer::new();
        groom_validation_shapes(&groomer, &mut project).unwrap();

        let snapshots = groomer.snapshots.borrow();
        let flags = &snapshots[0];
        for (index, subject) in project.iter_subjects().enumerate() {
            assert_eq!(flags[index].0, subject.split() == Some(SplitLabel::Test));
            assert_eq!(flags[index].1, subject.split() == Some(SplitLabel::Train));
        }
    }

    #[test]
    fn groom_failure_propagates() {
        let mut project = split_project(10);
        let groomer = RecordingGroomer::failing();
        let err = groom_training_shapes(&groomer, &mut project).unwrap_err();
        assert!(matches!(err, PipelineError::Groom(_)));
        // Flags were still set before the failure
        assert!(project.iter_subjects().any(|s| s.excluded));
    }

    #[test]
    fn reference_index_reads_groom_parameter() {
        let mut project = split_project(10);
        project.set_parameters(
            GROOM_STAGE,
            Parameters::new().with("alignment_reference_chosen", "4"),
        );
        assert_eq!(reference_index(&project).unwrap(), 4);
    }

    #[test]
    fn reference_index_missing_parameter() {
        let project = split_project(10);
        assert!(reference_index(&project).is_err());
    }

    #[test]
    fn reference_index_rejects_non_integer() {
        let mut project = split_project(10);
        project.set_parameters(
            GROOM_STAGE,
            Parameters::new().with("alignment_reference_chosen", "four"),
        );
        assert!(reference_index(&project).is_err());
    }
}
