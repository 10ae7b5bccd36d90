//! Split assignment.
//!
//! Subjects are partitioned once, up front, by a seeded shuffle of their
//! indices: the first `ceil(0.10 * N)` shuffled indices become the test
//! set, the next `ceil(0.10 * N)` the validation set, and the remainder
//! trains. The partition is deterministic for a fixed subject count and
//! ordering; it is not index-compatible with pipelines driven by a
//! different runtime's shuffle.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use ssm_types::{Project, SplitLabel};

/// Fixed seed for the split shuffle.
pub const SPLIT_SEED: u64 = 972;

/// Size of each holdout set (val and test): `ceil(0.10 * count)`.
#[must_use]
pub const fn holdout_size(count: usize) -> usize {
    count.div_ceil(10)
}

/// Assigns every subject exactly one split label.
///
/// Writes the `split` value into each subject's extra attributes and
/// writes the updated subject list back to the project. Re-running over
/// the same subjects reproduces the identical partition.
///
/// # Example
///
/// ```
/// use ssm_pipeline::{create_split, split_indices};
/// use ssm_types::{Project, SplitLabel, Subject};
///
/// let mut project = Project::new("/data/study");
/// for i in 0..50 {
///     project.push_subject(Subject::new(format!("s{i}"), format!("s{i}.nrrd")));
/// }
///
/// create_split(&mut project);
///
/// assert_eq!(split_indices(&project, SplitLabel::Test).len(), 5);
/// assert_eq!(split_indices(&project, SplitLabel::Val).len(), 5);
/// assert_eq!(split_indices(&project, SplitLabel::Train).len(), 40);
/// ```
pub fn create_split(project: &mut Project) {
    let count = project.subject_count();

    let mut indices: Vec<usize> = (0..count).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);

    let holdout = holdout_size(count).min(count);
    let mut test_indices = indices[..holdout].to_vec();
    let mut val_indices = indices[holdout..(2 * holdout).min(count)].to_vec();
    test_indices.sort_unstable();
    val_indices.sort_unstable();

    let mut subjects = project.subjects();
    for (index, subject) in subjects.iter_mut().enumerate() {
        let label = if test_indices.binary_search(&index).is_ok() {
            SplitLabel::Test
        } else if val_indices.binary_search(&index).is_ok() {
            SplitLabel::Val
        } else {
            SplitLabel::Train
        };
        subject.extras.split = Some(label);
    }
    project.set_subjects(subjects);

    info!(
        subject_count = count,
        train = count - test_indices.len() - val_indices.len(),
        val = val_indices.len(),
        test = test_indices.len(),
        "Created split"
    );
}

/// Indices of the subjects assigned to a split, in subject order.
#[must_use]
pub fn split_indices(project: &Project, label: SplitLabel) -> Vec<usize> {
    project
        .iter_subjects()
        .enumerate()
        .filter(|(_, subject)| subject.split() == Some(label))
        .map(|(index, _)| index)
        .collect()
}
