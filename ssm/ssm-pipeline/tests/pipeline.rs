//! End-to-end pipeline tests over fake toolkit ports.
//!
//! The fakes track geometry only: loading and writing images moves
//! [`ImageGeometry`] values through a shared in-memory store, which is
//! enough to verify stage ordering, the file contract, and the transform
//! bookkeeping without a real image backend.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nalgebra::{Matrix4, Point3, Vector3};

use ssm_pipeline::ports::{
    AugmentationRequest, Augmentor, Groomer, ImageGeometry, ImageRegistrar, ImageSource,
    Interpolation, LoaderFactory, MeshSource, RegistrationKind, VolumeImage,
};
use ssm_pipeline::{
    create_split, groom_training_images, groom_training_shapes, groom_val_test_images,
    groom_validation_shapes, prepare_data_loaders, prepare_reference_frame, run_data_augmentation,
    split_indices, AugmentationConfig, PipelineError, StageLayout, GROOM_STAGE,
};
use ssm_types::{transform, GroomedMesh, Parameters, PhysicalRegion, Project, SplitLabel, Subject};

type Result<T> = ssm_pipeline::Result<T>;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ImageStoreInner {
    images: RefCell<HashMap<PathBuf, ImageGeometry>>,
    writes: RefCell<Vec<PathBuf>>,
    resample_targets: RefCell<Vec<ImageGeometry>>,
    transformed: RefCell<Vec<PathBuf>>,
}

/// Shared geometry-only image backend.
#[derive(Clone, Default)]
struct FakeImages(Rc<ImageStoreInner>);

impl FakeImages {
    fn insert(&self, path: impl Into<PathBuf>, geometry: ImageGeometry) {
        self.0.images.borrow_mut().insert(path.into(), geometry);
    }

    fn geometry_of(&self, path: &Path) -> Option<ImageGeometry> {
        self.0.images.borrow().get(path).cloned()
    }

    fn wrote(&self, path: &Path) -> bool {
        self.0.writes.borrow().iter().any(|p| p == path)
    }
}

struct FakeImage {
    source: PathBuf,
    geometry: ImageGeometry,
    store: Rc<ImageStoreInner>,
}

impl VolumeImage for FakeImage {
    fn geometry(&self) -> ImageGeometry {
        self.geometry.clone()
    }

    fn set_origin(&mut self, origin: Point3<f64>) {
        self.geometry.origin = origin;
    }

    fn apply_transform(&mut self, matrix: &Matrix4<f64>) -> Result<()> {
        // Geometry-only semantics: push the origin through the transform.
        self.geometry.origin = matrix.transform_point(&self.geometry.origin);
        self.store.transformed.borrow_mut().push(self.source.clone());
        Ok(())
    }

    fn resample_into(
        &mut self,
        _matrix: &Matrix4<f64>,
        target: &ImageGeometry,
        _interpolation: Interpolation,
        _mesh_transform: bool,
    ) -> Result<()> {
        self.store.resample_targets.borrow_mut().push(target.clone());
        self.geometry = target.clone();
        Ok(())
    }

    fn crop(&mut self, region: &PhysicalRegion) -> Result<()> {
        let size = region.size();
        self.geometry.origin = region.min;
        self.geometry.dims = [
            (size.x / self.geometry.spacing.x).round() as usize,
            (size.y / self.geometry.spacing.y).round() as usize,
            (size.z / self.geometry.spacing.z).round() as usize,
        ];
        Ok(())
    }

    fn write(&self, path: &Path) -> Result<()> {
        self.store
            .images
            .borrow_mut()
            .insert(path.to_path_buf(), self.geometry.clone());
        self.store.writes.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

impl ImageSource for FakeImages {
    type Image = FakeImage;

    fn load(&self, path: &Path) -> Result<FakeImage> {
        let geometry = self.geometry_of(path).ok_or_else(|| {
            PipelineError::image(format!("no such image: {}", path.display()))
        })?;
        Ok(FakeImage {
            source: path.to_path_buf(),
            geometry,
            store: Rc::clone(&self.0),
        })
    }
}

/// Serves the same unit-box mesh for every groomed file.
struct FakeMeshes;

impl MeshSource for FakeMeshes {
    fn load_mesh(&self, _path: &Path) -> Result<GroomedMesh> {
        Ok(GroomedMesh::from_points(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 2.0),
        ]))
    }
}

#[derive(Default)]
struct FakeGroomer {
    calls: RefCell<usize>,
}

impl Groomer for FakeGroomer {
    fn groom(&self, _project: &mut Project) -> Result<()> {
        *self.calls.borrow_mut() += 1;
        Ok(())
    }
}

/// Returns a distinct fixed matrix per registration kind and records calls.
#[derive(Default)]
struct FakeRegistrar {
    calls: RefCell<Vec<(PathBuf, PathBuf, RegistrationKind)>>,
    fail_on: Option<RegistrationKind>,
}

impl FakeRegistrar {
    fn translation_result() -> Matrix4<f64> {
        transform::translation_matrix(&Vector3::new(0.5, 0.0, 0.0))
    }

    fn rigid_result() -> Matrix4<f64> {
        transform::translation_matrix(&Vector3::new(0.0, 0.25, 0.0))
    }

    fn similarity_result() -> Matrix4<f64> {
        Matrix4::new_scaling(2.0)
    }
}

impl ImageRegistrar for FakeRegistrar {
    fn register(
        &self,
        fixed: &Path,
        moving: &Path,
        kind: RegistrationKind,
    ) -> Result<Matrix4<f64>> {
        if self.fail_on == Some(kind) {
            return Err(PipelineError::registration(kind, "did not converge"));
        }
        self.calls
            .borrow_mut()
            .push((fixed.to_path_buf(), moving.to_path_buf(), kind));
        Ok(match kind {
            RegistrationKind::Translation => Self::translation_result(),
            RegistrationKind::Rigid => Self::rigid_result(),
            RegistrationKind::Similarity => Self::similarity_result(),
        })
    }
}

#[derive(Default)]
struct FakeAugmentor {
    requests: RefCell<Vec<AugmentationRequest>>,
}

impl Augmentor for FakeAugmentor {
    fn augment(&self, request: &AugmentationRequest) -> Result<usize> {
        self.requests.borrow_mut().push(request.clone());
        Ok(7)
    }
}

#[derive(Debug, PartialEq)]
enum LoaderCall {
    Train(PathBuf, usize),
    Validation(Vec<PathBuf>, Vec<PathBuf>),
    Test(Vec<PathBuf>),
}

#[derive(Default)]
struct FakeLoaderFactory {
    calls: RefCell<Vec<LoaderCall>>,
}

impl LoaderFactory for FakeLoaderFactory {
    fn build_train_loader(
        &self,
        _loader_dir: &Path,
        data_csv: &Path,
        batch_size: usize,
    ) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(LoaderCall::Train(data_csv.to_path_buf(), batch_size));
        Ok(())
    }

    fn build_validation_loader(
        &self,
        _loader_dir: &Path,
        image_files: &[PathBuf],
        particle_files: &[PathBuf],
    ) -> Result<()> {
        self.calls.borrow_mut().push(LoaderCall::Validation(
            image_files.to_vec(),
            particle_files.to_vec(),
        ));
        Ok(())
    }

    fn build_test_loader(&self, _loader_dir: &Path, image_files: &[PathBuf]) -> Result<()> {
        self.calls
            .borrow_mut()
            .push(LoaderCall::Test(image_files.to_vec()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

const SUBJECT_COUNT: usize = 20;

struct Fixture {
    project: Project,
    layout: StageLayout,
    images: FakeImages,
    _dir: tempfile::TempDir,
}

/// Twenty subjects, identity transforms, all images 10x10x10 at the origin
/// with unit spacing. Split already assigned; the reference parameter
/// points at the first training subject.
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let mut project = Project::new(dir.path());

    let images = FakeImages::default();
    for i in 0..SUBJECT_COUNT {
        let image_file = dir.path().join(format!("images/s{i}.nrrd"));
        images.insert(
            &image_file,
            ImageGeometry::new(Point3::origin(), [10, 10, 10], Vector3::new(1.0, 1.0, 1.0)),
        );
        let mut subject = Subject::new(format!("s{i}"), image_file)
            .with_groomed_file(format!("groomed/s{i}.vtk"))
            .with_world_particle_file(format!("particles/s{i}_world.particles"));
        subject.extras.insert_other("sex", "M");
        project.push_subject(subject);
    }

    create_split(&mut project);

    let reference = split_indices(&project, SplitLabel::Train)[0];
    project.set_parameters(
        GROOM_STAGE,
        Parameters::new().with("alignment_reference_chosen", reference.to_string()),
    );

    let layout = StageLayout::for_project(&project);
    Fixture {
        project,
        layout,
        images,
        _dir: dir,
    }
}

/// The fixture's training bounding box: unit-box meshes (0..2) under
/// identity alignment, padded by 10.
fn fixture_bounds() -> PhysicalRegion {
    PhysicalRegion::new(Point3::new(-10.0, -10.0, -10.0), Point3::new(12.0, 12.0, 12.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn reference_frame_centers_image_and_persists_bounds() {
    let mut f = fixture();
    let groomer = FakeGroomer::default();
    groom_training_shapes(&groomer, &mut f.project).unwrap();

    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    // Mesh center is (1,1,1); the image origin moved from (0,0,0) to
    // (-1,-1,-1) so the mesh center sits at the world origin.
    let reference = f.images.geometry_of(&f.layout.reference_image()).unwrap();
    assert_eq!(reference.origin, Point3::new(-1.0, -1.0, -1.0));

    let text = fs::read_to_string(f.layout.bounding_box()).unwrap();
    let bounds: PhysicalRegion = text.parse().unwrap();
    assert_eq!(bounds, fixture_bounds());
    // Byte-stable round trip
    assert_eq!(bounds.to_string(), text);
}

#[test]
fn training_images_resample_into_reference_geometry() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    groom_training_images(&f.images, &f.project, &f.layout).unwrap();

    let train = split_indices(&f.project, SplitLabel::Train);
    for index in &train {
        assert!(
            f.images.wrote(&f.layout.train_image(*index)),
            "missing train image {index}"
        );
    }
    // Every training subject resampled into the reference geometry first
    let reference = f.images.geometry_of(&f.layout.reference_image()).unwrap();
    let targets = f.images.0.resample_targets.borrow();
    assert_eq!(targets.len(), train.len());
    assert!(targets.iter().all(|t| *t == reference));
}

#[test]
fn cascade_registers_coarse_to_fine_per_subject() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    let registrar = FakeRegistrar::default();
    groom_val_test_images(&f.images, &registrar, &mut f.project, &f.layout).unwrap();

    let mut expected_order = split_indices(&f.project, SplitLabel::Val);
    expected_order.extend(split_indices(&f.project, SplitLabel::Test));

    let calls = registrar.calls.borrow();
    assert_eq!(calls.len(), 3 * expected_order.len());

    for (slot, index) in expected_order.iter().enumerate() {
        let moving = f.layout.val_test_image(*index);
        let per_subject = &calls[slot * 3..slot * 3 + 3];
        assert_eq!(
            per_subject[0],
            (
                f.layout.large_cropped_reference(),
                moving.clone(),
                RegistrationKind::Translation
            )
        );
        assert_eq!(
            per_subject[1],
            (
                f.layout.medium_cropped_reference(),
                moving.clone(),
                RegistrationKind::Rigid
            )
        );
        assert_eq!(
            per_subject[2],
            (
                f.layout.cropped_reference(),
                moving,
                RegistrationKind::Similarity
            )
        );
    }
}

#[test]
fn cascade_crops_follow_the_pad_sequence() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    groom_val_test_images(&f.images, &FakeRegistrar::default(), &mut f.project, &f.layout)
        .unwrap();

    let bounds = fixture_bounds();
    let large = f
        .images
        .geometry_of(&f.layout.large_cropped_reference())
        .unwrap();
    let medium = f
        .images
        .geometry_of(&f.layout.medium_cropped_reference())
        .unwrap();
    let exact = f.images.geometry_of(&f.layout.cropped_reference()).unwrap();

    assert_eq!(large.origin, bounds.pad(80.0).min);
    assert_eq!(medium.origin, bounds.pad(20.0).min);
    assert_eq!(exact.origin, bounds.min);
    assert_eq!(large.dims, [182, 182, 182]);
    assert_eq!(medium.dims, [62, 62, 62]);
    assert_eq!(exact.dims, [22, 22, 22]);
}

#[test]
fn cascade_composes_transforms_in_application_order() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    groom_val_test_images(&f.images, &FakeRegistrar::default(), &mut f.project, &f.layout)
        .unwrap();

    // Reference center: origin (-1,-1,-1), extent 10 -> (4,4,4).
    // Subject center: origin (0,0,0), extent 10 -> (5,5,5).
    let recenter = transform::translation_matrix(&Vector3::new(-1.0, -1.0, -1.0));
    let expected = FakeRegistrar::similarity_result()
        * FakeRegistrar::rigid_result()
        * FakeRegistrar::translation_result()
        * recenter;

    for index in split_indices(&f.project, SplitLabel::Val) {
        let subject = f.project.subject(index).unwrap();
        let stored = subject
            .extras
            .registration_transform
            .as_deref()
            .expect("registration transform stored");
        let matrix = transform::matrix_from_string(stored).unwrap();
        assert_eq!(matrix, expected, "subject {index}");
    }
}

#[test]
fn cascade_applies_reflection_per_matching_subject() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();

    // Reflect females along X; exactly one validation subject is female.
    let reference = split_indices(&f.project, SplitLabel::Train)[0];
    f.project.set_parameters(
        GROOM_STAGE,
        Parameters::new()
            .with("alignment_reference_chosen", reference.to_string())
            .with("reflect", "1")
            .with("reflect_column", "sex")
            .with("reflect_choice", "F")
            .with("reflect_axis", "X"),
    );
    let female = split_indices(&f.project, SplitLabel::Val)[0];
    let mut subjects = f.project.subjects();
    subjects[female].extras.insert_other("sex", "F");
    let female_image = subjects[female].image_file.clone();
    f.project.set_subjects(subjects);

    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();
    groom_val_test_images(&f.images, &FakeRegistrar::default(), &mut f.project, &f.layout)
        .unwrap();

    let transformed = f.images.0.transformed.borrow();
    assert_eq!(transformed.as_slice(), [female_image.clone()]);

    // The reflection premultiplies before the recenter translation.
    let mut accumulated = transform::reflection_matrix(0);
    transform::add_translation(&mut accumulated, &Vector3::new(-1.0, -1.0, -1.0));
    let expected = FakeRegistrar::similarity_result()
        * FakeRegistrar::rigid_result()
        * FakeRegistrar::translation_result()
        * accumulated;

    let stored = f
        .project
        .subject(female)
        .unwrap()
        .extras
        .registration_transform
        .as_deref()
        .unwrap();
    assert_eq!(transform::matrix_from_string(stored).unwrap(), expected);
}

#[test]
fn cascade_failure_saves_no_partial_transform() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();

    let registrar = FakeRegistrar {
        fail_on: Some(RegistrationKind::Rigid),
        ..FakeRegistrar::default()
    };
    let err =
        groom_val_test_images(&f.images, &registrar, &mut f.project, &f.layout).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Registration {
            kind: RegistrationKind::Rigid,
            ..
        }
    ));

    assert!(f
        .project
        .iter_subjects()
        .all(|s| s.extras.registration_transform.is_none()));
}

#[test]
fn augmentation_persists_embedded_dim() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();
    groom_training_images(&f.images, &f.project, &f.layout).unwrap();

    let augmentor = FakeAugmentor::default();
    let config = AugmentationConfig::new(100).with_num_dims(12);
    let dim = run_data_augmentation(&augmentor, &f.project, &f.layout, &config).unwrap();

    assert_eq!(dim, 7);
    assert_eq!(
        fs::read_to_string(f.layout.embedded_dim()).unwrap(),
        "7"
    );

    let requests = augmentor.requests.borrow();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.output_dir, f.layout.augmentation_dir());
    assert_eq!(request.num_samples, 100);
    assert_eq!(request.num_dims, 12);

    let train = split_indices(&f.project, SplitLabel::Train);
    let expected_images: Vec<PathBuf> =
        train.iter().map(|i| f.layout.train_image(*i)).collect();
    assert_eq!(request.image_files, expected_images);
    let expected_particles: Vec<PathBuf> = train
        .iter()
        .map(|i| f.project.subject(*i).unwrap().world_particle_file.clone())
        .collect();
    assert_eq!(request.particle_files, expected_particles);
}

#[test]
fn loaders_receive_per_split_manifests() {
    let mut f = fixture();
    groom_training_shapes(&FakeGroomer::default(), &mut f.project).unwrap();

    let factory = FakeLoaderFactory::default();
    prepare_data_loaders(&factory, &f.project, &f.layout, 8).unwrap();

    let val = split_indices(&f.project, SplitLabel::Val);
    let test = split_indices(&f.project, SplitLabel::Test);
    let val_images: Vec<PathBuf> = val.iter().map(|i| f.layout.val_test_image(*i)).collect();
    let val_particles: Vec<PathBuf> = val
        .iter()
        .map(|i| f.project.subject(*i).unwrap().world_particle_file.clone())
        .collect();
    let test_images: Vec<PathBuf> = test.iter().map(|i| f.layout.val_test_image(*i)).collect();

    let calls = factory.calls.borrow();
    assert_eq!(
        calls.as_slice(),
        [
            LoaderCall::Train(f.layout.total_data_csv(), 8),
            LoaderCall::Validation(val_images, val_particles),
            LoaderCall::Test(test_images),
        ]
    );
}

#[test]
fn full_pipeline_runs_all_stages_in_sequence() {
    let mut f = fixture();
    let groomer = FakeGroomer::default();

    groom_training_shapes(&groomer, &mut f.project).unwrap();
    prepare_reference_frame(&f.images, &FakeMeshes, &f.project, &f.layout).unwrap();
    groom_training_images(&f.images, &f.project, &f.layout).unwrap();
    groom_validation_shapes(&groomer, &mut f.project).unwrap();
    groom_val_test_images(&f.images, &FakeRegistrar::default(), &mut f.project, &f.layout)
        .unwrap();
    run_data_augmentation(
        &FakeAugmentor::default(),
        &f.project,
        &f.layout,
        &AugmentationConfig::default(),
    )
    .unwrap();
    prepare_data_loaders(&FakeLoaderFactory::default(), &f.project, &f.layout, 4).unwrap();

    assert_eq!(*groomer.calls.borrow(), 2);

    // Every val/test subject ends with a stored registration transform;
    // training subjects do not.
    for (index, subject) in f.project.iter_subjects().enumerate() {
        let expect_transform = subject.split() != Some(SplitLabel::Train);
        assert_eq!(
            subject.extras.registration_transform.is_some(),
            expect_transform,
            "subject {index}"
        );
    }

    // The project round-trips through JSON with its transforms intact.
    let json = f.project.to_json().unwrap();
    let back = Project::from_json(&json).unwrap();
    assert_eq!(back, f.project);
}
