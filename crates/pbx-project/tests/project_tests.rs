use pbx_graph::{ObjectId, SourceTree, SourceTreeFolder};
use pbx_project::{
    project_name, LoadOptions, ProjectConfig, ProjectError, ProjectState, ReferenceCheck,
    XcProjectFile, PBXPROJ_FILE_NAME,
};
use pbx_test_utils::{file_reference, ids, sample_builder, sample_project_text};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_package(dir: &Path, text: &str) -> PathBuf {
    let package = dir.join("App.xcodeproj");
    fs::create_dir_all(&package).unwrap();
    fs::write(package.join(PBXPROJ_FILE_NAME), text).unwrap();
    package
}

#[test]
fn open_edit_save_reopen() {
    let tmp = TempDir::new().unwrap();
    let package = write_package(tmp.path(), &sample_project_text());

    let mut file = XcProjectFile::open(&package, LoadOptions::new()).unwrap();
    assert_eq!(file.location(), Some(package.as_path()));
    assert_eq!(file.project_dir(), tmp.path().to_path_buf());

    let app = file.target_named("App").unwrap();
    let notes = file.new_file_reference(None, "notes.c", SourceTree::Group);
    let notes_id = notes.id().clone();
    file.add_source_files(vec![notes], None, &[app]).unwrap();
    file.save().unwrap();

    let mut reopened = XcProjectFile::open(&package, LoadOptions::new()).unwrap();
    assert!(reopened.store().contains(&notes_id));
    assert!(reopened.validate().is_empty());
    assert_eq!(
        reopened.full_path(&notes_id),
        Some(tmp.path().join("notes.c"))
    );
}

#[test]
fn saving_twice_writes_identical_text() {
    let tmp = TempDir::new().unwrap();
    let package = write_package(tmp.path(), &sample_project_text());
    let mut file = XcProjectFile::open(&package, LoadOptions::new()).unwrap();

    file.save().unwrap();
    let first = fs::read_to_string(package.join(PBXPROJ_FILE_NAME)).unwrap();
    file.save().unwrap();
    let second = fs::read_to_string(package.join(PBXPROJ_FILE_NAME)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn write_to_creates_the_package() {
    let tmp = TempDir::new().unwrap();
    let mut file = XcProjectFile::parse(&sample_project_text(), LoadOptions::new()).unwrap();
    assert!(matches!(file.save(), Err(ProjectError::NotXcodeproj(_))));

    let package = tmp.path().join("nested").join("Copy.xcodeproj");
    file.write_to(&package).unwrap();
    assert!(package.join(PBXPROJ_FILE_NAME).is_file());
    assert_eq!(project_name(&package).unwrap(), "Copy");
}

#[test]
fn open_rejects_bad_locations() {
    let tmp = TempDir::new().unwrap();
    let err = XcProjectFile::open(&tmp.path().join("App.xcworkspace"), LoadOptions::new())
        .unwrap_err();
    assert!(matches!(err, ProjectError::NotXcodeproj(_)));

    let empty = tmp.path().join("Empty.xcodeproj");
    fs::create_dir_all(&empty).unwrap();
    let err = XcProjectFile::open(&empty, LoadOptions::new()).unwrap_err();
    assert!(matches!(err, ProjectError::MissingPbxproj(path) if path == empty));
}

#[test]
fn open_reports_malformed_text() {
    let tmp = TempDir::new().unwrap();
    let package = write_package(tmp.path(), "{ not json");
    let err = XcProjectFile::open(&package, LoadOptions::new()).unwrap_err();
    assert!(matches!(err, ProjectError::InvalidData(_)), "{err}");
}

#[test]
fn reference_check_modes() {
    let text = sample_builder()
        .object("AA0000000000000000000099", file_reference("stray.c", "<group>", "sourcecode.c.c"))
        .build()
        .to_string();
    let tmp = TempDir::new().unwrap();
    let package = write_package(tmp.path(), &text);

    let err = XcProjectFile::open(&package, LoadOptions::new()).unwrap_err();
    let report = err.report().unwrap();
    assert_eq!(report.len(), 1);

    let options = LoadOptions::new().with_reference_check(ReferenceCheck::Report);
    let mut file = XcProjectFile::open(&package, options).unwrap();
    assert!(matches!(file.state(), ProjectState::Invalid(report) if report.len() == 1));
    assert!(matches!(file.save(), Err(ProjectError::UnsafeToEncode(1))));

    let options = LoadOptions::new().with_reference_check(ReferenceCheck::Ignore);
    let mut file = XcProjectFile::open(&package, options).unwrap();
    assert!(file.is_valid());
    file.save().unwrap();
}

#[test]
fn configured_source_trees() {
    let tmp = TempDir::new().unwrap();
    let package = write_package(tmp.path(), &sample_project_text());
    let config_path = tmp.path().join("pbx.toml");
    fs::write(
        &config_path,
        "[source_trees]\nBUILT_PRODUCTS_DIR = \"/tmp/build/Debug\"\n",
    )
    .unwrap();

    let config = ProjectConfig::load(&config_path).unwrap();
    assert_eq!(
        config.base_for(SourceTreeFolder::BuildProductsDir, tmp.path()),
        PathBuf::from("/tmp/build/Debug")
    );

    let file = XcProjectFile::open_with_config(&package, config).unwrap();
    assert_eq!(
        file.full_path(&ObjectId::from(ids::APP_PRODUCT)),
        Some(PathBuf::from("/tmp/build/Debug/App.app"))
    );
    assert_eq!(
        file.full_path(&ObjectId::from(ids::MAIN_C)),
        Some(tmp.path().join("Sources").join("main.c"))
    );
    assert_eq!(
        file.full_path(&ObjectId::from(ids::LIB_A)),
        Some(PathBuf::from("/opt/vendor/lib.a"))
    );
}

#[test]
fn missing_config_file_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let err = ProjectConfig::load(&tmp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ProjectError::Io { .. }));
}
