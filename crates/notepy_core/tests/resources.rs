use notepy_core::{AppConfig, ContentLayout, ResourcePaths};

#[test]
fn create_resource_structure_is_idempotent_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ResourcePaths::new(dir.path().join("root"));

    let before = paths.check_resource_structure();
    assert!(!before.root_exists);
    assert!(!before.is_complete());

    paths.create_resource_structure().unwrap();
    paths.create_resource_structure().unwrap();
    AppConfig::load_or_init(&paths).unwrap();

    let after = paths.check_resource_structure();
    assert!(after.is_complete());
    assert!(!after.metadata_file_exists);
}

#[test]
fn load_or_init_writes_defaults_then_reads_edits() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ResourcePaths::new(dir.path());

    let initial = AppConfig::load_or_init(&paths).unwrap();
    assert_eq!(initial, AppConfig::default());
    assert!(paths.config_file.is_file());

    let mut edited = initial.clone();
    edited.server.port = 9100;
    edited.notes.content_layout = ContentLayout::Embedded;
    edited.save(&paths.config_file).unwrap();

    let reloaded = AppConfig::load_or_init(&paths).unwrap();
    assert_eq!(reloaded.server.port, 9100);
    assert_eq!(reloaded.notes.content_layout, ContentLayout::Embedded);
}

#[test]
fn malformed_config_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let paths = ResourcePaths::new(dir.path());
    std::fs::write(&paths.config_file, "[server\nport = ").unwrap();

    let err = AppConfig::load(&paths.config_file).unwrap_err();
    assert!(err.to_string().contains("failed to parse"));
}
