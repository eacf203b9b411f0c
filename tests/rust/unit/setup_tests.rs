use std::fs;
use std::path::Path;

use chrono::Utc;
use serial_test::serial;

use smart_kuku::auth::{hash_password, verify_password};
use smart_kuku::models::accounts::{Role, User};
use smart_kuku::setup::{self, AdminOutcome, SetupError, StepOutcome};
use smart_kuku::store::{snapshot, Tables};

const ENV_KEYS: [&str; 4] = ["ADMIN_USERNAME", "ADMIN_EMAIL", "ADMIN_PASSWORD", "SMART_KUKU_DATA_FILE"];

/// `.env` values never override variables that are already set, so each test
/// starts from a clean slate.
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn project(template: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(setup::ENV_TEMPLATE), template).unwrap();
    dir
}

fn admin(data_file: &Path) -> User {
    snapshot::load(data_file)
        .unwrap()
        .user_by_username("admin")
        .cloned()
        .unwrap()
}

#[test]
#[serial]
fn setup_runs_twice() {
    clear_env();
    let dir = project("ADMIN_PASSWORD=first-password\nSMART_KUKU_DATA_FILE=data/kuku.json\n");

    let first = setup::run(dir.path(), None).unwrap();
    assert_eq!(first.env_file, StepOutcome::Performed);
    assert_eq!(first.data_dir, StepOutcome::Performed);
    assert_eq!(first.migrate, StepOutcome::Performed);
    assert_eq!(first.admin, AdminOutcome::Created);
    assert_eq!(first.data_file, dir.path().join("data/kuku.json"));

    let second = setup::run(dir.path(), None).unwrap();
    assert_eq!(second.env_file, StepOutcome::Skipped);
    assert_eq!(second.data_dir, StepOutcome::Skipped);
    assert_eq!(second.migrate, StepOutcome::Skipped);
    assert_eq!(second.admin, AdminOutcome::Updated);

    let tables = snapshot::load(&second.data_file).unwrap();
    assert_eq!(tables.users.len(), 1);
    clear_env();
}

#[test]
#[serial]
fn existing_env_file_is_kept() {
    clear_env();
    let dir = project("ADMIN_PASSWORD=from-template\n");
    fs::write(dir.path().join(setup::ENV_FILE), "ADMIN_PASSWORD=from-env-file\n").unwrap();
    let data_file = dir.path().join("kuku.json");

    let report = setup::run(dir.path(), Some(&data_file)).unwrap();
    assert_eq!(report.env_file, StepOutcome::Skipped);
    assert!(verify_password("from-env-file", &admin(&data_file).password_hash));
    clear_env();
}

#[test]
#[serial]
fn existing_admin_gets_configured_password() {
    clear_env();
    let dir = project("ADMIN_PASSWORD=configured-password\n");
    let data_file = dir.path().join("data").join("kuku.json");
    fs::create_dir_all(data_file.parent().unwrap()).unwrap();

    let mut tables = Tables::default();
    let mut existing = User::new("admin", "someone@example.com", Utc::now());
    existing.password_hash = hash_password("stale-password").unwrap();
    tables.insert(existing);
    snapshot::save(&data_file, &tables).unwrap();

    let report = setup::run(dir.path(), Some(&data_file)).unwrap();
    assert_eq!(report.admin, AdminOutcome::Updated);

    let admin = admin(&data_file);
    assert!(verify_password("configured-password", &admin.password_hash));
    assert!(!verify_password("stale-password", &admin.password_hash));
    assert_eq!(admin.role, Role::Admin);
    assert!(admin.is_staff && admin.is_superuser && admin.is_active);
    clear_env();
}

#[test]
#[serial]
fn new_admin_gets_configured_password() {
    clear_env();
    let dir = project("ADMIN_USERNAME=admin\nADMIN_PASSWORD=fresh-password\n");
    let data_file = dir.path().join("kuku.json");

    setup::run(dir.path(), Some(&data_file)).unwrap();
    assert!(verify_password("fresh-password", &admin(&data_file).password_hash));
    clear_env();
}

#[test]
#[serial]
fn missing_template_stops_setup() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let data_file = dir.path().join("kuku.json");
    let err = setup::run(dir.path(), Some(&data_file)).unwrap_err();
    assert!(matches!(err, SetupError::MissingEnvTemplate(_)));
    assert!(!data_file.exists());
}

#[test]
#[serial]
fn corrupt_snapshot_stops_setup() {
    clear_env();
    let dir = project("ADMIN_PASSWORD=whatever-password\n");
    let data_file = dir.path().join("kuku.json");
    fs::write(&data_file, "{ not json").unwrap();
    let err = setup::run(dir.path(), Some(&data_file)).unwrap_err();
    assert!(matches!(err, SetupError::Store(_)));
    clear_env();
}
