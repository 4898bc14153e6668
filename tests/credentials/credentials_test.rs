//! Coverage for credential loading and permission checks.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use agenda::credentials::{load_credentials, load_service_credentials_with, Credentials};

fn temp_env_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join(".env")
}

fn write_private(path: &PathBuf, contents: &str) {
    fs::write(path, contents).expect("write env file");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).expect("chmod 600");
    }
}

#[test]
fn loads_env_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = temp_env_path(&dir);
    write_private(&env_path, "API_KEY=abc123\nOTHER=value\n");

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };
    assert_eq!(credentials.get("API_KEY"), Some("abc123"));
    assert_eq!(credentials.get("OTHER"), Some("value"));
}

#[test]
fn missing_file_is_an_error_for_direct_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_credentials(&temp_env_path(&dir)).is_err());
}

#[cfg(unix)]
#[test]
fn rejects_world_readable_env_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = temp_env_path(&dir);
    fs::write(&env_path, "API_KEY=abc123\n").expect("write");
    fs::set_permissions(&env_path, fs::Permissions::from_mode(0o644)).expect("chmod");

    assert!(load_credentials(&env_path).is_err());
}

#[test]
fn service_credentials_fall_back_to_environment_without_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let credentials = load_service_credentials_with(&temp_env_path(&dir), "API_KEY", |key| {
        (key == "API_KEY").then(|| "from-env".to_owned())
    })
    .expect("load");
    assert_eq!(credentials.get("API_KEY"), Some("from-env"));
}

#[test]
fn environment_wins_over_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env_path = temp_env_path(&dir);
    write_private(&env_path, "API_KEY=from-file\n");

    let from_file = load_service_credentials_with(&env_path, "API_KEY", |_| None).expect("load");
    assert_eq!(from_file.get("API_KEY"), Some("from-file"));

    let overridden = load_service_credentials_with(&env_path, "API_KEY", |_| {
        Some("from-env".to_owned())
    })
    .expect("load");
    assert_eq!(overridden.get("API_KEY"), Some("from-env"));
}

#[test]
fn blank_values_count_as_absent() {
    let mut vars = BTreeMap::new();
    vars.insert("API_KEY".to_owned(), "   ".to_owned());
    let credentials = Credentials::from_map(vars);
    assert_eq!(credentials.get("API_KEY"), None);
    assert_eq!(credentials.get("MISSING"), None);
}

#[test]
fn debug_output_redacts_values() {
    let mut vars = BTreeMap::new();
    vars.insert("API_KEY".to_owned(), "sk-very-secret".to_owned());
    let debug = format!("{:?}", Credentials::from_map(vars));
    assert!(debug.contains("API_KEY"));
    assert!(!debug.contains("sk-very-secret"));
}
