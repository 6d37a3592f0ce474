//! Configuration loading tests.
//!
//! These mutate the process environment, so they are serialized.

use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use fsxup::config::{Config, DEFAULT_MOUNT_OPTIONS, DEFAULT_REPO_URL};

const VARS: &[&str] = &[
    "FSX",
    "FSX_MOUNT_POINT",
    "FSX_MOUNT_OPTIONS",
    "FSX_REPO_URL",
    "FSX_KEY_URL",
    "FSX_KEYRING_PATH",
    "FSX_SOURCES_LIST",
    "FSX_CODENAME",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_with_empty_environment() {
    clear_env();
    let dir = TempDir::new().unwrap();

    let config = Config::load(dir.path());

    assert_eq!(config.endpoint, None);
    assert_eq!(config.mount_point, PathBuf::from("/fsx"));
    assert_eq!(config.mount_options, DEFAULT_MOUNT_OPTIONS);
    assert_eq!(config.repo_url, DEFAULT_REPO_URL);
    assert_eq!(config.codename, None);
}

#[test]
#[serial]
fn env_file_is_read_from_base_dir() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "# endpoint for the dev filesystem\n\
         FSX=fs-0123.fsx.us-east-1.amazonaws.com@tcp:/fsxlustre\n\
         FSX_MOUNT_POINT=\"/mnt/fsx\"\n",
    )
    .unwrap();

    let config = Config::load(dir.path());

    assert_eq!(
        config.endpoint.as_deref(),
        Some("fs-0123.fsx.us-east-1.amazonaws.com@tcp:/fsxlustre")
    );
    // Quotes are stripped
    assert_eq!(config.mount_point, PathBuf::from("/mnt/fsx"));
}

#[test]
#[serial]
fn environment_overrides_env_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "FSX_CODENAME=focal\n").unwrap();
    std::env::set_var("FSX_CODENAME", "jammy");

    let config = Config::load(dir.path());
    assert_eq!(config.codename.as_deref(), Some("jammy"));

    std::env::remove_var("FSX_CODENAME");
}

#[test]
#[serial]
fn empty_values_fall_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::env::set_var("FSX_MOUNT_OPTIONS", "");

    let config = Config::load(dir.path());
    assert_eq!(config.mount_options, DEFAULT_MOUNT_OPTIONS);

    std::env::remove_var("FSX_MOUNT_OPTIONS");
}
