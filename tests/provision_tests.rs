//! End-to-end pipeline tests against the fake capability seams.
//!
//! These exercise the full provisioning sequence the way the CLI runs
//! it, with keyring and descriptor writes landing in a tempdir.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use fsxup::error::{ProvisionError, Stage, StageError, CONFIG_EXIT_CODE};
use fsxup::plan::{MountTarget, PackageSpec, RepositorySource};
use fsxup::testing::{FailingFetcher, FakeSystem};

fn source_in(dir: &TempDir) -> RepositorySource {
    RepositorySource {
        repo_url: "https://fsx-lustre-client-repo.s3.amazonaws.com/ubuntu".into(),
        codename: "jammy".into(),
        component: "main".into(),
        key_url: "https://fsx-lustre-client-repo-public-keys.s3.amazonaws.com\
                  /fsx-ubuntu-public-key.asc"
            .into(),
        keyring_path: dir.path().join("fsx-ubuntu-public-key.gpg"),
        sources_list_path: dir.path().join("fsxlustreclientrepo.list"),
    }
}

fn specs() -> Vec<PackageSpec> {
    vec![PackageSpec::kernel_matched(), PackageSpec::aws_client()]
}

/// The example scenario: clean host, kernel 5.15.0-1034-aws, endpoint
/// set, provision --mount.
#[test]
fn clean_host_provision_with_mount() {
    let dir = TempDir::new().unwrap();
    let sys = FakeSystem::new("5.15.0-1034-aws");
    let source = source_in(&dir);
    let mount_point = dir.path().join("fsx");
    let target = MountTarget::new(
        "fs-0123.fsx.us-east-1.amazonaws.com@tcp:/fsxlustre",
        &mount_point,
        "relatime,flock",
    );

    let outcome = sys
        .provisioner()
        .provision(&source, &specs(), &mount_point, Some(&target))
        .expect("provision should succeed on a clean host");

    // Keyring present at the configured path
    assert!(source.keyring_path.exists());

    // Descriptor present and referencing that keyring
    let descriptor = fs::read_to_string(&source.sources_list_path).unwrap();
    assert_eq!(
        descriptor.trim(),
        format!(
            "deb [signed-by={}] {} jammy main",
            source.keyring_path.display(),
            source.repo_url
        )
    );

    // Both packages installed
    assert_eq!(
        sys.installed(),
        vec![
            "lustre-client-modules-5.15.0-1034-aws".to_string(),
            "lustre-client-modules-aws".to_string(),
        ]
    );

    // Mounted at the mount point
    assert!(outcome.mounted);
    assert!(mount_point.is_dir());
}

#[test]
fn second_run_succeeds_without_error() {
    let dir = TempDir::new().unwrap();
    let sys = FakeSystem::new("5.15.0-1034-aws");
    let source = source_in(&dir);
    let mount_point = dir.path().join("fsx");
    let target = MountTarget::new(
        "fs-0123.fsx.us-east-1.amazonaws.com@tcp:/fsxlustre",
        &mount_point,
        "relatime,flock",
    );

    let provisioner = sys.provisioner();
    provisioner
        .provision(&source, &specs(), &mount_point, Some(&target))
        .unwrap();
    let outcome = provisioner
        .provision(&source, &specs(), &mount_point, Some(&target))
        .expect("re-run must succeed");

    // Already mounted: the second run skips the mount instead of
    // stacking another one.
    assert!(!outcome.mounted);
    assert!(outcome.already_mounted);
    assert_eq!(sys.mount_calls(), 1);
}

#[test]
fn key_fetch_failure_maps_to_signing_key_exit_code() {
    let dir = TempDir::new().unwrap();
    let sys = FakeSystem::new("5.15.0-1034-aws");
    let failing = FailingFetcher;
    let mut provisioner = sys.provisioner();
    provisioner.fetcher = &failing;

    let source = source_in(&dir);
    let err = provisioner
        .provision(&source, &specs(), &dir.path().join("fsx"), None)
        .unwrap_err();

    assert_eq!(err.stage, Stage::SigningKey);
    assert_eq!(err.exit_code(), 10);
    assert!(matches!(err.source, ProvisionError::Network { .. }));

    // Later stages never ran
    assert!(!source.sources_list_path.exists());
    assert_eq!(sys.index_updates(), 0);
    assert!(sys.install_calls().is_empty());
}

#[test]
fn unsupported_kernel_fails_without_partial_install() {
    let dir = TempDir::new().unwrap();
    let sys = FakeSystem::new("6.5.0-custom");
    sys.reject_package("lustre-client-modules-6.5.0-custom");

    let err = sys
        .provisioner()
        .provision(&source_in(&dir), &specs(), &dir.path().join("fsx"), None)
        .unwrap_err();

    assert_eq!(err.stage, Stage::Packages);
    assert_eq!(err.exit_code(), 12);
    let message = err.to_string();
    assert!(message.contains("lustre-client-modules-6.5.0-custom"));

    // The generic package is not left behind from a partial install
    assert!(sys.installed().is_empty());
}

#[test]
fn missing_endpoint_is_a_config_error_before_any_mount_call() {
    let config = fsxup::config::Config {
        endpoint: None,
        mount_point: PathBuf::from("/fsx"),
        mount_options: "relatime,flock".into(),
        repo_url: "https://fsx-lustre-client-repo.s3.amazonaws.com/ubuntu".into(),
        key_url: "https://example.com/key.asc".into(),
        keyring_path: PathBuf::from("/usr/share/keyrings/fsx-ubuntu-public-key.gpg"),
        sources_list_path: PathBuf::from("/etc/apt/sources.list.d/fsxlustreclientrepo.list"),
        codename: Some("jammy".into()),
    };

    let err = config.require_endpoint().unwrap_err();
    let staged = StageError::new(Stage::Mount, err);
    assert_eq!(staged.exit_code(), CONFIG_EXIT_CODE);
}
