//! Provision command - runs the host-preparation stages.

use crate::config::Config;
use crate::error::{Stage, StageError};
use crate::provision::Provisioner;
use crate::system::{Apt, CurlKeyFetcher, GpgTrustStore, LinuxMountTable, Uname};

/// Execute the provision command. Runs stages 1-4, plus the mount
/// stage when `mount` is set.
pub fn cmd_provision(config: &Config, mount: bool) -> Result<(), StageError> {
    let source = super::repository_source(config)
        .map_err(|e| StageError::new(Stage::Repository, e))?;
    let specs = super::package_specs();

    // Resolve the mount target up front so a missing FSX endpoint
    // fails before any privileged step runs.
    let target = if mount {
        Some(super::mount_target(config).map_err(|e| StageError::new(Stage::Mount, e))?)
    } else {
        None
    };

    let fetcher = CurlKeyFetcher;
    let trust = GpgTrustStore;
    let packages = Apt;
    let mounts = LinuxMountTable;
    let kernel = Uname;

    let provisioner = Provisioner {
        fetcher: &fetcher,
        trust: &trust,
        packages: &packages,
        mounts: &mounts,
        kernel: &kernel,
    };

    let outcome = provisioner.provision(&source, &specs, &config.mount_point, target.as_ref())?;

    println!();
    println!("Provisioning complete:");
    if let Some(keyring) = &outcome.keyring_path {
        println!("  keyring:    {}", keyring.display());
    }
    println!("  repository: {}", source.sources_list_path.display());
    println!("  packages:   {}", outcome.installed_packages.join(", "));
    if outcome.mounted {
        println!(
            "  mounted:    {} at {}",
            target.as_ref().map(|t| t.endpoint.as_str()).unwrap_or(""),
            config.mount_point.display()
        );
    }
    Ok(())
}
