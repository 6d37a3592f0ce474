//! Mount command - attaches the remote filesystem without provisioning.
//!
//! The original setup runs installation and mounting as two separate
//! remote commands; this subcommand covers the second half on a host
//! that is already provisioned.

use crate::config::Config;
use crate::error::{Stage, StageError};
use crate::provision::Provisioner;
use crate::system::{Apt, CurlKeyFetcher, GpgTrustStore, LinuxMountTable, Uname};

/// Execute the mount command.
pub fn cmd_mount(config: &Config) -> Result<(), StageError> {
    let target = super::mount_target(config).map_err(|e| StageError::new(Stage::Mount, e))?;

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

    provisioner
        .ensure_mount_point(&config.mount_point)
        .map_err(|e| StageError::new(Stage::MountPoint, e))?;

    let mounted = provisioner
        .mount(&target)
        .map_err(|e| StageError::new(Stage::Mount, e))?;

    if mounted {
        println!("Mounted {} at {}", target.endpoint, config.mount_point.display());
    } else {
        println!(
            "{} is already mounted, nothing to do",
            config.mount_point.display()
        );
    }
    Ok(())
}
