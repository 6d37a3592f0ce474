//! The provisioning pipeline.
//!
//! Five stages, strictly linear, early exit on first failure, no retry.
//! Each stage is idempotent (key and descriptor writes overwrite,
//! install is a no-op when already installed, mkdir -p semantics) so a
//! partially completed run can simply be re-run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ProvisionError, Stage, StageError};
use crate::plan::{MountTarget, PackageSpec, RepositorySource};
use crate::system::{KernelQuery, KeyFetcher, MountTable, PackageManager, TrustStore};

/// What a provisioning run accomplished.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outcome {
    pub keyring_path: Option<PathBuf>,
    pub installed_packages: Vec<String>,
    pub mounted: bool,
    /// Mount was requested but the mount point was already mounted.
    pub already_mounted: bool,
}

/// Runs the host-preparation sequence against the capability seams.
pub struct Provisioner<'a> {
    pub fetcher: &'a dyn KeyFetcher,
    pub trust: &'a dyn TrustStore,
    pub packages: &'a dyn PackageManager,
    pub mounts: &'a dyn MountTable,
    pub kernel: &'a dyn KernelQuery,
}

impl<'a> Provisioner<'a> {
    /// Run stages 1-4, and stage 5 when `mount_target` is given.
    pub fn provision(
        &self,
        source: &RepositorySource,
        specs: &[PackageSpec],
        mount_point: &Path,
        mount_target: Option<&MountTarget>,
    ) -> Result<Outcome, StageError> {
        let mut outcome = Outcome::default();

        println!("[1/5] Importing signing key from {}", source.key_url);
        let keyring = self
            .import_signing_key(&source.key_url, &source.keyring_path)
            .map_err(|e| StageError::new(Stage::SigningKey, e))?;
        outcome.keyring_path = Some(keyring);

        println!("[2/5] Registering repository {}", source.repo_url);
        self.register_repository(source)
            .map_err(|e| StageError::new(Stage::Repository, e))?;

        println!("[3/5] Installing client packages");
        outcome.installed_packages = self
            .install_packages(specs)
            .map_err(|e| StageError::new(Stage::Packages, e))?;

        println!("[4/5] Ensuring mount point {}", mount_point.display());
        self.ensure_mount_point(mount_point)
            .map_err(|e| StageError::new(Stage::MountPoint, e))?;

        match mount_target {
            Some(target) => {
                println!("[5/5] Mounting {}", target.endpoint);
                let mounted = self
                    .mount(target)
                    .map_err(|e| StageError::new(Stage::Mount, e))?;
                outcome.mounted = mounted;
                outcome.already_mounted = !mounted;
                if !mounted {
                    println!(
                        "      {} is already mounted, skipping",
                        target.mount_point.display()
                    );
                }
            }
            None => {
                println!("[5/5] Mount not requested (pass --mount to mount)");
            }
        }

        Ok(outcome)
    }

    /// Fetch the armored key, dearmor it, and write the keyring.
    /// Returns the keyring path the repository descriptor will reference.
    pub fn import_signing_key(
        &self,
        key_url: &str,
        keyring_path: &Path,
    ) -> Result<PathBuf, ProvisionError> {
        let armored = self.fetcher.fetch(key_url)?;
        self.trust.import_key(&armored, keyring_path)?;
        Ok(keyring_path.to_path_buf())
    }

    /// Write the repository descriptor and refresh the package index.
    /// The descriptor references the keyring, so this must run after
    /// `import_signing_key`.
    pub fn register_repository(&self, source: &RepositorySource) -> Result<(), ProvisionError> {
        let line = source.descriptor_line();
        fs::write(&source.sources_list_path, format!("{line}\n")).map_err(|e| {
            permission_or_config(e, &source.sources_list_path)
        })?;

        self.packages.update_index()
    }

    /// Resolve the running kernel release into the kernel-matched spec
    /// and install everything in one package-manager transaction.
    pub fn install_packages(&self, specs: &[PackageSpec]) -> Result<Vec<String>, ProvisionError> {
        let release = self.kernel.release()?;
        let names: Vec<String> = specs.iter().map(|s| s.resolve(&release)).collect();

        self.packages.install(&names)?;
        Ok(names)
    }

    /// Create the mount point directory. Succeeds silently when it
    /// already exists; never touches an existing directory's
    /// permissions or contents.
    pub fn ensure_mount_point(&self, path: &Path) -> Result<(), ProvisionError> {
        fs::create_dir_all(path).map_err(|e| permission_or_config(e, path))
    }

    /// Attach the remote filesystem. Returns false (without error) when
    /// the mount point is already mounted.
    pub fn mount(&self, target: &MountTarget) -> Result<bool, ProvisionError> {
        if self.mounts.is_mounted(&target.mount_point)? {
            return Ok(false);
        }
        self.mounts.mount(target)?;
        Ok(true)
    }
}

fn permission_or_config(e: io::Error, path: &Path) -> ProvisionError {
    if e.kind() == io::ErrorKind::PermissionDenied {
        ProvisionError::Permission {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    } else {
        ProvisionError::Config {
            message: format!("cannot write {}: {e}", path.display()),
        }
    }
}
