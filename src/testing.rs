//! Fake capability implementations for tests.
//!
//! `FakeSystem` implements every seam in [`crate::system`] and records
//! the calls it receives, so pipeline tests can assert on ordering and
//! idempotence without touching the real package database, trust
//! store, or mount table.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ProvisionError;
use crate::plan::MountTarget;
use crate::provision::Provisioner;
use crate::system::{KernelQuery, KeyFetcher, MountTable, PackageManager, TrustStore};

/// In-memory host: package database, trust store, and mount table as
/// plain collections. Keyrings and descriptors are still written to
/// the (tempdir-backed) paths the test supplies.
pub struct FakeSystem {
    kernel_release: String,
    key_material: Vec<u8>,
    rejected_packages: RefCell<HashSet<String>>,
    installed: RefCell<Vec<String>>,
    install_calls: RefCell<Vec<Vec<String>>>,
    index_updates: Cell<usize>,
    mounted: RefCell<HashSet<PathBuf>>,
    mount_calls: Cell<usize>,
}

impl FakeSystem {
    pub fn new(kernel_release: &str) -> Self {
        Self {
            kernel_release: kernel_release.to_string(),
            key_material: b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n...".to_vec(),
            rejected_packages: RefCell::new(HashSet::new()),
            installed: RefCell::new(Vec::new()),
            install_calls: RefCell::new(Vec::new()),
            index_updates: Cell::new(0),
            mounted: RefCell::new(HashSet::new()),
            mount_calls: Cell::new(0),
        }
    }

    /// A Provisioner wired entirely to this fake.
    pub fn provisioner(&self) -> Provisioner<'_> {
        Provisioner {
            fetcher: self,
            trust: self,
            packages: self,
            mounts: self,
            kernel: self,
        }
    }

    /// Make `install` fail for this package name, as apt does when no
    /// prebuilt module exists for the running kernel.
    pub fn reject_package(&self, name: &str) {
        self.rejected_packages.borrow_mut().insert(name.to_string());
    }

    pub fn installed(&self) -> Vec<String> {
        self.installed.borrow().clone()
    }

    pub fn install_calls(&self) -> Vec<Vec<String>> {
        self.install_calls.borrow().clone()
    }

    pub fn index_updates(&self) -> usize {
        self.index_updates.get()
    }

    pub fn mount_calls(&self) -> usize {
        self.mount_calls.get()
    }
}

impl KeyFetcher for FakeSystem {
    fn fetch(&self, _url: &str) -> Result<Vec<u8>, ProvisionError> {
        Ok(self.key_material.clone())
    }
}

impl TrustStore for FakeSystem {
    fn import_key(&self, armored: &[u8], keyring_path: &Path) -> Result<(), ProvisionError> {
        if !armored.starts_with(b"-----BEGIN PGP PUBLIC KEY BLOCK-----") {
            return Err(ProvisionError::Parse {
                reason: "no armored data found".to_string(),
            });
        }
        fs::write(keyring_path, b"dearmored").map_err(|e| ProvisionError::Permission {
            path: keyring_path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

impl PackageManager for FakeSystem {
    fn update_index(&self) -> Result<(), ProvisionError> {
        self.index_updates.set(self.index_updates.get() + 1);
        Ok(())
    }

    fn install(&self, packages: &[String]) -> Result<(), ProvisionError> {
        self.install_calls.borrow_mut().push(packages.to_vec());

        // apt resolves the whole request before installing anything
        if let Some(missing) = packages
            .iter()
            .find(|p| self.rejected_packages.borrow().contains(p.as_str()))
        {
            return Err(ProvisionError::PackageNotFound {
                package: missing.clone(),
                reason: format!("E: Unable to locate package {missing}"),
            });
        }

        let mut installed = self.installed.borrow_mut();
        for package in packages {
            if !installed.contains(package) {
                installed.push(package.clone());
            }
        }
        Ok(())
    }
}

impl MountTable for FakeSystem {
    fn is_mounted(&self, mount_point: &Path) -> Result<bool, ProvisionError> {
        Ok(self.mounted.borrow().contains(mount_point))
    }

    fn mount(&self, target: &MountTarget) -> Result<(), ProvisionError> {
        self.mount_calls.set(self.mount_calls.get() + 1);
        self.mounted.borrow_mut().insert(target.mount_point.clone());
        Ok(())
    }
}

impl KernelQuery for FakeSystem {
    fn release(&self) -> Result<String, ProvisionError> {
        Ok(self.kernel_release.clone())
    }
}

/// KeyFetcher that always fails, simulating a network outage.
pub struct FailingFetcher;

impl KeyFetcher for FailingFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ProvisionError> {
        Err(ProvisionError::Network {
            url: url.to_string(),
            reason: "curl: (7) Failed to connect".to_string(),
        })
    }
}
