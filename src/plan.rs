//! Data model for a provisioning run.
//!
//! Everything here is ephemeral: the installed packages, keyring,
//! repository descriptor, and mount all live in OS-owned state, not in
//! this tool.

use std::path::{Path, PathBuf};

/// Package containing Lustre modules built against a specific kernel.
/// The running kernel release is appended at run time.
pub const KERNEL_MODULE_PACKAGE_PREFIX: &str = "lustre-client-modules-";

/// Generic AWS client utilities package, not tied to a kernel version.
pub const AWS_CLIENT_PACKAGE: &str = "lustre-client-modules-aws";

/// An APT repository to register, plus the trust material it is signed with.
#[derive(Debug, Clone)]
pub struct RepositorySource {
    /// Base URL of the APT repository.
    pub repo_url: String,
    /// Distribution codename (jammy, focal, ...).
    pub codename: String,
    /// Repository component.
    pub component: String,
    /// URL of the armored signing key.
    pub key_url: String,
    /// Where the dearmored keyring is written.
    pub keyring_path: PathBuf,
    /// Where the repository descriptor is written.
    pub sources_list_path: PathBuf,
}

impl RepositorySource {
    /// The one-line sources.list entry. References the keyring path, so
    /// the keyring must exist before this line is written.
    pub fn descriptor_line(&self) -> String {
        format!(
            "deb [signed-by={}] {} {} {}",
            self.keyring_path.display(),
            self.repo_url,
            self.codename,
            self.component
        )
    }
}

/// A package to install, either pinned to the running kernel or static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpec {
    /// Name is completed with the running kernel release at install time.
    KernelMatched { prefix: String },
    /// Name is used as-is.
    Static { name: String },
}

impl PackageSpec {
    pub fn kernel_matched() -> Self {
        PackageSpec::KernelMatched {
            prefix: KERNEL_MODULE_PACKAGE_PREFIX.to_string(),
        }
    }

    pub fn aws_client() -> Self {
        PackageSpec::Static {
            name: AWS_CLIENT_PACKAGE.to_string(),
        }
    }

    /// Resolve to a concrete package name for the given kernel release.
    pub fn resolve(&self, kernel_release: &str) -> String {
        match self {
            PackageSpec::KernelMatched { prefix } => format!("{prefix}{kernel_release}"),
            PackageSpec::Static { name } => name.clone(),
        }
    }

    /// True if this spec depends on the running kernel version.
    pub fn is_kernel_matched(&self) -> bool {
        matches!(self, PackageSpec::KernelMatched { .. })
    }
}

/// Where and how to attach the remote filesystem.
#[derive(Debug, Clone)]
pub struct MountTarget {
    /// Remote endpoint, `<dns-name>@tcp:/<mount-name>`.
    pub endpoint: String,
    /// Local directory to mount at.
    pub mount_point: PathBuf,
    /// Comma-separated mount options.
    pub options: String,
}

impl MountTarget {
    pub fn new(endpoint: impl Into<String>, mount_point: &Path, options: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            mount_point: mount_point.to_path_buf(),
            options: options.into(),
        }
    }

    /// Filesystem type passed to mount(8).
    pub fn fs_type(&self) -> &'static str {
        "lustre"
    }
}
