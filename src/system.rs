//! Capability interfaces over OS-owned state.
//!
//! The package database, trust store, and mount table belong to the
//! host, not to this tool. Each is reached through a narrow trait with
//! one host implementation (an opaque subprocess invocation), so the
//! Provisioner's sequencing can be tested against fakes.

use std::fs;
use std::path::Path;

use crate::error::ProvisionError;
use crate::plan::MountTarget;
use crate::process::Cmd;

/// Fetches armored signing-key material over the network.
pub trait KeyFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ProvisionError>;
}

/// Converts armored key material and writes it into the system trust store.
pub trait TrustStore {
    fn import_key(&self, armored: &[u8], keyring_path: &Path) -> Result<(), ProvisionError>;
}

/// The host package manager.
pub trait PackageManager {
    /// Refresh the package index after a repository change.
    fn update_index(&self) -> Result<(), ProvisionError>;

    /// Install all named packages in a single transaction. An
    /// unresolvable name must abort before anything is installed.
    fn install(&self, packages: &[String]) -> Result<(), ProvisionError>;
}

/// The host mount table.
pub trait MountTable {
    fn is_mounted(&self, mount_point: &Path) -> Result<bool, ProvisionError>;
    fn mount(&self, target: &MountTarget) -> Result<(), ProvisionError>;
}

/// Queries the running kernel release.
pub trait KernelQuery {
    fn release(&self) -> Result<String, ProvisionError>;
}

// =============================================================================
// Host implementations
// =============================================================================

/// Fetches keys with curl.
pub struct CurlKeyFetcher;

impl KeyFetcher for CurlKeyFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ProvisionError> {
        let result = Cmd::new("curl")
            .args(["-fsSL", url])
            .allow_fail()
            .run()
            .map_err(|e| ProvisionError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(ProvisionError::Network {
                url: url.to_string(),
                reason: result.diagnostics(),
            });
        }
        Ok(result.stdout.into_bytes())
    }
}

/// Dearmors keys with gpg and writes them to the trust store.
pub struct GpgTrustStore;

impl TrustStore for GpgTrustStore {
    fn import_key(&self, armored: &[u8], keyring_path: &Path) -> Result<(), ProvisionError> {
        // gpg writes the binary keyring itself; --yes overwrites an
        // existing keyring so re-runs succeed.
        let result = Cmd::new("gpg")
            .args(["--batch", "--yes", "--dearmor", "-o"])
            .arg_path(keyring_path)
            .stdin_bytes(armored.to_vec())
            .allow_fail()
            .run()
            .map_err(|e| ProvisionError::Parse {
                reason: e.to_string(),
            })?;

        if !result.success() {
            let reason = result.diagnostics();
            if reason.contains("Permission denied") {
                return Err(ProvisionError::Permission {
                    path: keyring_path.display().to_string(),
                    reason,
                });
            }
            return Err(ProvisionError::Parse { reason });
        }
        Ok(())
    }
}

/// apt-get, non-interactive.
pub struct Apt;

impl Apt {
    /// Pick out the package name apt could not resolve, if any.
    fn unresolvable_package(diagnostics: &str, packages: &[String]) -> Option<String> {
        if !diagnostics.contains("Unable to locate package")
            && !diagnostics.contains("has no installation candidate")
        {
            return None;
        }
        packages
            .iter()
            .find(|p| diagnostics.contains(p.as_str()))
            .cloned()
    }
}

impl PackageManager for Apt {
    fn update_index(&self) -> Result<(), ProvisionError> {
        let result = Cmd::new("apt-get")
            .arg("update")
            .allow_fail()
            .run()
            .map_err(|e| ProvisionError::PackageIndex {
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(ProvisionError::PackageIndex {
                reason: result.diagnostics(),
            });
        }
        Ok(())
    }

    fn install(&self, packages: &[String]) -> Result<(), ProvisionError> {
        let result = Cmd::new("apt-get")
            .args(["install", "-y"])
            .args(packages.iter().map(String::as_str))
            .allow_fail()
            .run()
            .map_err(|e| ProvisionError::PackageInstall {
                reason: e.to_string(),
            })?;

        if !result.success() {
            let diagnostics = result.diagnostics();
            if let Some(package) = Self::unresolvable_package(&diagnostics, packages) {
                return Err(ProvisionError::PackageNotFound {
                    package,
                    reason: diagnostics,
                });
            }
            return Err(ProvisionError::PackageInstall {
                reason: diagnostics,
            });
        }
        Ok(())
    }
}

/// mount(8) plus /proc/mounts.
pub struct LinuxMountTable;

impl MountTable for LinuxMountTable {
    fn is_mounted(&self, mount_point: &Path) -> Result<bool, ProvisionError> {
        let mounts =
            fs::read_to_string("/proc/mounts").map_err(|e| ProvisionError::Mount {
                endpoint: "(unknown)".to_string(),
                mount_point: mount_point.display().to_string(),
                reason: format!("cannot read /proc/mounts: {e}"),
            })?;

        let wanted = mount_point.display().to_string();
        Ok(mounts
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .any(|mp| mp == wanted))
    }

    fn mount(&self, target: &MountTarget) -> Result<(), ProvisionError> {
        let result = Cmd::new("mount")
            .args(["-t", target.fs_type(), "-o", &target.options])
            .arg(&target.endpoint)
            .arg_path(&target.mount_point)
            .allow_fail()
            .run()
            .map_err(|e| ProvisionError::Mount {
                endpoint: target.endpoint.clone(),
                mount_point: target.mount_point.display().to_string(),
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(ProvisionError::Mount {
                endpoint: target.endpoint.clone(),
                mount_point: target.mount_point.display().to_string(),
                reason: result.diagnostics(),
            });
        }
        Ok(())
    }
}

/// uname -r.
pub struct Uname;

impl KernelQuery for Uname {
    fn release(&self) -> Result<String, ProvisionError> {
        let result = Cmd::new("uname")
            .arg("-r")
            .run()
            .map_err(|e| ProvisionError::Config {
                message: format!("cannot query kernel release: {e}"),
            })?;

        let release = result.stdout_trimmed().to_string();
        if release.is_empty() {
            return Err(ProvisionError::Config {
                message: "uname -r returned no output".to_string(),
            });
        }
        Ok(release)
    }
}

/// Distribution codename from /etc/os-release (VERSION_CODENAME).
pub fn detect_codename() -> Result<String, ProvisionError> {
    codename_from_os_release(Path::new("/etc/os-release"))
}

fn codename_from_os_release(path: &Path) -> Result<String, ProvisionError> {
    let content = fs::read_to_string(path).map_err(|e| ProvisionError::Config {
        message: format!("cannot read {}: {e}", path.display()),
    })?;

    content
        .lines()
        .find_map(|line| line.strip_prefix("VERSION_CODENAME="))
        .map(|v| v.trim().trim_matches('"').to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProvisionError::Config {
            message: format!(
                "{} has no VERSION_CODENAME; set FSX_CODENAME explicitly",
                path.display()
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn codename_parsed_from_os_release() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NAME=\"Ubuntu\"").unwrap();
        writeln!(file, "VERSION_CODENAME=jammy").unwrap();
        writeln!(file, "ID=ubuntu").unwrap();

        let codename = codename_from_os_release(file.path()).unwrap();
        assert_eq!(codename, "jammy");
    }

    #[test]
    fn codename_missing_suggests_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "NAME=\"Some Distro\"").unwrap();

        let err = codename_from_os_release(file.path()).unwrap_err();
        assert!(err.to_string().contains("FSX_CODENAME"));
    }

    #[test]
    fn unresolvable_package_is_identified() {
        let packages = vec![
            "lustre-client-modules-6.2.0-custom".to_string(),
            "lustre-client-modules-aws".to_string(),
        ];
        let diagnostics = "E: Unable to locate package lustre-client-modules-6.2.0-custom";

        assert_eq!(
            Apt::unresolvable_package(diagnostics, &packages),
            Some("lustre-client-modules-6.2.0-custom".to_string())
        );
    }

    #[test]
    fn other_install_failures_are_not_not_found() {
        let packages = vec!["lustre-client-modules-aws".to_string()];
        let diagnostics = "E: dpkg was interrupted";

        assert_eq!(Apt::unresolvable_package(diagnostics, &packages), None);
    }
}
