//! Configuration for fsxup.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file. Every
//! value has a default taken from the stock FSx client setup, so a bare
//! `fsxup provision` works on a standard Ubuntu host.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ProvisionError;

/// FSx Lustre client APT repository for Ubuntu.
pub const DEFAULT_REPO_URL: &str = "https://fsx-lustre-client-repo.s3.amazonaws.com/ubuntu";

/// Armored public key the repository is signed with.
pub const DEFAULT_KEY_URL: &str =
    "https://fsx-lustre-client-repo-public-keys.s3.amazonaws.com/fsx-ubuntu-public-key.asc";

/// System trust-store path for the dearmored keyring.
pub const DEFAULT_KEYRING_PATH: &str = "/usr/share/keyrings/fsx-ubuntu-public-key.gpg";

/// Repository descriptor written for apt.
pub const DEFAULT_SOURCES_LIST: &str = "/etc/apt/sources.list.d/fsxlustreclientrepo.list";

/// Default mount point.
pub const DEFAULT_MOUNT_POINT: &str = "/fsx";

/// Default Lustre mount options.
pub const DEFAULT_MOUNT_OPTIONS: &str = "relatime,flock";

/// fsxup configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Remote endpoint (`<dns>@tcp:/<mount-name>`), from FSX. Only
    /// required when mounting.
    pub endpoint: Option<String>,
    /// Local mount point (default: /fsx).
    pub mount_point: PathBuf,
    /// Mount options (default: relatime,flock).
    pub mount_options: String,
    /// APT repository base URL.
    pub repo_url: String,
    /// Signing key URL.
    pub key_url: String,
    /// Trust-store keyring path.
    pub keyring_path: PathBuf,
    /// Repository descriptor path.
    pub sources_list_path: PathBuf,
    /// Distribution codename override; detected from the host if unset.
    pub codename: Option<String>,
}

impl Config {
    /// Load configuration from a .env file in `base_dir` and the
    /// process environment.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            if let Ok(content) = fs::read_to_string(&env_path) {
                for line in content.lines() {
                    let line = line.trim();
                    // Skip comments and empty lines
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    // Parse KEY=value
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        let value = value.trim();
                        let value = value.trim_matches('"').trim_matches('\'');
                        env_vars.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        let get = |key: &str| env_vars.get(key).filter(|v| !v.is_empty()).cloned();

        Self {
            endpoint: get("FSX"),
            mount_point: get("FSX_MOUNT_POINT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MOUNT_POINT)),
            mount_options: get("FSX_MOUNT_OPTIONS")
                .unwrap_or_else(|| DEFAULT_MOUNT_OPTIONS.to_string()),
            repo_url: get("FSX_REPO_URL").unwrap_or_else(|| DEFAULT_REPO_URL.to_string()),
            key_url: get("FSX_KEY_URL").unwrap_or_else(|| DEFAULT_KEY_URL.to_string()),
            keyring_path: get("FSX_KEYRING_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYRING_PATH)),
            sources_list_path: get("FSX_SOURCES_LIST")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCES_LIST)),
            codename: get("FSX_CODENAME"),
        }
    }

    /// The endpoint, or a configuration error naming the variable.
    /// Called before any mount attempt so a missing endpoint fails fast.
    pub fn require_endpoint(&self) -> Result<&str, ProvisionError> {
        self.endpoint.as_deref().ok_or_else(|| ProvisionError::Config {
            message: "FSX is not set; export FSX=<dns-name>@tcp:/<mount-name> \
                      or add it to .env"
                .to_string(),
        })
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!(
            "  FSX:               {}",
            self.endpoint.as_deref().unwrap_or("(not set)")
        );
        println!("  FSX_MOUNT_POINT:   {}", self.mount_point.display());
        println!("  FSX_MOUNT_OPTIONS: {}", self.mount_options);
        println!("  FSX_REPO_URL:      {}", self.repo_url);
        println!("  FSX_KEY_URL:       {}", self.key_url);
        println!("  FSX_KEYRING_PATH:  {}", self.keyring_path.display());
        println!("  FSX_SOURCES_LIST:  {}", self.sources_list_path.display());
        println!(
            "  FSX_CODENAME:      {}",
            self.codename.as_deref().unwrap_or("(detected from host)")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var precedence is covered in tests/config_tests.rs (mutating
    // the process environment needs serial_test).

    #[test]
    fn require_endpoint_fails_when_unset() {
        let config = Config {
            endpoint: None,
            mount_point: PathBuf::from("/fsx"),
            mount_options: DEFAULT_MOUNT_OPTIONS.into(),
            repo_url: DEFAULT_REPO_URL.into(),
            key_url: DEFAULT_KEY_URL.into(),
            keyring_path: PathBuf::from(DEFAULT_KEYRING_PATH),
            sources_list_path: PathBuf::from(DEFAULT_SOURCES_LIST),
            codename: None,
        };

        let err = config.require_endpoint().unwrap_err();
        assert!(err.to_string().contains("FSX"));
    }
}
