//! Error taxonomy for the provisioning pipeline.
//!
//! Every stage failure carries the external tool's diagnostic output
//! verbatim, plus the stage it belongs to so `main` can map it to a
//! stage-specific exit code for calling automation.

use std::fmt;

use thiserror::Error;

/// The five provisioning stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SigningKey,
    Repository,
    Packages,
    MountPoint,
    Mount,
}

impl Stage {
    /// Exit code reported when this stage fails.
    pub fn exit_code(self) -> i32 {
        match self {
            Stage::SigningKey => 10,
            Stage::Repository => 11,
            Stage::Packages => 12,
            Stage::MountPoint => 13,
            Stage::Mount => 14,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SigningKey => "signing-key",
            Stage::Repository => "repository",
            Stage::Packages => "packages",
            Stage::MountPoint => "mount-point",
            Stage::Mount => "mount",
        };
        f.write_str(name)
    }
}

/// Exit code for configuration errors (bad or missing settings,
/// detected before any stage runs).
pub const CONFIG_EXIT_CODE: i32 = 2;

/// Main error type for provisioning operations.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to fetch signing key from {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("signing key material is not valid OpenPGP data: {reason}")]
    Parse { reason: String },

    #[error("cannot write {path}: {reason}")]
    Permission { path: String, reason: String },

    #[error("package index refresh failed: {reason}")]
    PackageIndex { reason: String },

    #[error("no package available for {package}: {reason}")]
    PackageNotFound { package: String, reason: String },

    #[error("package installation failed: {reason}")]
    PackageInstall { reason: String },

    #[error("mount of {endpoint} at {mount_point} failed: {reason}")]
    Mount {
        endpoint: String,
        mount_point: String,
        reason: String,
    },

    #[error("configuration error: {message}")]
    Config { message: String },
}

/// A provisioning error tagged with the stage that raised it.
///
/// The Provisioner produces these; `main` uses `exit_code()` so that
/// calling automation can tell which stage failed.
#[derive(Error, Debug)]
#[error("stage {stage} failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: ProvisionError,
}

impl StageError {
    pub fn new(stage: Stage, source: ProvisionError) -> Self {
        Self { stage, source }
    }

    pub fn exit_code(&self) -> i32 {
        match self.source {
            ProvisionError::Config { .. } => CONFIG_EXIT_CODE,
            _ => self.stage.exit_code(),
        }
    }
}
