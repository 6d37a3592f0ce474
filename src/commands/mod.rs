//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `provision` - Run the host-preparation stages
//! - `mount` - Attach the remote filesystem only
//! - `preflight` - Check host readiness
//! - `show` - Display configuration and the provisioning plan

pub mod mount;
pub mod preflight;
pub mod provision;
pub mod show;

pub use mount::cmd_mount;
pub use preflight::cmd_preflight;
pub use provision::cmd_provision;
pub use show::cmd_show;

use crate::config::Config;
use crate::error::ProvisionError;
use crate::plan::{MountTarget, PackageSpec, RepositorySource};
use crate::system;

/// Repository component used by the FSx client repository.
const REPO_COMPONENT: &str = "main";

/// Build the repository source from configuration, detecting the
/// distribution codename from the host unless overridden.
pub(crate) fn repository_source(config: &Config) -> Result<RepositorySource, ProvisionError> {
    let codename = match &config.codename {
        Some(codename) => codename.clone(),
        None => system::detect_codename()?,
    };

    Ok(RepositorySource {
        repo_url: config.repo_url.clone(),
        codename,
        component: REPO_COMPONENT.to_string(),
        key_url: config.key_url.clone(),
        keyring_path: config.keyring_path.clone(),
        sources_list_path: config.sources_list_path.clone(),
    })
}

/// The two packages every provisioning run installs.
pub(crate) fn package_specs() -> Vec<PackageSpec> {
    vec![PackageSpec::kernel_matched(), PackageSpec::aws_client()]
}

/// Build the mount target, failing fast when FSX is unset.
pub(crate) fn mount_target(config: &Config) -> Result<MountTarget, ProvisionError> {
    let endpoint = config.require_endpoint()?;
    Ok(MountTarget::new(
        endpoint,
        &config.mount_point,
        config.mount_options.clone(),
    ))
}
