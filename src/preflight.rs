//! Preflight checks for provisioning.
//!
//! Validates host tools and environment before any privileged step
//! runs. Run with `fsxup preflight` to check everything is ready.

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::Config;
use crate::system;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed.
    Pass,
    /// Check failed - provisioning will fail.
    Fail,
    /// Check passed but with a warning.
    Warn,
}

impl CheckResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: None,
        }
    }

    fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            details: Some(details.to_string()),
        }
    }

    fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            details: Some(details.to_string()),
        }
    }

    fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            details: Some(details.to_string()),
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Returns true if all checks passed (no failures).
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn fail_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }

    pub fn warn_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Warn)
            .count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let (icon, status_str) = match check.status {
                CheckStatus::Pass => ("✓", "PASS"),
                CheckStatus::Fail => ("✗", "FAIL"),
                CheckStatus::Warn => ("⚠", "WARN"),
            };

            print!("  {} [{}] {}", icon, status_str, check.name);
            if let Some(details) = &check.details {
                println!(": {}", details);
            } else {
                println!();
            }
        }

        println!();
        let total = self.checks.len();
        let passed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Pass)
            .count();
        let failed = self.fail_count();
        let warned = self.warn_count();

        println!("Summary: {}/{} passed", passed, total);
        if failed > 0 {
            println!("         {} FAILED - provisioning will not succeed", failed);
        }
        if warned > 0 {
            println!("         {} warnings", warned);
        }
    }
}

/// Run all preflight checks.
pub fn run_preflight(config: &Config) -> PreflightReport {
    let mut checks = Vec::new();

    checks.extend(check_host_tools());
    checks.extend(check_privileges());
    checks.extend(check_distribution(config));
    checks.extend(check_existing_state(config));

    PreflightReport { checks }
}

/// Run preflight and fail hard if anything is broken.
pub fn run_preflight_or_fail(config: &Config) -> Result<()> {
    let report = run_preflight(config);
    report.print();
    if !report.all_passed() {
        bail!("{} preflight check(s) failed", report.fail_count());
    }
    Ok(())
}

/// External tools the provisioning stages invoke.
fn check_host_tools() -> Vec<CheckResult> {
    let required_tools = [
        ("curl", "curl", "Fetches the repository signing key"),
        ("gpg", "gnupg", "Converts the key to keyring format"),
        ("apt-get", "apt", "Installs client packages"),
        ("uname", "coreutils", "Queries the running kernel release"),
        ("mount", "mount", "Attaches the remote filesystem"),
    ];

    required_tools
        .iter()
        .map(|(tool, package, purpose)| match which::which(tool) {
            Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
            Err(_) => CheckResult::fail(
                tool,
                &format!("not found in PATH ({purpose}; install '{package}')"),
            ),
        })
        .collect()
}

fn check_privileges() -> Vec<CheckResult> {
    // Writing the trust store and sources.list requires root. Checking
    // writability of the target directories avoids depending on uid
    // queries and covers unusual setups where those paths are relocated.
    let probes = [
        Path::new("/usr/share/keyrings"),
        Path::new("/etc/apt/sources.list.d"),
    ];

    probes
        .iter()
        .map(|dir| {
            let name = format!("writable {}", dir.display());
            if !dir.is_dir() {
                return CheckResult::warn(&name, "directory does not exist on this host");
            }
            if dir_writable(dir) {
                CheckResult::pass(&name)
            } else {
                CheckResult::fail(&name, "run fsxup as root (or via sudo)")
            }
        })
        .collect()
}

fn dir_writable(dir: &Path) -> bool {
    let probe = dir.join(".fsxup-preflight-probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

fn check_distribution(config: &Config) -> Vec<CheckResult> {
    let check = match &config.codename {
        Some(codename) => CheckResult::pass_with("distribution codename", codename),
        None => match system::detect_codename() {
            Ok(codename) => CheckResult::pass_with("distribution codename", &codename),
            Err(e) => CheckResult::fail("distribution codename", &e.to_string()),
        },
    };
    vec![check]
}

/// Report what a previous run already left in place.
fn check_existing_state(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if config.keyring_path.exists() {
        results.push(CheckResult::pass_with(
            "keyring",
            &format!("already present at {} (will be rewritten)", config.keyring_path.display()),
        ));
    } else {
        results.push(CheckResult::pass_with("keyring", "not yet imported"));
    }

    if config.sources_list_path.exists() {
        results.push(CheckResult::pass_with(
            "repository descriptor",
            &format!("already present at {}", config.sources_list_path.display()),
        ));
    } else {
        results.push(CheckResult::pass_with("repository descriptor", "not yet registered"));
    }

    if config.mount_point.is_dir() {
        results.push(CheckResult::pass_with(
            "mount point",
            &format!("{} exists", config.mount_point.display()),
        ));
    } else if config.mount_point.exists() {
        results.push(CheckResult::fail(
            "mount point",
            &format!("{} exists but is not a directory", config.mount_point.display()),
        ));
    } else {
        results.push(CheckResult::pass_with("mount point", "will be created"));
    }

    if config.endpoint.is_none() {
        results.push(CheckResult::warn(
            "endpoint",
            "FSX is not set; required for `provision --mount` and `mount`",
        ));
    } else {
        results.push(CheckResult::pass("endpoint"));
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(statuses: &[CheckStatus]) -> PreflightReport {
        PreflightReport {
            checks: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| CheckResult {
                    name: format!("check-{i}"),
                    status: *s,
                    details: None,
                })
                .collect(),
        }
    }

    #[test]
    fn report_passes_with_warnings() {
        let report = report(&[CheckStatus::Pass, CheckStatus::Warn]);
        assert!(report.all_passed());
        assert_eq!(report.warn_count(), 1);
        assert_eq!(report.fail_count(), 0);
    }

    #[test]
    fn report_fails_on_any_failure() {
        let report = report(&[CheckStatus::Pass, CheckStatus::Fail, CheckStatus::Pass]);
        assert!(!report.all_passed());
        assert_eq!(report.fail_count(), 1);
    }

    #[test]
    fn host_tool_checks_cover_all_stages() {
        let checks = check_host_tools();
        let names: Vec<&str> = checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["curl", "gpg", "apt-get", "uname", "mount"]);
    }
}
