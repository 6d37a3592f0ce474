//! Show command - displays configuration and the provisioning plan.

use anyhow::Result;

use crate::config::Config;

/// Show target for the show command.
pub enum ShowTarget {
    /// Effective configuration
    Config { json: bool },
    /// The steps a provision run would perform
    Plan,
}

/// Execute the show command.
pub fn cmd_show(config: &Config, target: ShowTarget) -> Result<()> {
    match target {
        ShowTarget::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                config.print();
            }
        }
        ShowTarget::Plan => {
            let source = super::repository_source(config)?;
            let specs = super::package_specs();

            println!("Provisioning plan:");
            println!(
                "  1. import signing key    {} -> {}",
                source.key_url,
                source.keyring_path.display()
            );
            println!(
                "  2. register repository   '{}' -> {}",
                source.descriptor_line(),
                source.sources_list_path.display()
            );
            let names: Vec<String> = specs
                .iter()
                .map(|s| s.resolve("$(uname -r)"))
                .collect();
            println!("  3. install packages      {}", names.join(" "));
            println!("  4. create mount point    {}", config.mount_point.display());
            match &config.endpoint {
                Some(endpoint) => println!(
                    "  5. mount (with --mount)  mount -t lustre -o {} {} {}",
                    config.mount_options,
                    endpoint,
                    config.mount_point.display()
                ),
                None => println!("  5. mount (with --mount)  FSX not set, mount unavailable"),
            }
        }
    }
    Ok(())
}
