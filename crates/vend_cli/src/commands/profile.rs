//! Profile commands - Inspect workflow profiles.

use anyhow::Result;
use clap::{Args, Subcommand};

use vend_core::ProfilePreset;

use super::shared::ProfileArgs;

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Print the effective profile as YAML
    Show(ShowArgs),

    /// List the built-in presets
    List,
}

#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,
}

pub fn execute(command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Show(args) => {
            let profile = args.profile.resolve()?;
            print!("{}", profile.to_yaml()?);
        }
        ProfileCommand::List => {
            for preset in ProfilePreset::all() {
                let profile = preset.profile();
                println!(
                    "{:<18} region={} billing={} role={} deployment_required={}",
                    preset,
                    profile.default_region,
                    profile.billing_access.as_str(),
                    profile.default_role_name.as_deref().unwrap_or("-"),
                    profile.deployment_required
                );
            }
        }
    }
    Ok(())
}
