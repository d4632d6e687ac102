//! CLI command definitions.
//!
//! Each subcommand maps to one entry point of the provisioning workflow.

use clap::{Parser, Subcommand};

pub mod deploy;
pub mod profile;
pub mod provision;
pub mod shared;

/// vend - account vending for AWS Organizations
#[derive(Parser)]
#[command(name = "vend")]
#[command(version, about = "vend - account vending for AWS Organizations")]
#[command(long_about = r#"
vend creates member accounts in an AWS organization, places them in an
organizational unit and deploys a baseline CloudFormation stack into them
through a cross-account role.

COMMANDS:
  provision     → Ensure the organization, unit and account, then deploy
  deploy        → Deploy the baseline into an existing account
  profile show  → Print the effective workflow profile

SECRETS:
  The administrator password is read from VEND_ADMIN_PASSWORD, or prompted
  for when a terminal is attached. It is never accepted as an argument.

EXIT CODES:
  0 - Success
  1 - Provisioning failure
  2 - Invalid arguments or configuration
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Provision an account and deploy its baseline stack
    Provision(provision::ProvisionArgs),

    /// Deploy the baseline stack into an existing account
    Deploy(deploy::DeployArgs),

    /// Inspect workflow profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provision() {
        let cli = Cli::try_parse_from([
            "vend",
            "provision",
            "--account-name",
            "Sandbox",
            "--account-email",
            "sandbox@example.com",
            "--parameter",
            "Environment=dev",
            "--preset",
            "baseline-required",
        ])
        .unwrap();

        match cli.command {
            Commands::Provision(args) => {
                assert_eq!(args.account_name, "Sandbox");
                assert_eq!(args.deployment.parameters.len(), 1);
                assert_eq!(args.profile.preset, "baseline-required");
            }
            _ => panic!("expected provision"),
        }
    }

    #[test]
    fn test_password_is_not_an_argument() {
        let result = Cli::try_parse_from([
            "vend",
            "deploy",
            "--account-id",
            "111122223333",
            "--account-role",
            "OrganizationAccountAccessRole",
            "--admin-password",
            "hunter2",
        ]);
        assert!(result.is_err());
    }
}
