//! Provision command - Create an account and deploy its baseline.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use vend_org::AwsOrganizationService;
use vend_stack::AwsDeploymentConnector;
use vend_sts::AwsCredentialService;
use vend_workflow::{ProvisionRequest, ProvisioningWorkflow};

use super::shared::{load_aws_config, DeploymentArgs, ProfileArgs};

#[derive(Args)]
pub struct ProvisionArgs {
    /// Name of the account to create or reuse
    #[arg(long)]
    pub account_name: String,

    /// Root email address of the account
    #[arg(long)]
    pub account_email: String,

    /// Role to create in the account and assume for the deployment
    #[arg(long)]
    pub account_role: Option<String>,

    /// Organizational unit to place the account in; defaults to the account name
    #[arg(long)]
    pub unit_name: Option<String>,

    /// Policy to attach to the account
    #[arg(long)]
    pub policy_id: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[command(flatten)]
    pub deployment: DeploymentArgs,
}

pub async fn execute(args: ProvisionArgs) -> Result<()> {
    let profile = args.profile.resolve()?;

    let mut request = ProvisionRequest::new(&args.account_name, &args.account_email);
    if let Some(role) = &args.account_role {
        request = request.role(role);
    }
    if let Some(unit) = &args.unit_name {
        request = request.unit(unit);
    }
    if let Some(policy_id) = &args.policy_id {
        request = request.policy(policy_id);
    }

    // The template is only needed when there is a role to deploy through.
    let role_available = args.account_role.is_some() || profile.default_role_name.is_some();
    if role_available {
        request = request.deploy(args.deployment.plan(&profile)?);
    } else {
        info!("No account role given; the account will be created without a stack");
    }

    let aws = load_aws_config(&profile).await;
    let workflow = ProvisioningWorkflow::new(
        Arc::new(AwsOrganizationService::new(&aws)),
        Arc::new(AwsCredentialService::new(&aws)),
        Arc::new(AwsDeploymentConnector::new(&aws)),
        profile,
    );

    let summary = workflow
        .run(&request)
        .await
        .with_context(|| format!("Failed to provision account {}", args.account_name))?;

    if args.json {
        println!("{}", summary.to_json()?);
    } else {
        println!();
        println!("{}", summary);
    }
    Ok(())
}
