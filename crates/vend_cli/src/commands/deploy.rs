//! Deploy command - Deploy the baseline into an existing account.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use vend_org::AwsOrganizationService;
use vend_stack::AwsDeploymentConnector;
use vend_sts::AwsCredentialService;
use vend_workflow::ProvisioningWorkflow;

use super::shared::{load_aws_config, DeploymentArgs, ProfileArgs};

#[derive(Args)]
pub struct DeployArgs {
    /// Id of the account to deploy into
    #[arg(long)]
    pub account_id: String,

    /// Role to assume in the account
    #[arg(long)]
    pub account_role: String,

    #[command(flatten)]
    pub profile: ProfileArgs,

    #[command(flatten)]
    pub deployment: DeploymentArgs,
}

pub async fn execute(args: DeployArgs) -> Result<()> {
    let profile = args.profile.resolve()?;
    let plan = args.deployment.plan(&profile)?;

    let aws = load_aws_config(&profile).await;
    let workflow = ProvisioningWorkflow::new(
        Arc::new(AwsOrganizationService::new(&aws)),
        Arc::new(AwsCredentialService::new(&aws)),
        Arc::new(AwsDeploymentConnector::new(&aws)),
        profile,
    );

    let stack = workflow
        .deploy_existing(&args.account_id, &args.account_role, &plan)
        .await
        .with_context(|| format!("Failed to deploy into account {}", args.account_id))?;

    println!();
    println!("Stack: {} {}", stack.stack_name, stack.status);
    for output in &stack.outputs {
        println!("  {} = {}", output.key, output.value);
    }
    println!("Resources deployed for account {}", args.account_id);
    Ok(())
}
