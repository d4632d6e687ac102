//! The provisioning workflow.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use vend_core::{
    CredentialService, DeploymentConnector, OrganizationService, Placement, StackDescription,
    VendError, VendResult, WorkflowProfile,
};
use vend_org::OrganizationAdapter;
use vend_stack::DeploymentOrchestrator;
use vend_sts::CredentialBroker;

use crate::request::{DeploymentPlan, ProvisionRequest};
use crate::state::{WorkflowRun, WorkflowState};
use crate::summary::ProvisioningSummary;

/// Sequences organization setup, role assumption and the baseline
/// deployment for one account at a time.
pub struct ProvisioningWorkflow {
    organization: OrganizationAdapter,
    broker: CredentialBroker,
    deployer: DeploymentOrchestrator,
    profile: WorkflowProfile,
    deployed: Mutex<HashSet<(String, String, String)>>,
    last_run: Mutex<Option<WorkflowRun>>,
}

impl ProvisioningWorkflow {
    pub fn new(
        organizations: Arc<dyn OrganizationService>,
        credentials: Arc<dyn CredentialService>,
        deployments: Arc<dyn DeploymentConnector>,
        profile: WorkflowProfile,
    ) -> Self {
        let retry = &profile.retry;
        Self {
            organization: OrganizationAdapter::new(organizations).with_retry(retry.clone()),
            broker: CredentialBroker::new(credentials).with_retry(retry.role_assumption),
            deployer: DeploymentOrchestrator::new(deployments)
                .with_retry(retry.stack_submission, retry.stack_events),
            deployed: Mutex::new(HashSet::new()),
            last_run: Mutex::new(None),
            profile,
        }
    }

    pub fn profile(&self) -> &WorkflowProfile {
        &self.profile
    }

    /// Log of the most recent run, successful or not.
    pub fn last_run(&self) -> Option<WorkflowRun> {
        self.last_run.lock().clone()
    }

    /// Provision the requested account and, when a role is available,
    /// deploy the baseline stack into it.
    pub async fn run(&self, request: &ProvisionRequest) -> VendResult<ProvisioningSummary> {
        let mut run = WorkflowRun::new(&request.account_name);
        info!("Starting the account creation process for {}", request.account_name);

        let result = self.provision(request, &mut run).await;
        if let Err(err) = &result {
            run.fail(err);
        }
        *self.last_run.lock() = Some(run);
        result
    }

    /// Deploy the baseline into an account that already exists.
    pub async fn deploy_existing(
        &self,
        account_id: &str,
        role_name: &str,
        plan: &DeploymentPlan,
    ) -> VendResult<StackDescription> {
        let mut run = WorkflowRun::new(account_id);
        run.advance(WorkflowState::AccountReady, account_id);

        let result = self.deploy(account_id, role_name, plan, &mut run).await;
        match &result {
            Ok(_) => run.advance(WorkflowState::Done, "deployed"),
            Err(err) => run.fail(err),
        }
        *self.last_run.lock() = Some(run);
        result
    }

    fn resolve_role(&self, request: &ProvisionRequest) -> VendResult<Option<String>> {
        let role = request
            .account_role
            .clone()
            .or_else(|| self.profile.default_role_name.clone());

        if self.profile.deployment_required {
            if role.is_none() {
                return Err(VendError::Config(
                    "a role to assume is required to deploy the baseline stack".to_string(),
                ));
            }
            if request.deployment.is_none() {
                return Err(VendError::Config(
                    "the baseline stack is required but no deployment was given".to_string(),
                ));
            }
        }
        Ok(role)
    }

    async fn provision(
        &self,
        request: &ProvisionRequest,
        run: &mut WorkflowRun,
    ) -> VendResult<ProvisioningSummary> {
        let role = self.resolve_role(request)?;

        let organization_id = self.organization.ensure_organization().await?;
        run.advance(WorkflowState::OrgReady, &organization_id);

        let root_id = self.organization.root_id().await?;
        let unit_name = request.unit_name();
        // A failed lookup ends the run; only creation is best effort.
        let unit_id = match self
            .organization
            .find_organizational_unit(&root_id, unit_name)
            .await?
        {
            Some(unit_id) => Some(unit_id),
            None => match self
                .organization
                .create_organizational_unit(&root_id, unit_name)
                .await
            {
                Ok(unit_id) => Some(unit_id),
                Err(err) => {
                    warn!("Could not create OU {}, continuing without it: {}", unit_name, err);
                    None
                }
            },
        };
        run.advance(
            WorkflowState::OuReady,
            unit_id.as_deref().unwrap_or("no unit"),
        );

        let billing_access = request
            .billing_access
            .unwrap_or(self.profile.billing_access);
        let account_id = self
            .organization
            .ensure_account(
                &request.account_name,
                &request.account_email,
                billing_access,
                role.as_deref(),
            )
            .await?;
        run.advance(WorkflowState::AccountReady, &account_id);

        let placement = match &unit_id {
            Some(unit_id) => {
                self.organization
                    .move_account_if_needed(&account_id, unit_id, &root_id)
                    .await
            }
            None => Placement::Skipped,
        };
        run.advance(WorkflowState::AccountPlaced, placement.to_string());

        let policy_response = self
            .organization
            .attach_policy(request.policy_id.as_deref(), &account_id)
            .await?;

        let mut summary = ProvisioningSummary {
            account_id: account_id.clone(),
            account_email: request.account_email.clone(),
            organization_id: Some(organization_id),
            root_id: Some(root_id),
            unit_id,
            placement,
            policy_response,
            stack: None,
        };

        match (role, &request.deployment) {
            (Some(role), Some(plan)) => {
                let stack = self.deploy(&account_id, &role, plan, run).await?;
                summary.stack = Some(stack);
            }
            _ => info!("Only creating account and not adding the stack"),
        }

        run.advance(WorkflowState::Done, &account_id);
        Ok(summary)
    }

    async fn deploy(
        &self,
        account_id: &str,
        role_name: &str,
        plan: &DeploymentPlan,
        run: &mut WorkflowRun,
    ) -> VendResult<StackDescription> {
        plan.template.check_parameters(&plan.parameters)?;

        let region = plan
            .region
            .clone()
            .unwrap_or_else(|| self.profile.default_region.clone());
        let key = (account_id.to_string(), region.clone(), plan.stack_name.clone());
        if self.deployed.lock().contains(&key) {
            return Err(VendError::StackAlreadyExists(plan.stack_name.clone()));
        }

        let credentials = self.broker.assume_role(account_id, role_name).await?;
        run.advance(WorkflowState::RoleAssumed, &credentials.access_key_id);

        info!(
            "Deploying resources from {} as {} in {}",
            plan.template.path.display(),
            plan.stack_name,
            region
        );
        let submitted = self
            .deployer
            .submit(
                &credentials,
                &plan.template.body,
                &plan.stack_name,
                &region,
                plan.parameters.clone(),
            )
            .await?;
        self.deployed.lock().insert(key);
        let stack = self.deployer.wait(&submitted).await?;
        run.advance(WorkflowState::StackDeployed, &stack.stack_id);
        Ok(stack)
    }
}
