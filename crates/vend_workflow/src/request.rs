//! Inputs of a provisioning run.

use vend_core::{BillingAccess, StackParameter};
use vend_stack::Template;

/// The baseline stack to deploy once the account exists.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub template: Template,
    pub stack_name: String,
    /// Falls back to the profile's default region.
    pub region: Option<String>,
    pub parameters: Vec<StackParameter>,
}

impl DeploymentPlan {
    pub fn new(template: Template, stack_name: impl Into<String>) -> Self {
        Self {
            template,
            stack_name: stack_name.into(),
            region: None,
            parameters: Vec::new(),
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn parameter(mut self, parameter: StackParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = StackParameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }
}

/// Everything the operator supplies for one account.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub account_name: String,
    pub account_email: String,
    /// Role to assume in the new account; the profile default when absent.
    pub account_role: Option<String>,
    /// Organizational unit name; the account name when absent.
    pub unit_name: Option<String>,
    /// Overrides the profile's billing access.
    pub billing_access: Option<BillingAccess>,
    pub policy_id: Option<String>,
    pub deployment: Option<DeploymentPlan>,
}

impl ProvisionRequest {
    pub fn new(account_name: impl Into<String>, account_email: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            account_email: account_email.into(),
            account_role: None,
            unit_name: None,
            billing_access: None,
            policy_id: None,
            deployment: None,
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.account_role = Some(role.into());
        self
    }

    pub fn unit(mut self, unit_name: impl Into<String>) -> Self {
        self.unit_name = Some(unit_name.into());
        self
    }

    pub fn billing_access(mut self, billing_access: BillingAccess) -> Self {
        self.billing_access = Some(billing_access);
        self
    }

    pub fn policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    pub fn deploy(mut self, plan: DeploymentPlan) -> Self {
        self.deployment = Some(plan);
        self
    }

    pub fn unit_name(&self) -> &str {
        self.unit_name.as_deref().unwrap_or(&self.account_name)
    }
}
