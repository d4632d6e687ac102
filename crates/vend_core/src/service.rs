//! Capability traits for the remote services.
//!
//! Each provider integration sits behind one of these traits so the
//! provisioning flow can run against the real cloud APIs or against the
//! in-memory fakes in [`crate::mock`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::VendResult;
use crate::models::{
    Account, CreateAccountStatus, CreateStackRequest, NewAccount, Organization,
    OrganizationalUnit, Root, StackDescription, StackEvent, TemporaryCredentials,
};

/// Organization management service.
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Describe the caller's organization, `None` if it has none.
    async fn describe_organization(&self) -> VendResult<Option<Organization>>;

    /// Create an organization with all features enabled.
    async fn create_organization(&self) -> VendResult<Organization>;

    async fn list_roots(&self) -> VendResult<Vec<Root>>;

    /// List units directly beneath `parent_id`.
    async fn list_organizational_units(&self, parent_id: &str)
        -> VendResult<Vec<OrganizationalUnit>>;

    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<OrganizationalUnit>;

    /// List every account in the organization.
    async fn list_accounts(&self) -> VendResult<Vec<Account>>;

    /// List accounts directly beneath `parent_id`.
    async fn list_accounts_for_parent(&self, parent_id: &str) -> VendResult<Vec<Account>>;

    /// Submit an account creation request.
    async fn create_account(&self, request: &NewAccount) -> VendResult<CreateAccountStatus>;

    async fn describe_create_account_status(
        &self,
        request_id: &str,
    ) -> VendResult<CreateAccountStatus>;

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> VendResult<()>;

    /// Attach a policy and return the raw provider response.
    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> VendResult<String>;
}

/// Security token service used for role assumption.
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> VendResult<TemporaryCredentials>;
}

/// Stack deployment service bound to one account and region.
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// Submit a stack and return its identifier.
    async fn create_stack(&self, request: &CreateStackRequest) -> VendResult<String>;

    /// Stack events, most recent first.
    async fn describe_stack_events(&self, stack_name: &str) -> VendResult<Vec<StackEvent>>;

    async fn describe_stack(&self, stack_name: &str) -> VendResult<StackDescription>;
}

/// Builds a [`DeploymentService`] scoped to temporary credentials and a region.
#[async_trait]
pub trait DeploymentConnector: Send + Sync {
    async fn connect(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
    ) -> VendResult<Arc<dyn DeploymentService>>;
}
