//! AWS Organizations implementation of [`OrganizationService`].

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_organizations::types as aws;
use aws_sdk_organizations::types::{IamUserAccessToBilling, OrganizationFeatureSet as FeatureSet};
use aws_sdk_organizations::Client;
use tracing::debug;

use vend_core::{
    Account, CreateAccountState, CreateAccountStatus, NewAccount, Organization,
    OrganizationService, OrganizationStatus, OrganizationalUnit, Root, VendError, VendResult,
};

const NOT_IN_USE: &str = "AWSOrganizationsNotInUseException";

/// Organization service backed by the AWS Organizations API.
#[derive(Clone)]
pub struct AwsOrganizationService {
    client: Client,
}

impl AwsOrganizationService {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn sdk_error<E>(operation: &str, err: E) -> VendError
where
    E: std::error::Error,
{
    VendError::provider(operation, DisplayErrorContext(err))
}

fn required<'a>(value: Option<&'a str>, field: &str) -> VendResult<&'a str> {
    value.ok_or_else(|| VendError::MissingField(field.to_string()))
}

fn convert_organization(org: &aws::Organization) -> VendResult<Organization> {
    // The enablement state is reported through the policy type summaries.
    let status = org
        .available_policy_types()
        .first()
        .and_then(|p| p.status())
        .and_then(|s| OrganizationStatus::from_str(s.as_str()))
        .unwrap_or(OrganizationStatus::Enabled);
    Ok(Organization {
        id: required(org.id(), "Organization.Id")?.to_string(),
        status,
    })
}

/// "Not in use" means the caller has no organization yet.
fn describe_organization_error<E>(code: Option<&str>, err: E) -> VendResult<Option<Organization>>
where
    E: std::error::Error,
{
    if code == Some(NOT_IN_USE) {
        debug!("Caller is not a member of an organization");
        return Ok(None);
    }
    Err(sdk_error("DescribeOrganization", err))
}

fn convert_account_status(status: &aws::CreateAccountStatus) -> VendResult<CreateAccountStatus> {
    let state = match status.state().map(|s| s.as_str()) {
        Some("SUCCEEDED") => CreateAccountState::Succeeded,
        Some("FAILED") => CreateAccountState::Failed,
        _ => CreateAccountState::InProgress,
    };
    Ok(CreateAccountStatus {
        request_id: required(status.id(), "CreateAccountStatus.Id")?.to_string(),
        state,
        account_id: status.account_id().map(str::to_string),
        failure_reason: status.failure_reason().map(|r| r.as_str().to_string()),
    })
}

fn convert_account(account: &aws::Account) -> VendResult<Account> {
    Ok(Account {
        id: required(account.id(), "Account.Id")?.to_string(),
        name: account.name().unwrap_or_default().to_string(),
        email: account.email().unwrap_or_default().to_string(),
    })
}

#[async_trait]
impl OrganizationService for AwsOrganizationService {
    async fn describe_organization(&self) -> VendResult<Option<Organization>> {
        match self.client.describe_organization().send().await {
            Ok(out) => out.organization().map(convert_organization).transpose(),
            Err(err) => {
                let code = err.code().map(str::to_string);
                describe_organization_error(code.as_deref(), err)
            }
        }
    }

    async fn create_organization(&self) -> VendResult<Organization> {
        let out = self
            .client
            .create_organization()
            .feature_set(FeatureSet::All)
            .send()
            .await
            .map_err(|e| sdk_error("CreateOrganization", e))?;
        let org = out
            .organization()
            .ok_or_else(|| VendError::MissingField("CreateOrganization.Organization".to_string()))?;
        convert_organization(org)
    }

    async fn list_roots(&self) -> VendResult<Vec<Root>> {
        let mut roots = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_roots()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListRoots", e))?;
            for root in out.roots() {
                roots.push(Root {
                    id: required(root.id(), "Root.Id")?.to_string(),
                    name: root.name().unwrap_or_default().to_string(),
                });
            }
            next_token = out.next_token().map(str::to_string);
            if next_token.is_none() {
                return Ok(roots);
            }
        }
    }

    async fn list_organizational_units(
        &self,
        parent_id: &str,
    ) -> VendResult<Vec<OrganizationalUnit>> {
        let mut units = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListOrganizationalUnitsForParent", e))?;
            for unit in out.organizational_units() {
                units.push(OrganizationalUnit {
                    id: required(unit.id(), "OrganizationalUnit.Id")?.to_string(),
                    name: unit.name().unwrap_or_default().to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
            next_token = out.next_token().map(str::to_string);
            if next_token.is_none() {
                return Ok(units);
            }
        }
    }

    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<OrganizationalUnit> {
        let out = self
            .client
            .create_organizational_unit()
            .parent_id(parent_id)
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error("CreateOrganizationalUnit", e))?;
        let unit = out.organizational_unit().ok_or_else(|| {
            VendError::MissingField("CreateOrganizationalUnit.OrganizationalUnit".to_string())
        })?;
        Ok(OrganizationalUnit {
            id: required(unit.id(), "OrganizationalUnit.Id")?.to_string(),
            name: unit.name().unwrap_or(name).to_string(),
            parent_id: parent_id.to_string(),
        })
    }

    async fn list_accounts(&self) -> VendResult<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_accounts()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListAccounts", e))?;
            for account in out.accounts() {
                accounts.push(convert_account(account)?);
            }
            next_token = out.next_token().map(str::to_string);
            if next_token.is_none() {
                return Ok(accounts);
            }
        }
    }

    async fn list_accounts_for_parent(&self, parent_id: &str) -> VendResult<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut next_token = None;
        loop {
            let out = self
                .client
                .list_accounts_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListAccountsForParent", e))?;
            for account in out.accounts() {
                accounts.push(convert_account(account)?);
            }
            next_token = out.next_token().map(str::to_string);
            if next_token.is_none() {
                return Ok(accounts);
            }
        }
    }

    async fn create_account(&self, request: &NewAccount) -> VendResult<CreateAccountStatus> {
        let out = self
            .client
            .create_account()
            .email(&request.email)
            .account_name(&request.name)
            .iam_user_access_to_billing(IamUserAccessToBilling::from(
                request.billing_access.as_str(),
            ))
            .set_role_name(request.role_name.clone())
            .send()
            .await
            .map_err(|e| sdk_error("CreateAccount", e))?;
        let status = out
            .create_account_status()
            .ok_or_else(|| VendError::MissingField("CreateAccount.CreateAccountStatus".to_string()))?;
        convert_account_status(status)
    }

    async fn describe_create_account_status(
        &self,
        request_id: &str,
    ) -> VendResult<CreateAccountStatus> {
        let out = self
            .client
            .describe_create_account_status()
            .create_account_request_id(request_id)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeCreateAccountStatus", e))?;
        let status = out.create_account_status().ok_or_else(|| {
            VendError::MissingField("DescribeCreateAccountStatus.CreateAccountStatus".to_string())
        })?;
        convert_account_status(status)
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> VendResult<()> {
        self.client
            .move_account()
            .account_id(account_id)
            .source_parent_id(source_parent_id)
            .destination_parent_id(destination_parent_id)
            .send()
            .await
            .map_err(|e| sdk_error("MoveAccount", e))?;
        Ok(())
    }

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> VendResult<String> {
        let out = self
            .client
            .attach_policy()
            .policy_id(policy_id)
            .target_id(target_id)
            .send()
            .await
            .map_err(|e| sdk_error("AttachPolicy", e))?;
        Ok(format!("{:?}", out))
    }
}
