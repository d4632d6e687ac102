//! Idempotent organization operations.

use std::sync::Arc;

use tracing::{info, warn};

use vend_core::{
    BillingAccess, CreateAccountState, NewAccount, OrganizationService, OrganizationStatus,
    Placement, PollStatus, RetrySettings, VendError, VendResult,
};

/// Ensures the organization structure an account needs.
///
/// Every operation looks before it creates, so running the same
/// provisioning twice never duplicates units or accounts.
pub struct OrganizationAdapter {
    service: Arc<dyn OrganizationService>,
    retry: RetrySettings,
}

impl OrganizationAdapter {
    pub fn new(service: Arc<dyn OrganizationService>) -> Self {
        Self {
            service,
            retry: RetrySettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Return the organization id, creating the organization if needed.
    pub async fn ensure_organization(&self) -> VendResult<String> {
        if let Some(org) = self.service.describe_organization().await? {
            info!("Already an organization: {}", org.id);
            return Ok(org.id);
        }

        let created = self.service.create_organization().await?;
        info!("Created organization {}, waiting for it to enable", created.id);

        let service = &self.service;
        let status = self
            .retry
            .organization_enable
            .poll("DescribeOrganization", |_| async move {
                match service.describe_organization().await? {
                    Some(org) if org.status == OrganizationStatus::PendingEnable => {
                        info!("Create organization status {}", org.status);
                        Ok(PollStatus::Pending(org.status.to_string()))
                    }
                    Some(org) => Ok(PollStatus::Ready(org.status)),
                    None => Ok(PollStatus::Pending("not yet visible".to_string())),
                }
            })
            .await?;

        match status {
            OrganizationStatus::Enabled => Ok(created.id),
            other => Err(VendError::OrganizationDisabled(other.to_string())),
        }
    }

    /// Id of the first root of the organization.
    pub async fn root_id(&self) -> VendResult<String> {
        let roots = self.service.list_roots().await?;
        let root = roots
            .into_iter()
            .next()
            .ok_or_else(|| VendError::MissingField("organization root".to_string()))?;
        info!("Using root {} for organizational units", root.id);
        Ok(root.id)
    }

    /// Id of the unit named exactly `name` under `parent_id`, if any.
    pub async fn find_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<Option<String>> {
        let units = self.service.list_organizational_units(parent_id).await?;
        Ok(units.into_iter().find(|u| u.name == name).map(|unit| {
            info!("OU is already there, using {}", unit.id);
            unit.id
        }))
    }

    pub async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<String> {
        let unit = self.service.create_organizational_unit(parent_id, name).await?;
        info!("Created the OU: {}", unit.id);
        Ok(unit.id)
    }

    /// Return the id of the unit named `name` under `parent_id`, creating it
    /// when no unit has exactly that name.
    pub async fn ensure_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<String> {
        match self.find_organizational_unit(parent_id, name).await? {
            Some(unit_id) => Ok(unit_id),
            None => self.create_organizational_unit(parent_id, name).await,
        }
    }

    /// Return the id of the account named `name`, creating it when no
    /// account has exactly that name.
    pub async fn ensure_account(
        &self,
        name: &str,
        email: &str,
        billing_access: BillingAccess,
        role_name: Option<&str>,
    ) -> VendResult<String> {
        let accounts = self.service.list_accounts().await?;
        if let Some(account) = accounts.into_iter().find(|a| a.name == name) {
            info!("Found account {} ({})", account.name, account.id);
            return Ok(account.id);
        }

        info!("Creating new account: {} ({})", name, email);
        let request = NewAccount {
            name: name.to_string(),
            email: email.to_string(),
            billing_access,
            role_name: role_name.map(str::to_string),
        };
        let submitted = self.service.create_account(&request).await?;

        let service = &self.service;
        let request_id = submitted.request_id.as_str();
        let status = self
            .retry
            .account_creation
            .poll("DescribeCreateAccountStatus", |_| async move {
                let status = service.describe_create_account_status(request_id).await?;
                info!("Create account status {}", status.state);
                if status.state == CreateAccountState::InProgress {
                    Ok(PollStatus::Pending(status.state.to_string()))
                } else {
                    Ok(PollStatus::Ready(status))
                }
            })
            .await?;

        match status.state {
            CreateAccountState::Succeeded => {
                let account_id = status
                    .account_id
                    .ok_or_else(|| VendError::MissingField("CreateAccountStatus.AccountId".to_string()))?;
                info!("Account created: {}", account_id);
                Ok(account_id)
            }
            _ => Err(VendError::AccountCreationFailed {
                account_name: name.to_string(),
                reason: status
                    .failure_reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            }),
        }
    }

    /// Move the account from the root into `unit_id` unless it is already
    /// there. Failures are logged and reported, never raised.
    pub async fn move_account_if_needed(
        &self,
        account_id: &str,
        unit_id: &str,
        root_id: &str,
    ) -> Placement {
        match self.service.list_accounts_for_parent(unit_id).await {
            Ok(members) if members.iter().any(|a| a.id == account_id) => {
                info!("Account {} already in {}", account_id, unit_id);
                return Placement::AlreadyPlaced;
            }
            Ok(_) => {}
            Err(err) => {
                warn!("Could not list accounts of {}: {}", unit_id, err);
                return Placement::Failed(err.to_string());
            }
        }

        info!("Moving account {} into {}", account_id, unit_id);
        match self.service.move_account(account_id, root_id, unit_id).await {
            Ok(()) => Placement::Moved,
            Err(err) => {
                warn!("Account move failed: {}", err);
                Placement::Failed(err.to_string())
            }
        }
    }

    /// Attach `policy_id` to the account when one is given.
    pub async fn attach_policy(
        &self,
        policy_id: Option<&str>,
        account_id: &str,
    ) -> VendResult<Option<String>> {
        let Some(policy_id) = policy_id else {
            return Ok(None);
        };
        let response = self.service.attach_policy(policy_id, account_id).await?;
        info!("Attach policy response {}", response);
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vend_core::MockOrganizationService;

    fn adapter(mock: &MockOrganizationService) -> OrganizationAdapter {
        OrganizationAdapter::new(Arc::new(mock.clone()))
            .with_retry(RetrySettings::default().with_interval_secs(0))
    }

    #[tokio::test]
    async fn test_existing_organization_is_reused() {
        let mock = MockOrganizationService::new();
        let org_id = adapter(&mock).ensure_organization().await.unwrap();

        assert_eq!(org_id, "o-mock");
        assert!(!mock.was_called("create_organization"));
    }

    #[tokio::test]
    async fn test_organization_created_and_polled() {
        let mock = MockOrganizationService::new()
            .without_organization()
            .with_org_statuses(vec![
                OrganizationStatus::PendingEnable,
                OrganizationStatus::Enabled,
            ]);

        let org_id = adapter(&mock).ensure_organization().await.unwrap();

        assert_eq!(org_id, "o-created");
        assert_eq!(mock.call_count("create_organization"), 1);
        // initial lookup plus two status polls
        assert_eq!(mock.call_count("describe_organization"), 3);
    }

    #[tokio::test]
    async fn test_organization_pending_disable_is_fatal() {
        let mock = MockOrganizationService::new()
            .without_organization()
            .with_org_statuses(vec![OrganizationStatus::PendingDisable]);

        let err = adapter(&mock).ensure_organization().await.unwrap_err();
        assert!(matches!(err, VendError::OrganizationDisabled(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_root_id_requires_a_root() {
        let mock = MockOrganizationService::new();
        assert_eq!(adapter(&mock).root_id().await.unwrap(), "r-root");
    }

    #[tokio::test]
    async fn test_attach_policy_absent_is_noop() {
        let mock = MockOrganizationService::new();
        let response = adapter(&mock).attach_policy(None, "123").await.unwrap();

        assert!(response.is_none());
        assert!(!mock.was_called("attach_policy"));
    }

    #[tokio::test]
    async fn test_attach_policy_returns_response() {
        let mock = MockOrganizationService::new();
        let response = adapter(&mock)
            .attach_policy(Some("p-guardrails"), "123")
            .await
            .unwrap();

        assert_eq!(response.as_deref(), Some("attached p-guardrails to 123"));
        let calls = mock.get_method_calls("attach_policy");
        assert_eq!(calls[0].args, vec!["p-guardrails".to_string(), "123".to_string()]);
    }
}
