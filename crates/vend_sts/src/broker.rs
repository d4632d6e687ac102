//! Credential broker.

use std::sync::Arc;

use tracing::info;

use vend_core::{CredentialService, RetryPolicy, TemporaryCredentials, VendResult};

/// Session name recorded on every assumed-role session.
pub const SESSION_NAME: &str = "NewAccountRole";

/// ARN of `role_name` in `account_id`.
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

pub struct CredentialBroker {
    service: Arc<dyn CredentialService>,
    retry: RetryPolicy,
}

impl CredentialBroker {
    pub fn new(service: Arc<dyn CredentialService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::bounded(60),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Assume `role_name` in `account_id`, retrying on every provider error.
    pub async fn assume_role(
        &self,
        account_id: &str,
        role_name: &str,
    ) -> VendResult<TemporaryCredentials> {
        let arn = role_arn(account_id, role_name);
        info!("Assuming role {}", arn);

        let service = &self.service;
        let arn_ref = arn.as_str();
        let credentials = self
            .retry
            .retry("AssumeRole", |_| async move {
                service.assume_role(arn_ref, SESSION_NAME).await
            })
            .await?;

        info!("Assumed role {} ({})", arn, credentials.access_key_id);
        Ok(credentials)
    }
}
