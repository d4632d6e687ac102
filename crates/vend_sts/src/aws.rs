//! AWS STS implementation of [`CredentialService`].

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sts::error::DisplayErrorContext;
use aws_sdk_sts::Client;
use chrono::{DateTime, Utc};

use vend_core::{CredentialService, TemporaryCredentials, VendError, VendResult};

/// Token service backed by AWS STS.
#[derive(Clone)]
pub struct AwsCredentialService {
    client: Client,
}

impl AwsCredentialService {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialService for AwsCredentialService {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> VendResult<TemporaryCredentials> {
        let out = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .map_err(|e| VendError::provider("AssumeRole", DisplayErrorContext(e)))?;

        let creds = out
            .credentials()
            .ok_or_else(|| VendError::MissingField("AssumeRole.Credentials".to_string()))?;

        let mut credentials = TemporaryCredentials::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token(),
        );
        let expiration = creds.expiration();
        if let Some(expiry) = DateTime::<Utc>::from_timestamp(expiration.secs(), expiration.subsec_nanos()) {
            credentials = credentials.with_expiration(expiry);
        }
        Ok(credentials)
    }
}
