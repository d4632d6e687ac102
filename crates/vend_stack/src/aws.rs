//! CloudFormation implementation of the deployment service.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::config::{Builder as ConfigBuilder, Credentials, Region};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_cloudformation::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudformation::types as aws;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Parameter, Tag};
use aws_sdk_cloudformation::Client;
use chrono::{DateTime, Utc};
use tracing::debug;

use vend_core::{
    CreateStackRequest, DeploymentConnector, DeploymentService, StackDescription, StackEvent,
    StackOutput, TemporaryCredentials, VendError, VendResult,
};

const PROVIDER_NAME: &str = "vend-assumed-role";
const ALREADY_EXISTS: &str = "AlreadyExistsException";

/// Creates CloudFormation clients that act inside the target account.
#[derive(Clone)]
pub struct AwsDeploymentConnector {
    base: SdkConfig,
}

impl AwsDeploymentConnector {
    /// `base` supplies everything except region and credentials.
    pub fn new(base: &SdkConfig) -> Self {
        Self { base: base.clone() }
    }
}

#[async_trait]
impl DeploymentConnector for AwsDeploymentConnector {
    async fn connect(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
    ) -> VendResult<Arc<dyn DeploymentService>> {
        debug!(
            "Connecting to CloudFormation in {} as {}",
            region, credentials.access_key_id
        );
        let provider = Credentials::new(
            credentials.access_key_id.as_str(),
            credentials.secret_access_key.as_str(),
            Some(credentials.session_token.to_string()),
            credentials.expiration.map(SystemTime::from),
            PROVIDER_NAME,
        );
        let config = ConfigBuilder::from(&self.base)
            .region(Region::new(region.to_string()))
            .credentials_provider(provider)
            .build();
        Ok(Arc::new(AwsDeploymentService {
            client: Client::from_conf(config),
        }))
    }
}

/// Deployment service backed by one CloudFormation client.
#[derive(Clone)]
pub struct AwsDeploymentService {
    client: Client,
}

impl AwsDeploymentService {
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

fn to_chrono(value: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
}

fn create_stack_error<E>(stack_name: &str, code: Option<&str>, err: E) -> VendError
where
    E: std::error::Error,
{
    match code {
        Some(ALREADY_EXISTS) => VendError::StackAlreadyExists(stack_name.to_string()),
        _ => sdk_error("CreateStack", err),
    }
}

fn convert_event(event: &aws::StackEvent) -> StackEvent {
    StackEvent {
        logical_resource_id: event.logical_resource_id().unwrap_or_default().to_string(),
        resource_type: event.resource_type().unwrap_or_default().to_string(),
        resource_status: event
            .resource_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        status_reason: event.resource_status_reason().map(str::to_string),
        timestamp: event.timestamp().and_then(to_chrono),
    }
}

fn convert_stack(stack: &aws::Stack) -> StackDescription {
    StackDescription {
        stack_id: stack.stack_id().unwrap_or_default().to_string(),
        stack_name: stack.stack_name().unwrap_or_default().to_string(),
        status: stack.stack_status().map(|s| s.as_str().to_string()).unwrap_or_default(),
        outputs: stack
            .outputs()
            .iter()
            .map(|o| StackOutput {
                key: o.output_key().unwrap_or_default().to_string(),
                value: o.output_value().unwrap_or_default().to_string(),
                description: o.description().map(str::to_string),
            })
            .collect(),
        creation_time: stack.creation_time().and_then(to_chrono),
    }
}

#[async_trait]
impl DeploymentService for AwsDeploymentService {
    async fn create_stack(&self, request: &CreateStackRequest) -> VendResult<String> {
        let mut call = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_body(&request.template_body)
            .on_failure(OnFailure::from(request.on_failure.as_str()));

        for param in &request.parameters {
            call = call.parameters(
                Parameter::builder()
                    .parameter_key(&param.key)
                    .parameter_value(param.value.as_str())
                    .build(),
            );
        }
        for capability in &request.capabilities {
            call = call.capabilities(Capability::from(capability.as_str()));
        }
        for tag in &request.tags {
            let tag = Tag::builder()
                .key(&tag.key)
                .value(&tag.value)
                .build();
            call = call.tags(tag);
        }

        let out = match call.send().await {
            Ok(out) => out,
            Err(err) => {
                let code = err.code().map(str::to_string);
                return Err(create_stack_error(&request.stack_name, code.as_deref(), err));
            }
        };
        Ok(out.stack_id().unwrap_or(request.stack_name.as_str()).to_string())
    }

    async fn describe_stack_events(&self, stack_name: &str) -> VendResult<Vec<StackEvent>> {
        let out = self
            .client
            .describe_stack_events()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeStackEvents", e))?;

        Ok(out.stack_events().iter().map(convert_event).collect())
    }

    async fn describe_stack(&self, stack_name: &str) -> VendResult<StackDescription> {
        let out = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error("DescribeStacks", e))?;

        let stack = out
            .stacks()
            .first()
            .ok_or_else(|| VendError::MissingField(format!("DescribeStacks.Stacks[{}]", stack_name)))?;

        Ok(convert_stack(stack))
    }
}
