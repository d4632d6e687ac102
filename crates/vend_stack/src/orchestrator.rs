//! Stack submission and completion tracking.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use vend_core::{
    CreateStackRequest, DeploymentConnector, DeploymentService, OnFailure, PollStatus, RetryPolicy,
    StackDescription, StackParameter, StackStatusKind, Tag, TemporaryCredentials, VendError,
    VendResult,
};

/// Required because baseline templates define named IAM resources.
pub const NAMED_IAM_CAPABILITY: &str = "CAPABILITY_NAMED_IAM";

/// Format of the `DeployDate` tag.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Assemble the create-stack request for a baseline deployment.
pub fn build_create_request(
    stack_name: &str,
    template_body: &str,
    parameters: Vec<StackParameter>,
    deploy_date: NaiveDate,
) -> CreateStackRequest {
    CreateStackRequest {
        stack_name: stack_name.to_string(),
        template_body: template_body.to_string(),
        parameters,
        capabilities: vec![NAMED_IAM_CAPABILITY.to_string()],
        on_failure: OnFailure::Rollback,
        tags: vec![
            Tag::new("ManagedResource", "True"),
            Tag::new("DeployDate", deploy_date.format(DATE_FORMAT).to_string()),
        ],
    }
}

/// A stack the provider has accepted, with the client that created it.
pub struct SubmittedStack {
    service: Arc<dyn DeploymentService>,
    pub stack_id: String,
    pub stack_name: String,
}

/// Deploys a stack into a target account and waits for the outcome.
pub struct DeploymentOrchestrator {
    connector: Arc<dyn DeploymentConnector>,
    submission: RetryPolicy,
    events: RetryPolicy,
}

impl DeploymentOrchestrator {
    pub fn new(connector: Arc<dyn DeploymentConnector>) -> Self {
        Self {
            connector,
            submission: RetryPolicy::bounded(30),
            events: RetryPolicy::bounded(360),
        }
    }

    pub fn with_retry(mut self, submission: RetryPolicy, events: RetryPolicy) -> Self {
        self.submission = submission;
        self.events = events;
        self
    }

    /// Create `stack_name` in `region` and follow it to completion.
    ///
    /// Only the most recent stack event is inspected on each poll, which is
    /// sufficient for templates without nested stacks.
    pub async fn deploy(
        &self,
        credentials: &TemporaryCredentials,
        template_body: &str,
        stack_name: &str,
        region: &str,
        parameters: Vec<StackParameter>,
    ) -> VendResult<StackDescription> {
        let submitted = self
            .submit(credentials, template_body, stack_name, region, parameters)
            .await?;
        self.wait(&submitted).await
    }

    /// Submit the create-stack request; returns once the provider accepts it.
    pub async fn submit(
        &self,
        credentials: &TemporaryCredentials,
        template_body: &str,
        stack_name: &str,
        region: &str,
        parameters: Vec<StackParameter>,
    ) -> VendResult<SubmittedStack> {
        let service = self.connector.connect(credentials, region).await?;
        let request = build_create_request(
            stack_name,
            template_body,
            parameters,
            Utc::now().date_naive(),
        );

        info!("Creating stack {} in {}", stack_name, region);
        debug!("Create stack request: {:?}", request.parameters);

        let svc = &service;
        let req = &request;
        let stack_id = self
            .submission
            .retry("CreateStack", |_| async move { svc.create_stack(req).await })
            .await?;
        info!("Stack creation in process: {}", stack_id);

        Ok(SubmittedStack {
            service,
            stack_id,
            stack_name: stack_name.to_string(),
        })
    }

    /// Poll the latest event of a submitted stack until it completes or
    /// rolls back, then describe it.
    pub async fn wait(&self, submitted: &SubmittedStack) -> VendResult<StackDescription> {
        let svc = &submitted.service;
        let stack_name = submitted.stack_name.as_str();
        self.events
            .poll("DescribeStackEvents", |_| async move {
                let events = svc.describe_stack_events(stack_name).await?;
                let Some(latest) = events.into_iter().next() else {
                    return Ok(PollStatus::Pending("no events yet".to_string()));
                };
                match latest.classify() {
                    StackStatusKind::Complete => Ok(PollStatus::Ready(())),
                    StackStatusKind::RolledBack => Err(VendError::StackRolledBack {
                        stack_name: stack_name.to_string(),
                        status: latest.resource_status.clone(),
                        reason: latest
                            .status_reason
                            .clone()
                            .unwrap_or_else(|| "no reason given".to_string()),
                    }),
                    StackStatusKind::InProgress => {
                        info!(
                            "Stack building . . . {} {} {}",
                            latest.logical_resource_id,
                            latest.resource_type,
                            latest.resource_status
                        );
                        Ok(PollStatus::Pending(latest.resource_status))
                    }
                }
            })
            .await?;

        info!("Stack construction complete.");
        svc.describe_stack(stack_name).await
    }
}
