//! End-to-end tests of the provisioning workflow against the in-memory
//! services.

use std::io::Write;
use std::sync::Arc;

use vend_core::{
    CreateAccountState, MockCredentialService, MockDeploymentService, MockOrganizationService,
    Placement, RetryPolicy, RetrySettings, StackEvent, StackParameter, VendError,
    WorkflowProfile,
};
use vend_stack::Template;
use vend_workflow::{DeploymentPlan, ProvisionRequest, ProvisioningWorkflow, WorkflowState};

const TEMPLATE: &str = r#"
AWSTemplateFormatVersion: "2010-09-09"
Parameters:
  AdminUsername:
    Type: String
  AdminPassword:
    Type: String
    NoEcho: true
Resources:
  AdminUser:
    Type: AWS::IAM::User
    Properties:
      UserName: !Ref AdminUsername
"#;

struct Harness {
    org: MockOrganizationService,
    creds: MockCredentialService,
    deployments: MockDeploymentService,
}

impl Harness {
    fn new() -> Self {
        Self {
            org: MockOrganizationService::new(),
            creds: MockCredentialService::new(),
            deployments: MockDeploymentService::new(),
        }
    }

    fn workflow(&self, profile: WorkflowProfile) -> ProvisioningWorkflow {
        ProvisioningWorkflow::new(
            Arc::new(self.org.clone()),
            Arc::new(self.creds.clone()),
            Arc::new(self.deployments.clone()),
            profile.with_retry(RetrySettings::default().with_interval_secs(0)),
        )
    }
}

fn baseline_plan() -> DeploymentPlan {
    let template = Template::from_body("baseline.yml", TEMPLATE.to_string()).unwrap();
    DeploymentPlan::new(template, "Baseline").parameters(vec![
        StackParameter::new("AdminUsername", "admin"),
        StackParameter::secret("AdminPassword", "correct horse"),
    ])
}

fn sandbox_request() -> ProvisionRequest {
    ProvisionRequest::new("Sandbox", "sandbox@example.com")
        .role("OrganizationAccountAccessRole")
        .deploy(baseline_plan())
}

/// A fresh account is created, placed, and receives the baseline stack.
#[tokio::test]
async fn test_sandbox_account_end_to_end() {
    let harness = Harness::new();
    let org = harness.org.clone().with_account_states(vec![
        CreateAccountState::InProgress,
        CreateAccountState::Succeeded,
    ]);
    let deployments = harness.deployments.clone().with_events(vec![
        StackEvent::new("AdminUser", "AWS::IAM::User", "CREATE_IN_PROGRESS"),
        StackEvent::new("AdminUser", "AWS::IAM::User", "CREATE_COMPLETE"),
        StackEvent::for_stack("Baseline", "CREATE_COMPLETE"),
    ]);
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    let summary = workflow.run(&sandbox_request()).await.unwrap();

    let units = org.units();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].name, "Sandbox");
    assert_eq!(summary.unit_id.as_deref(), Some(units[0].id.as_str()));
    assert_eq!(summary.placement, Placement::Moved);
    assert_eq!(
        org.parent_of(&summary.account_id),
        Some(units[0].id.clone())
    );
    assert_eq!(org.call_count("describe_create_account_status"), 2);

    assert_eq!(harness.creds.attempts(), 1);
    let assumed = harness.creds.get_calls();
    assert_eq!(
        assumed[0].args[0],
        format!(
            "arn:aws:iam::{}:role/OrganizationAccountAccessRole",
            summary.account_id
        )
    );

    let stack = summary.stack.as_ref().unwrap();
    assert_eq!(stack.stack_name, "Baseline");
    assert_eq!(stack.status, "CREATE_COMPLETE");
    assert_eq!(deployments.call_count("describe_stack_events"), 3);
    assert_eq!(
        deployments.get_method_calls("connect")[0].args[1],
        "us-east-1"
    );

    let report = summary.to_string();
    assert!(report.contains(&summary.account_id));
    assert!(report.contains("sandbox@example.com"));
    assert!(report.contains("Resources deployed for account"));

    let run = workflow.last_run().unwrap();
    assert_eq!(
        run.path(),
        vec![
            WorkflowState::OrgReady,
            WorkflowState::OuReady,
            WorkflowState::AccountReady,
            WorkflowState::AccountPlaced,
            WorkflowState::RoleAssumed,
            WorkflowState::StackDeployed,
            WorkflowState::Done,
        ]
    );
}

/// A failed account creation stops the run before any role is assumed.
#[tokio::test]
async fn test_failed_account_creation_stops_run() {
    let harness = Harness::new();
    let org = harness
        .org
        .clone()
        .with_account_states(vec![CreateAccountState::Failed])
        .with_failure_reason("EMAIL_ALREADY_EXISTS");
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    let err = workflow.run(&sandbox_request()).await.unwrap_err();

    match err {
        VendError::AccountCreationFailed {
            account_name,
            reason,
        } => {
            assert_eq!(account_name, "Sandbox");
            assert!(reason.contains("EMAIL_ALREADY_EXISTS"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(org.accounts().is_empty());
    assert_eq!(harness.creds.attempts(), 0);
    assert!(!harness.deployments.was_called("connect"));

    let run = workflow.last_run().unwrap();
    assert_eq!(run.state, WorkflowState::Failed);
    assert!(!run.reached(WorkflowState::AccountReady));
    assert!(run.error.unwrap().contains("EMAIL_ALREADY_EXISTS"));
}

/// Running the same account-only request twice converges on one account
/// and one unit.
#[tokio::test]
async fn test_rerun_is_idempotent() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::account_vending());
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com");

    let first = workflow.run(&request).await.unwrap();
    let second = workflow.run(&request).await.unwrap();

    assert_eq!(first.account_id, second.account_id);
    assert_eq!(first.unit_id, second.unit_id);
    assert_eq!(first.placement, Placement::Moved);
    assert_eq!(second.placement, Placement::AlreadyPlaced);
    assert_eq!(harness.org.call_count("create_account"), 1);
    assert_eq!(harness.org.call_count("create_organizational_unit"), 1);
    assert_eq!(harness.org.accounts().len(), 1);
}

/// The same stack is never submitted twice from one workflow.
#[tokio::test]
async fn test_rerun_deploys_stack_once() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    workflow.run(&sandbox_request()).await.unwrap();
    let err = workflow.run(&sandbox_request()).await.unwrap_err();

    assert!(matches!(err, VendError::StackAlreadyExists(name) if name == "Baseline"));
    assert_eq!(harness.deployments.call_count("create_stack"), 1);
    assert_eq!(harness.org.call_count("create_account"), 1);
    assert_eq!(harness.creds.attempts(), 1);
}

/// Without a role and with deployment optional only the account is made.
#[tokio::test]
async fn test_account_only_mode() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::account_vending());
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com").deploy(baseline_plan());

    let summary = workflow.run(&request).await.unwrap();

    assert!(summary.stack.is_none());
    assert_eq!(harness.creds.attempts(), 0);
    assert!(harness.deployments.get_calls().is_empty());

    let created = harness.org.get_method_calls("create_account");
    assert_eq!(created[0].args[2], "ALLOW");
    assert_eq!(created[0].args[3], "");
    assert!(summary.to_string().contains("Only created account"));
    assert!(!workflow.last_run().unwrap().reached(WorkflowState::RoleAssumed));
}

/// A profile that requires the baseline rejects a request with no role
/// before contacting any provider.
#[tokio::test]
async fn test_required_deployment_without_role_is_config_error() {
    let harness = Harness::new();
    let profile = WorkflowProfile {
        default_role_name: None,
        ..WorkflowProfile::baseline_required()
    };
    let workflow = harness.workflow(profile);
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com").deploy(baseline_plan());

    let err = workflow.run(&request).await.unwrap_err();

    assert!(err.is_config());
    assert!(harness.org.get_calls().is_empty());
    assert_eq!(harness.creds.attempts(), 0);
}

/// A required deployment also needs a template to deploy.
#[tokio::test]
async fn test_required_deployment_without_plan_is_config_error() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::baseline_required());
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com");

    let err = workflow.run(&request).await.unwrap_err();

    assert!(err.is_config());
    assert!(harness.org.get_calls().is_empty());
}

/// When the unit cannot be created the account stays where it is.
#[tokio::test]
async fn test_unit_failure_skips_placement() {
    let harness = Harness::new();
    let org = harness
        .org
        .clone()
        .fail_on("create_organizational_unit", "AccessDeniedException");
    let workflow = harness.workflow(WorkflowProfile::account_vending());

    let summary = workflow
        .run(&ProvisionRequest::new("Sandbox", "sandbox@example.com"))
        .await
        .unwrap();

    assert!(summary.unit_id.is_none());
    assert_eq!(summary.placement, Placement::Skipped);
    assert!(!org.was_called("move_account"));
    assert_eq!(org.parent_of(&summary.account_id).as_deref(), Some("r-root"));
}

/// Only creating the unit is best effort; a failed lookup ends the run
/// before any account is touched.
#[tokio::test]
async fn test_unit_lookup_failure_stops_run() {
    let harness = Harness::new();
    let org = harness
        .org
        .clone()
        .fail_on("list_organizational_units", "ThrottlingException: Rate exceeded");
    let workflow = harness.workflow(WorkflowProfile::account_vending());

    let err = workflow
        .run(&ProvisionRequest::new("Sandbox", "sandbox@example.com"))
        .await
        .unwrap_err();

    match &err {
        VendError::Provider { message, .. } => assert!(message.contains("ThrottlingException")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!org.was_called("create_organizational_unit"));
    assert!(!org.was_called("create_account"));

    let run = workflow.last_run().unwrap();
    assert_eq!(run.state, WorkflowState::Failed);
    assert!(!run.reached(WorkflowState::OuReady));
}

/// A stack the provider never accepted can be submitted again.
#[tokio::test]
async fn test_rejected_submission_can_be_retried() {
    let harness = Harness::new();
    let deployments = harness.deployments.clone().fail_submissions(2);
    let mut retry = RetrySettings::default().with_interval_secs(0);
    retry.stack_submission = RetryPolicy::bounded(2).with_interval_secs(0);
    let workflow = ProvisioningWorkflow::new(
        Arc::new(harness.org.clone()),
        Arc::new(harness.creds.clone()),
        Arc::new(deployments.clone()),
        WorkflowProfile::baseline_required().with_retry(retry),
    );
    let plan = baseline_plan();

    let err = workflow
        .deploy_existing("111122223333", "OrganizationAccountAccessRole", &plan)
        .await
        .unwrap_err();
    assert!(matches!(err, VendError::RetriesExhausted { attempts: 2, .. }));
    assert!(deployments.submitted().is_empty());

    let stack = workflow
        .deploy_existing("111122223333", "OrganizationAccountAccessRole", &plan)
        .await
        .unwrap();
    assert_eq!(stack.stack_name, "Baseline");
    assert_eq!(deployments.submitted().len(), 1);
    assert_eq!(deployments.call_count("create_stack"), 3);
}

/// A rolled back stack ends the run with the rollback reason.
#[tokio::test]
async fn test_rollback_is_fatal() {
    let harness = Harness::new();
    let deployments = harness.deployments.clone().with_events(vec![
        StackEvent::new("AdminUser", "AWS::IAM::User", "CREATE_FAILED")
            .with_reason("Password does not conform to policy"),
        StackEvent::for_stack("Baseline", "ROLLBACK_COMPLETE")
            .with_reason("The following resource(s) failed to create: [AdminUser]."),
    ]);
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    let err = workflow.run(&sandbox_request()).await.unwrap_err();

    match &err {
        VendError::StackRolledBack {
            stack_name, status, ..
        } => {
            assert_eq!(stack_name, "Baseline");
            assert_eq!(status, "ROLLBACK_COMPLETE");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_fatal());
    assert!(!deployments.was_called("describe_stack"));

    let run = workflow.last_run().unwrap();
    assert!(run.reached(WorkflowState::RoleAssumed));
    assert!(!run.reached(WorkflowState::StackDeployed));
}

/// Role propagation delays are retried until the role can be assumed.
#[tokio::test]
async fn test_role_assumption_is_retried() {
    let mut harness = Harness::new();
    harness.creds = MockCredentialService::new().fail_times(
        2,
        "AccessDenied: not authorized to perform sts:AssumeRole",
    );
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    let summary = workflow.run(&sandbox_request()).await.unwrap();

    assert!(summary.stack.is_some());
    assert_eq!(harness.creds.attempts(), 3);
    assert_eq!(
        harness.deployments.get_method_calls("connect")[0].args[0],
        "ASIAMOCK2"
    );
}

/// Parameters the template does not declare are rejected before the role
/// is assumed.
#[tokio::test]
async fn test_undeclared_parameter_is_rejected() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::baseline_required());
    let plan = baseline_plan().parameter(StackParameter::new("Unknown", "value"));
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com").deploy(plan);

    let err = workflow.run(&request).await.unwrap_err();

    assert!(matches!(err, VendError::Template(_)));
    assert_eq!(harness.creds.attempts(), 0);
}

/// Profile defaults flow into the account request; the request wins
/// where it sets a value.
#[tokio::test]
async fn test_profile_defaults_and_overrides() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::baseline_required());
    let request = ProvisionRequest::new("Sandbox", "sandbox@example.com")
        .unit("Workloads")
        .policy("p-examplepolicy")
        .deploy(baseline_plan().region("eu-west-1"));

    let summary = workflow.run(&request).await.unwrap();

    let created = harness.org.get_method_calls("create_account");
    assert_eq!(created[0].args[2], "DENY");
    assert_eq!(created[0].args[3], "OrganizationAccountAccessRole");
    assert_eq!(harness.org.units()[0].name, "Workloads");

    let attached = harness.org.get_method_calls("attach_policy");
    assert_eq!(attached[0].args, vec!["p-examplepolicy", summary.account_id.as_str()]);
    assert!(summary.policy_response.is_some());

    assert_eq!(
        harness.deployments.get_method_calls("connect")[0].args[1],
        "eu-west-1"
    );
}

/// An existing account can receive the baseline without re-provisioning.
#[tokio::test]
async fn test_deploy_into_existing_account() {
    let harness = Harness::new();
    let workflow = harness.workflow(WorkflowProfile::baseline_required());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TEMPLATE.as_bytes()).unwrap();
    let template = Template::load(file.path()).unwrap();
    let plan = DeploymentPlan::new(template, "Baseline")
        .parameter(StackParameter::new("AdminUsername", "admin"));

    let stack = workflow
        .deploy_existing("111122223333", "OrganizationAccountAccessRole", &plan)
        .await
        .unwrap();

    assert_eq!(stack.stack_name, "Baseline");
    assert!(harness.org.get_calls().is_empty());
    assert_eq!(
        harness.creds.get_calls()[0].args[0],
        "arn:aws:iam::111122223333:role/OrganizationAccountAccessRole"
    );
    assert_eq!(workflow.last_run().unwrap().state, WorkflowState::Done);
}
