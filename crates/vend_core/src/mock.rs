//! In-memory service fakes for testing.
//!
//! Each fake keeps just enough state to behave like the real provider
//! across a whole provisioning run (units and accounts created by one run
//! are visible to the next), returns scripted status sequences, and
//! captures every call for verification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{VendError, VendResult};
use crate::models::{
    Account, CreateAccountState, CreateAccountStatus, CreateStackRequest, NewAccount,
    Organization, OrganizationStatus, OrganizationalUnit, Root, StackDescription, StackEvent,
    StackOutput, TemporaryCredentials,
};
use crate::service::{CredentialService, DeploymentConnector, DeploymentService, OrganizationService};

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedCall {
    pub method: String,
    pub args: Vec<String>,
}

impl CapturedCall {
    fn new(method: &str, args: &[&str]) -> Self {
        Self {
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Default)]
struct CallLog {
    calls: RwLock<Vec<CapturedCall>>,
}

impl CallLog {
    fn record(&self, method: &str, args: &[&str]) {
        self.calls.write().push(CapturedCall::new(method, args));
    }

    fn all(&self) -> Vec<CapturedCall> {
        self.calls.read().clone()
    }

    fn count(&self, method: &str) -> usize {
        self.calls.read().iter().filter(|c| c.method == method).count()
    }

    fn of(&self, method: &str) -> Vec<CapturedCall> {
        self.calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }
}

/// Return the scripted entry for `index`, repeating the last one.
fn scripted<T: Clone>(script: &[T], index: usize) -> Option<T> {
    script.get(index).or_else(|| script.last()).cloned()
}

#[derive(Default)]
struct OrgState {
    organization: Option<Organization>,
    roots: Vec<Root>,
    units: Vec<OrganizationalUnit>,
    accounts: Vec<Account>,
    parents: HashMap<String, String>,
    pending: HashMap<String, NewAccount>,
}

/// Fake organization management service.
#[derive(Clone)]
pub struct MockOrganizationService {
    state: Arc<RwLock<OrgState>>,
    org_status_script: Arc<RwLock<Vec<OrganizationStatus>>>,
    account_status_script: Arc<RwLock<Vec<CreateAccountState>>>,
    account_failure_reason: Arc<RwLock<String>>,
    status_index: Arc<AtomicUsize>,
    failures: Arc<RwLock<HashMap<String, String>>>,
    next_id: Arc<AtomicUsize>,
    log: Arc<CallLog>,
}

impl Default for MockOrganizationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrganizationService {
    /// An organization with one root and nothing else.
    pub fn new() -> Self {
        let state = OrgState {
            organization: Some(Organization {
                id: "o-mock".to_string(),
                status: OrganizationStatus::Enabled,
            }),
            roots: vec![Root {
                id: "r-root".to_string(),
                name: "Root".to_string(),
            }],
            ..OrgState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            org_status_script: Arc::new(RwLock::new(vec![OrganizationStatus::Enabled])),
            account_status_script: Arc::new(RwLock::new(vec![CreateAccountState::Succeeded])),
            account_failure_reason: Arc::new(RwLock::new("INTERNAL_FAILURE".to_string())),
            status_index: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
            log: Arc::new(CallLog::default()),
        }
    }

    /// Start without an organization.
    pub fn without_organization(self) -> Self {
        self.state.write().organization = None;
        self
    }

    /// Statuses reported while a newly created organization is polled.
    pub fn with_org_statuses(self, statuses: Vec<OrganizationStatus>) -> Self {
        *self.org_status_script.write() = statuses;
        self
    }

    pub fn with_unit(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        {
            let mut state = self.state.write();
            let parent_id = state.roots[0].id.clone();
            state.units.push(OrganizationalUnit {
                id: id.into(),
                name: name.into(),
                parent_id,
            });
        }
        self
    }

    /// An existing account directly under `parent_id`.
    pub fn with_account(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        {
            let id = id.into();
            let mut state = self.state.write();
            state.parents.insert(id.clone(), parent_id.into());
            state.accounts.push(Account {
                id,
                name: name.into(),
                email: email.into(),
            });
        }
        self
    }

    /// States reported by successive creation status polls.
    pub fn with_account_states(self, states: Vec<CreateAccountState>) -> Self {
        *self.account_status_script.write() = states;
        self
    }

    pub fn with_failure_reason(self, reason: impl Into<String>) -> Self {
        *self.account_failure_reason.write() = reason.into();
        self
    }

    /// Make `method` fail with `message` on every call.
    pub fn fail_on(self, method: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.write().insert(method.into(), message.into());
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.log.count(method) > 0
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.log.of(method)
    }

    pub fn units(&self) -> Vec<OrganizationalUnit> {
        self.state.read().units.clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.state.read().accounts.clone()
    }

    pub fn parent_of(&self, account_id: &str) -> Option<String> {
        self.state.read().parents.get(account_id).cloned()
    }

    fn check_failure(&self, method: &str) -> VendResult<()> {
        if let Some(msg) = self.failures.read().get(method) {
            return Err(VendError::provider(method, msg));
        }
        Ok(())
    }

    fn allocate_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("{}{:012}", prefix, n)
    }
}

#[async_trait]
impl OrganizationService for MockOrganizationService {
    async fn describe_organization(&self) -> VendResult<Option<Organization>> {
        self.log.record("describe_organization", &[]);
        self.check_failure("describe_organization")?;
        let mut state = self.state.write();
        if let Some(org) = state.organization.as_mut() {
            if org.status == OrganizationStatus::PendingEnable {
                let index = self.status_index.fetch_add(1, Ordering::SeqCst);
                if let Some(status) = scripted(&self.org_status_script.read(), index) {
                    org.status = status;
                }
            }
        }
        Ok(state.organization.clone())
    }

    async fn create_organization(&self) -> VendResult<Organization> {
        self.log.record("create_organization", &[]);
        self.check_failure("create_organization")?;
        let org = Organization {
            id: "o-created".to_string(),
            status: OrganizationStatus::PendingEnable,
        };
        self.state.write().organization = Some(org.clone());
        Ok(org)
    }

    async fn list_roots(&self) -> VendResult<Vec<Root>> {
        self.log.record("list_roots", &[]);
        self.check_failure("list_roots")?;
        Ok(self.state.read().roots.clone())
    }

    async fn list_organizational_units(
        &self,
        parent_id: &str,
    ) -> VendResult<Vec<OrganizationalUnit>> {
        self.log.record("list_organizational_units", &[parent_id]);
        self.check_failure("list_organizational_units")?;
        Ok(self
            .state
            .read()
            .units
            .iter()
            .filter(|u| u.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> VendResult<OrganizationalUnit> {
        self.log.record("create_organizational_unit", &[parent_id, name]);
        self.check_failure("create_organizational_unit")?;
        let unit = OrganizationalUnit {
            id: self.allocate_id("ou-"),
            name: name.to_string(),
            parent_id: parent_id.to_string(),
        };
        self.state.write().units.push(unit.clone());
        Ok(unit)
    }

    async fn list_accounts(&self) -> VendResult<Vec<Account>> {
        self.log.record("list_accounts", &[]);
        self.check_failure("list_accounts")?;
        Ok(self.state.read().accounts.clone())
    }

    async fn list_accounts_for_parent(&self, parent_id: &str) -> VendResult<Vec<Account>> {
        self.log.record("list_accounts_for_parent", &[parent_id]);
        self.check_failure("list_accounts_for_parent")?;
        let state = self.state.read();
        Ok(state
            .accounts
            .iter()
            .filter(|a| state.parents.get(&a.id).map(String::as_str) == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn create_account(&self, request: &NewAccount) -> VendResult<CreateAccountStatus> {
        self.log.record(
            "create_account",
            &[
                request.name.as_str(),
                request.email.as_str(),
                request.billing_access.as_str(),
                request.role_name.as_deref().unwrap_or(""),
            ],
        );
        self.check_failure("create_account")?;
        let request_id = self.allocate_id("car-");
        self.state
            .write()
            .pending
            .insert(request_id.clone(), request.clone());
        self.status_index.store(0, Ordering::SeqCst);
        Ok(CreateAccountStatus::in_progress(request_id))
    }

    async fn describe_create_account_status(
        &self,
        request_id: &str,
    ) -> VendResult<CreateAccountStatus> {
        self.log.record("describe_create_account_status", &[request_id]);
        self.check_failure("describe_create_account_status")?;

        let index = self.status_index.fetch_add(1, Ordering::SeqCst);
        let state = scripted(&self.account_status_script.read(), index)
            .unwrap_or(CreateAccountState::Succeeded);

        match state {
            CreateAccountState::InProgress => Ok(CreateAccountStatus::in_progress(request_id)),
            CreateAccountState::Failed => Ok(CreateAccountStatus::failed(
                request_id,
                self.account_failure_reason.read().clone(),
            )),
            CreateAccountState::Succeeded => {
                let mut org = self.state.write();
                let request = org.pending.remove(request_id).ok_or_else(|| {
                    VendError::provider(
                        "describe_create_account_status",
                        format!("CreateAccountStatusNotFoundException: {}", request_id),
                    )
                })?;
                let serial = self.next_id.fetch_add(1, Ordering::SeqCst) as u64;
                let account_id = format!("{:012}", 100_000_000_000u64 + serial);
                let root_id = org.roots[0].id.clone();
                org.parents.insert(account_id.clone(), root_id);
                org.accounts.push(Account {
                    id: account_id.clone(),
                    name: request.name,
                    email: request.email,
                });
                Ok(CreateAccountStatus::succeeded(request_id, account_id))
            }
        }
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> VendResult<()> {
        self.log.record(
            "move_account",
            &[account_id, source_parent_id, destination_parent_id],
        );
        self.check_failure("move_account")?;
        let mut state = self.state.write();
        match state.parents.get(account_id) {
            Some(parent) if parent == source_parent_id => {
                state
                    .parents
                    .insert(account_id.to_string(), destination_parent_id.to_string());
                Ok(())
            }
            _ => Err(VendError::provider(
                "move_account",
                format!("SourceParentNotFoundException: {}", source_parent_id),
            )),
        }
    }

    async fn attach_policy(&self, policy_id: &str, target_id: &str) -> VendResult<String> {
        self.log.record("attach_policy", &[policy_id, target_id]);
        self.check_failure("attach_policy")?;
        Ok(format!("attached {} to {}", policy_id, target_id))
    }
}

/// Fake token service that fails a fixed number of times before succeeding.
#[derive(Clone)]
pub struct MockCredentialService {
    failures_before_success: Arc<AtomicUsize>,
    failure_message: Arc<RwLock<String>>,
    attempts: Arc<AtomicUsize>,
    log: Arc<CallLog>,
}

impl Default for MockCredentialService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCredentialService {
    pub fn new() -> Self {
        Self {
            failures_before_success: Arc::new(AtomicUsize::new(0)),
            failure_message: Arc::new(RwLock::new(
                "Throttling: Rate exceeded".to_string(),
            )),
            attempts: Arc::new(AtomicUsize::new(0)),
            log: Arc::new(CallLog::default()),
        }
    }

    pub fn fail_times(self, count: usize, message: impl Into<String>) -> Self {
        self.failures_before_success.store(count, Ordering::SeqCst);
        *self.failure_message.write() = message.into();
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.log.all()
    }
}

#[async_trait]
impl CredentialService for MockCredentialService {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> VendResult<TemporaryCredentials> {
        self.log.record("assume_role", &[role_arn, session_name]);
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures_before_success.load(Ordering::SeqCst) {
            return Err(VendError::provider(
                "AssumeRole",
                self.failure_message.read().clone(),
            ));
        }
        Ok(TemporaryCredentials::new(
            format!("ASIAMOCK{}", attempt),
            "mock-secret",
            "mock-session-token",
        ))
    }
}

/// Fake deployment service; also acts as its own connector.
#[derive(Clone)]
pub struct MockDeploymentService {
    submit_failures: Arc<AtomicUsize>,
    submit_attempts: Arc<AtomicUsize>,
    event_script: Arc<RwLock<Vec<StackEvent>>>,
    event_index: Arc<AtomicUsize>,
    outputs: Arc<RwLock<Vec<StackOutput>>>,
    requests: Arc<RwLock<Vec<CreateStackRequest>>>,
    log: Arc<CallLog>,
}

impl Default for MockDeploymentService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDeploymentService {
    /// A stack that completes on the first poll.
    pub fn new() -> Self {
        Self {
            submit_failures: Arc::new(AtomicUsize::new(0)),
            submit_attempts: Arc::new(AtomicUsize::new(0)),
            event_script: Arc::new(RwLock::new(Vec::new())),
            event_index: Arc::new(AtomicUsize::new(0)),
            outputs: Arc::new(RwLock::new(Vec::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            log: Arc::new(CallLog::default()),
        }
    }

    /// Latest events reported by successive polls.
    pub fn with_events(self, events: Vec<StackEvent>) -> Self {
        *self.event_script.write() = events;
        self
    }

    pub fn fail_submissions(self, count: usize) -> Self {
        self.submit_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_output(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.write().push(StackOutput {
            key: key.into(),
            value: value.into(),
            description: None,
        });
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.log.all()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.log.count(method)
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.log.count(method) > 0
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.log.of(method)
    }

    /// Requests that were accepted by `create_stack`.
    pub fn submitted(&self) -> Vec<CreateStackRequest> {
        self.requests.read().clone()
    }
}

#[async_trait]
impl DeploymentConnector for MockDeploymentService {
    async fn connect(
        &self,
        credentials: &TemporaryCredentials,
        region: &str,
    ) -> VendResult<Arc<dyn DeploymentService>> {
        self.log
            .record("connect", &[credentials.access_key_id.as_str(), region]);
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl DeploymentService for MockDeploymentService {
    async fn create_stack(&self, request: &CreateStackRequest) -> VendResult<String> {
        self.log.record("create_stack", &[request.stack_name.as_str()]);
        let attempt = self.submit_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.submit_failures.load(Ordering::SeqCst) {
            return Err(VendError::provider(
                "CreateStack",
                "Throttling: Rate exceeded",
            ));
        }
        let mut requests = self.requests.write();
        if requests.iter().any(|r| r.stack_name == request.stack_name) {
            return Err(VendError::StackAlreadyExists(request.stack_name.clone()));
        }
        requests.push(request.clone());
        self.event_index.store(0, Ordering::SeqCst);
        Ok(format!("arn:aws:cloudformation:mock:stack/{}", request.stack_name))
    }

    async fn describe_stack_events(&self, stack_name: &str) -> VendResult<Vec<StackEvent>> {
        self.log.record("describe_stack_events", &[stack_name]);
        let index = self.event_index.fetch_add(1, Ordering::SeqCst);
        let latest = scripted(&self.event_script.read(), index)
            .unwrap_or_else(|| StackEvent::for_stack(stack_name, "CREATE_COMPLETE"));
        Ok(vec![latest])
    }

    async fn describe_stack(&self, stack_name: &str) -> VendResult<StackDescription> {
        self.log.record("describe_stack", &[stack_name]);
        Ok(StackDescription {
            stack_id: format!("arn:aws:cloudformation:mock:stack/{}", stack_name),
            stack_name: stack_name.to_string(),
            status: "CREATE_COMPLETE".to_string(),
            outputs: self.outputs.read().clone(),
            creation_time: None,
        })
    }
}
