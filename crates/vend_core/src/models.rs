//! Domain model interpreted from provider responses.
//!
//! Nothing here is persisted; every value is read back from the
//! organization, token or deployment service during a single run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Resource type the deployment service reports for the stack itself.
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Enablement status of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrganizationStatus {
    PendingEnable,
    Enabled,
    PendingDisable,
}

impl OrganizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrganizationStatus::PendingEnable => "PENDING_ENABLE",
            OrganizationStatus::Enabled => "ENABLED",
            OrganizationStatus::PendingDisable => "PENDING_DISABLE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING_ENABLE" => Some(OrganizationStatus::PendingEnable),
            "ENABLED" => Some(OrganizationStatus::Enabled),
            "PENDING_DISABLE" => Some(OrganizationStatus::PendingDisable),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrganizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub status: OrganizationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub parent_id: String,
}

/// Whether IAM users in the new account may see billing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingAccess {
    Allow,
    Deny,
}

impl BillingAccess {
    /// Provider wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingAccess::Allow => "ALLOW",
            BillingAccess::Deny => "DENY",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Some(BillingAccess::Allow),
            "deny" => Some(BillingAccess::Deny),
            _ => None,
        }
    }
}

impl Default for BillingAccess {
    fn default() -> Self {
        Self::Allow
    }
}

impl std::fmt::Display for BillingAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Parameters of a create-account request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub billing_access: BillingAccess,
    /// Cross-account role the provider should create in the new account.
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateAccountState {
    InProgress,
    Succeeded,
    Failed,
}

impl CreateAccountState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateAccountState::InProgress => "IN_PROGRESS",
            CreateAccountState::Succeeded => "SUCCEEDED",
            CreateAccountState::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for CreateAccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of an asynchronous account creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountStatus {
    pub request_id: String,
    pub state: CreateAccountState,
    pub account_id: Option<String>,
    pub failure_reason: Option<String>,
}

impl CreateAccountStatus {
    pub fn in_progress(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: CreateAccountState::InProgress,
            account_id: None,
            failure_reason: None,
        }
    }

    pub fn succeeded(request_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: CreateAccountState::Succeeded,
            account_id: Some(account_id.into()),
            failure_reason: None,
        }
    }

    pub fn failed(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            state: CreateAccountState::Failed,
            account_id: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Where an account ended up after the placement step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    AlreadyPlaced,
    Moved,
    /// No organizational unit was available to move into.
    Skipped,
    Failed(String),
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::AlreadyPlaced => write!(f, "already placed"),
            Placement::Moved => write!(f, "moved"),
            Placement::Skipped => write!(f, "skipped"),
            Placement::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Temporary cross-account credentials.
///
/// Held only for the duration of one deployment; secrets are wiped on drop.
#[derive(Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: Zeroizing<String>,
    pub session_token: Zeroizing<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: Zeroizing::new(session_token.into()),
            expiration: None,
        }
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A template parameter passed to the deployment service.
#[derive(Clone, PartialEq, Eq)]
pub struct StackParameter {
    pub key: String,
    pub value: Zeroizing<String>,
    pub secret: bool,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Zeroizing::new(value.into()),
            secret: false,
        }
    }

    /// A parameter whose value never appears in logs.
    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            secret: true,
            ..Self::new(key, value)
        }
    }
}

impl std::fmt::Debug for StackParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value: &str = if self.secret { "<redacted>" } else { self.value.as_str() };
        f.debug_struct("StackParameter")
            .field("key", &self.key)
            .field("value", &value)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnFailure {
    Rollback,
    Delete,
    DoNothing,
}

impl OnFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnFailure::Rollback => "ROLLBACK",
            OnFailure::Delete => "DELETE",
            OnFailure::DoNothing => "DO_NOTHING",
        }
    }
}

/// A fully assembled create-stack request.
#[derive(Debug, Clone)]
pub struct CreateStackRequest {
    pub stack_name: String,
    pub template_body: String,
    pub parameters: Vec<StackParameter>,
    pub capabilities: Vec<String>,
    pub on_failure: OnFailure,
    pub tags: Vec<Tag>,
}

/// One entry of a stack's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub logical_resource_id: String,
    pub resource_type: String,
    pub resource_status: String,
    pub status_reason: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl StackEvent {
    pub fn new(
        logical_resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_status: impl Into<String>,
    ) -> Self {
        Self {
            logical_resource_id: logical_resource_id.into(),
            resource_type: resource_type.into(),
            resource_status: resource_status.into(),
            status_reason: None,
            timestamp: None,
        }
    }

    /// Event about the stack as a whole rather than one of its resources.
    pub fn for_stack(stack_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self::new(stack_name, STACK_RESOURCE_TYPE, status)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.status_reason = Some(reason.into());
        self
    }

    pub fn is_stack_itself(&self) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE
    }

    /// Interpret this event as the overall stack status.
    pub fn classify(&self) -> StackStatusKind {
        match self.resource_status.as_str() {
            "CREATE_COMPLETE" if self.is_stack_itself() => StackStatusKind::Complete,
            "ROLLBACK_COMPLETE" => StackStatusKind::RolledBack,
            "ROLLBACK_FAILED" | "CREATE_FAILED" | "DELETE_COMPLETE" if self.is_stack_itself() => {
                StackStatusKind::RolledBack
            }
            _ => StackStatusKind::InProgress,
        }
    }
}

/// Overall stack state derived from its latest event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatusKind {
    Complete,
    RolledBack,
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    pub stack_id: String,
    pub stack_name: String,
    pub status: String,
    pub outputs: Vec<StackOutput>,
    pub creation_time: Option<DateTime<Utc>>,
}
