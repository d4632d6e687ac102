//! Workflow states and the per-run transition log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provisioning state. Each step moves forward by one state; any step may
/// end the run in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Start,
    OrgReady,
    OuReady,
    AccountReady,
    AccountPlaced,
    RoleAssumed,
    StackDeployed,
    Done,
    Failed,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::Start
    }
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "START",
            WorkflowState::OrgReady => "ORG_READY",
            WorkflowState::OuReady => "OU_READY",
            WorkflowState::AccountReady => "ACCOUNT_READY",
            WorkflowState::AccountPlaced => "ACCOUNT_PLACED",
            WorkflowState::RoleAssumed => "ROLE_ASSUMED",
            WorkflowState::StackDeployed => "STACK_DEPLOYED",
            WorkflowState::Done => "DONE",
            WorkflowState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub state: WorkflowState,
    pub at: DateTime<Utc>,
    pub note: String,
}

/// Record of one provisioning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub account_name: String,
    pub state: WorkflowState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub transitions: Vec<Transition>,
    pub error: Option<String>,
}

impl WorkflowRun {
    pub fn new(account_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            state: WorkflowState::Start,
            started_at: Utc::now(),
            completed_at: None,
            transitions: Vec::new(),
            error: None,
        }
    }

    pub fn advance(&mut self, state: WorkflowState, note: impl Into<String>) {
        self.state = state;
        self.transitions.push(Transition {
            state,
            at: Utc::now(),
            note: note.into(),
        });
        if state.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn fail(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        self.advance(WorkflowState::Failed, message.clone());
        self.error = Some(message);
    }

    /// States visited, in order.
    pub fn path(&self) -> Vec<WorkflowState> {
        self.transitions.iter().map(|t| t.state).collect()
    }

    pub fn reached(&self, state: WorkflowState) -> bool {
        self.transitions.iter().any(|t| t.state == state)
    }
}
