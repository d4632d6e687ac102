//! # vend_core
//!
//! Shared building blocks for vend, the account vending tool.
//!
//! - **Models**: organizations, units, accounts, credentials and stacks as
//!   interpreted from provider responses
//! - **Services**: capability traits for the organization, token and
//!   deployment providers
//! - **Retry**: fixed-interval retry and status polling with optional bounds
//! - **Config**: workflow profiles and their presets
//! - **Mock**: in-memory fakes of every service for tests
//!
//! # Example
//!
//! ```rust
//! use vend_core::{RetryPolicy, WorkflowProfile};
//!
//! let profile = WorkflowProfile::baseline_required();
//! assert!(profile.deployment_required);
//!
//! let policy = RetryPolicy::bounded(5).with_interval_secs(2);
//! assert_eq!(policy.max_attempts, Some(5));
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod models;
pub mod retry;
pub mod service;

pub use config::{ProfilePreset, RetrySettings, WorkflowProfile};
pub use error::{VendError, VendResult};
pub use mock::{CapturedCall, MockCredentialService, MockDeploymentService, MockOrganizationService};
pub use models::{
    Account, BillingAccess, CreateAccountState, CreateAccountStatus, CreateStackRequest,
    NewAccount, OnFailure, Organization, OrganizationStatus, OrganizationalUnit, Placement, Root,
    StackDescription, StackEvent, StackOutput, StackParameter, StackStatusKind, Tag,
    TemporaryCredentials, STACK_RESOURCE_TYPE,
};
pub use retry::{PollStatus, RetryPolicy, DEFAULT_INTERVAL_SECS};
pub use service::{CredentialService, DeploymentConnector, DeploymentService, OrganizationService};
