//! # vend_workflow
//!
//! Ties the organization, token and deployment services together into a
//! single provisioning run:
//!
//! 1. make sure an organization exists
//! 2. ensure the organizational unit under the root
//! 3. ensure the account and wait for it to be created
//! 4. move it into the unit and optionally attach a policy
//! 5. assume the account's role and deploy the baseline stack
//!
//! Every step is idempotent, so re-running the same request converges
//! instead of duplicating accounts or units. The run is recorded as a
//! sequence of [`WorkflowState`] transitions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vend_core::{
//!     MockCredentialService, MockDeploymentService, MockOrganizationService, WorkflowProfile,
//! };
//! use vend_workflow::{ProvisionRequest, ProvisioningWorkflow};
//!
//! # async fn run() -> vend_core::VendResult<()> {
//! let workflow = ProvisioningWorkflow::new(
//!     Arc::new(MockOrganizationService::new()),
//!     Arc::new(MockCredentialService::new()),
//!     Arc::new(MockDeploymentService::new()),
//!     WorkflowProfile::account_vending(),
//! );
//!
//! let summary = workflow
//!     .run(&ProvisionRequest::new("Sandbox", "sandbox@example.com"))
//!     .await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod request;
pub mod state;
pub mod summary;
pub mod workflow;

pub use request::{DeploymentPlan, ProvisionRequest};
pub use state::{Transition, WorkflowRun, WorkflowState};
pub use summary::ProvisioningSummary;
pub use workflow::ProvisioningWorkflow;
