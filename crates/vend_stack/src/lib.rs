//! # vend_stack
//!
//! Deploys the baseline stack into a freshly provisioned account.
//!
//! - [`Template`]: loads a local template and reads its declared parameters
//! - [`DeploymentOrchestrator`]: submits the stack with the account's
//!   temporary credentials and follows its events to a terminal state
//! - [`AwsDeploymentConnector`]: CloudFormation clients scoped to assumed
//!   credentials and a region

pub mod aws;
pub mod orchestrator;
pub mod template;

pub use aws::{AwsDeploymentConnector, AwsDeploymentService};
pub use orchestrator::{
    build_create_request, DeploymentOrchestrator, SubmittedStack, DATE_FORMAT,
    NAMED_IAM_CAPABILITY,
};
pub use template::Template;
