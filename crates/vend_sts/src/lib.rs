//! # vend_sts
//!
//! Exchanges an account id and role name for temporary credentials in that
//! account. Role propagation after account creation is eventually
//! consistent, so [`CredentialBroker::assume_role`] keeps retrying until the
//! token service accepts the request or the retry policy runs out.

pub mod aws;
pub mod broker;

pub use aws::AwsCredentialService;
pub use broker::{role_arn, CredentialBroker, SESSION_NAME};
