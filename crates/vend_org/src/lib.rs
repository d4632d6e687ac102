//! # vend_org
//!
//! Organization-side provisioning for vend.
//!
//! [`OrganizationAdapter`] implements the idempotent "ensure" operations
//! (organization, organizational unit, account, placement, policy) on top
//! of any [`vend_core::OrganizationService`]. [`AwsOrganizationService`]
//! is the AWS Organizations implementation of that service.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vend_core::{BillingAccess, MockOrganizationService, RetrySettings};
//! use vend_org::OrganizationAdapter;
//!
//! # async fn run() -> vend_core::VendResult<()> {
//! let adapter = OrganizationAdapter::new(Arc::new(MockOrganizationService::new()))
//!     .with_retry(RetrySettings::default().with_interval_secs(0));
//!
//! adapter.ensure_organization().await?;
//! let root_id = adapter.root_id().await?;
//! let unit_id = adapter.ensure_organizational_unit(&root_id, "Sandbox").await?;
//! let account_id = adapter
//!     .ensure_account("Sandbox", "sandbox@example.com", BillingAccess::Allow, None)
//!     .await?;
//! adapter.move_account_if_needed(&account_id, &unit_id, &root_id).await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod aws;

pub use adapter::OrganizationAdapter;
pub use aws::AwsOrganizationService;
