//! Workflow profiles.
//!
//! A profile captures the defaults that distinguish one provisioning
//! setup from another (billing access, region, role, whether a baseline
//! deployment is mandatory) together with the retry bounds of every
//! wait loop.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VendError, VendResult};
use crate::models::BillingAccess;
use crate::retry::RetryPolicy;

/// Retry bounds for each call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub organization_enable: RetryPolicy,
    pub account_creation: RetryPolicy,
    pub role_assumption: RetryPolicy,
    pub stack_submission: RetryPolicy,
    pub stack_events: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            organization_enable: RetryPolicy::bounded(60),
            account_creation: RetryPolicy::bounded(180),
            role_assumption: RetryPolicy::bounded(60),
            stack_submission: RetryPolicy::bounded(30),
            stack_events: RetryPolicy::bounded(360),
        }
    }
}

impl RetrySettings {
    /// Retry forever at the default interval.
    pub fn unbounded() -> Self {
        Self::uniform(RetryPolicy::unbounded())
    }

    pub fn uniform(policy: RetryPolicy) -> Self {
        Self {
            organization_enable: policy,
            account_creation: policy,
            role_assumption: policy,
            stack_submission: policy,
            stack_events: policy,
        }
    }

    /// Override the interval on every call site.
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        for policy in self.policies_mut() {
            *policy = policy.with_interval_secs(secs);
        }
        self
    }

    /// Override the attempt bound on every call site.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        for policy in self.policies_mut() {
            *policy = policy.with_max_attempts(max_attempts);
        }
        self
    }

    fn policies_mut(&mut self) -> [&mut RetryPolicy; 5] {
        [
            &mut self.organization_enable,
            &mut self.account_creation,
            &mut self.role_assumption,
            &mut self.stack_submission,
            &mut self.stack_events,
        ]
    }
}

/// Named presets shipped with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfilePreset {
    /// Account first; the baseline stack only when a role is supplied.
    AccountVending,
    /// Every account gets the baseline stack through the default admin role.
    BaselineRequired,
}

impl ProfilePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfilePreset::AccountVending => "account-vending",
            ProfilePreset::BaselineRequired => "baseline-required",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "account-vending" => Some(ProfilePreset::AccountVending),
            "baseline-required" => Some(ProfilePreset::BaselineRequired),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![ProfilePreset::AccountVending, ProfilePreset::BaselineRequired]
    }

    pub fn profile(&self) -> WorkflowProfile {
        match self {
            ProfilePreset::AccountVending => WorkflowProfile::account_vending(),
            ProfilePreset::BaselineRequired => WorkflowProfile::baseline_required(),
        }
    }
}

impl std::fmt::Display for ProfilePreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Defaults applied to one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowProfile {
    pub billing_access: BillingAccess,
    pub default_region: String,
    pub default_role_name: Option<String>,
    pub deployment_required: bool,
    pub template_file: String,
    pub stack_name: String,
    pub retry: RetrySettings,
}

impl Default for WorkflowProfile {
    fn default() -> Self {
        Self::account_vending()
    }
}

impl WorkflowProfile {
    pub fn account_vending() -> Self {
        Self {
            billing_access: BillingAccess::Allow,
            default_region: "us-west-1".to_string(),
            default_role_name: None,
            deployment_required: false,
            template_file: "baseline.yml".to_string(),
            stack_name: "Baseline".to_string(),
            retry: RetrySettings::default(),
        }
    }

    pub fn baseline_required() -> Self {
        Self {
            billing_access: BillingAccess::Deny,
            default_region: "us-east-1".to_string(),
            default_role_name: Some("OrganizationAccountAccessRole".to_string()),
            deployment_required: true,
            ..Self::account_vending()
        }
    }

    /// Load a profile from a YAML file. Missing keys take the
    /// account-vending defaults.
    pub fn load(path: &Path) -> VendResult<Self> {
        debug!("Loading workflow profile from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| {
            VendError::Config(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> VendResult<Self> {
        let profile: Self = serde_yaml::from_str(content)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_yaml(&self) -> VendResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> VendResult<()> {
        if self.default_region.trim().is_empty() {
            return Err(VendError::Config("default_region must not be empty".to_string()));
        }
        if self.stack_name.trim().is_empty() {
            return Err(VendError::Config("stack_name must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_billing_access(mut self, billing_access: BillingAccess) -> Self {
        self.billing_access = billing_access;
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.default_role_name = Some(role_name.into());
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_where_expected() {
        let vending = WorkflowProfile::account_vending();
        let baseline = WorkflowProfile::baseline_required();

        assert_eq!(vending.billing_access, BillingAccess::Allow);
        assert_eq!(vending.default_region, "us-west-1");
        assert!(vending.default_role_name.is_none());
        assert!(!vending.deployment_required);

        assert_eq!(baseline.billing_access, BillingAccess::Deny);
        assert_eq!(baseline.default_region, "us-east-1");
        assert_eq!(
            baseline.default_role_name.as_deref(),
            Some("OrganizationAccountAccessRole")
        );
        assert!(baseline.deployment_required);
        assert_eq!(baseline.stack_name, vending.stack_name);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let profile = WorkflowProfile::from_yaml(
            "billing_access: deny\ndefault_region: eu-west-1\nretry:\n  role_assumption:\n    interval_secs: 5\n    max_attempts: 3\n",
        )
        .unwrap();

        assert_eq!(profile.billing_access, BillingAccess::Deny);
        assert_eq!(profile.default_region, "eu-west-1");
        assert_eq!(profile.stack_name, "Baseline");
        assert_eq!(profile.retry.role_assumption.interval_secs, 5);
        assert_eq!(profile.retry.role_assumption.max_attempts, Some(3));
        assert_eq!(profile.retry.stack_events, RetrySettings::default().stack_events);
    }

    #[test]
    fn test_empty_region_rejected() {
        let err = WorkflowProfile::from_yaml("default_region: ''\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_retry_overrides_apply_everywhere() {
        let retry = RetrySettings::default()
            .with_interval_secs(0)
            .with_max_attempts(Some(2));
        assert_eq!(retry.stack_submission.interval_secs, 0);
        assert_eq!(retry.account_creation.max_attempts, Some(2));
        assert_eq!(RetrySettings::unbounded().stack_events.max_attempts, None);
    }

    #[test]
    fn test_load_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yml");
        std::fs::write(&path, "default_role_name: AdminRole\ndeployment_required: true\n").unwrap();

        let profile = WorkflowProfile::load(&path).unwrap();
        assert_eq!(profile.default_role_name.as_deref(), Some("AdminRole"));
        assert!(profile.deployment_required);

        let missing = WorkflowProfile::load(&dir.path().join("absent.yml")).unwrap_err();
        assert!(missing.is_config());
    }

    #[test]
    fn test_yaml_round_trip_preset() {
        let yaml = WorkflowProfile::baseline_required().to_yaml().unwrap();
        assert!(yaml.contains("deployment_required: true"));
        assert_eq!(
            ProfilePreset::from_str("baseline-required"),
            Some(ProfilePreset::BaselineRequired)
        );
    }
}
