//! Arguments and helpers shared by the provisioning commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use clap::Args;
use console::Term;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use vend_core::{BillingAccess, ProfilePreset, StackParameter, VendError, WorkflowProfile};
use vend_stack::Template;
use vend_workflow::DeploymentPlan;

/// Environment variable consulted before prompting for the password.
pub const PASSWORD_ENV: &str = "VEND_ADMIN_PASSWORD";

const ADMIN_USERNAME: &str = "AdminUsername";
const ADMIN_PASSWORD: &str = "AdminPassword";

#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Built-in profile to start from (account-vending, baseline-required)
    #[arg(long, env = "VEND_PRESET", default_value = "account-vending")]
    pub preset: String,

    /// YAML profile file; replaces the preset
    #[arg(long, env = "VEND_PROFILE_FILE")]
    pub profile_file: Option<PathBuf>,

    /// Billing access for IAM users of the new account (allow, deny)
    #[arg(long)]
    pub billing_access: Option<String>,

    /// Give up on every retried call after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait between retries and status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

impl ProfileArgs {
    /// The preset or profile file with command-line overrides applied.
    pub fn resolve(&self) -> Result<WorkflowProfile> {
        let mut profile = match &self.profile_file {
            Some(path) => WorkflowProfile::load(path)
                .with_context(|| format!("Failed to load profile {}", path.display()))?,
            None => ProfilePreset::from_str(&self.preset)
                .ok_or_else(|| VendError::Config(format!("unknown preset: {}", self.preset)))?
                .profile(),
        };

        if let Some(value) = &self.billing_access {
            let billing_access = BillingAccess::from_str(value)
                .ok_or_else(|| VendError::Config(format!("invalid billing access: {}", value)))?;
            profile = profile.with_billing_access(billing_access);
        }
        if let Some(max_attempts) = self.max_attempts {
            profile.retry = profile.retry.with_max_attempts(Some(max_attempts));
        }
        if let Some(secs) = self.poll_interval {
            profile.retry = profile.retry.with_interval_secs(secs);
        }

        profile.validate()?;
        Ok(profile)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeploymentArgs {
    /// Template to deploy; defaults to the profile's template file
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// Stack name; defaults to the profile's stack name
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Region to deploy into; defaults to the profile's region
    #[arg(long)]
    pub stack_region: Option<String>,

    /// Value for the template's AdminUsername parameter
    #[arg(long, env = "VEND_ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Extra template parameter, repeatable
    #[arg(long = "parameter", value_name = "KEY=VALUE", value_parser = parse_parameter)]
    pub parameters: Vec<(String, String)>,
}

impl DeploymentArgs {
    /// Load the template and collect its parameters, prompting for the
    /// administrator password if the template asks for one.
    pub fn plan(&self, profile: &WorkflowProfile) -> Result<DeploymentPlan> {
        let path = self
            .template_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(&profile.template_file));
        let template = Template::load(&path)?;
        let stack_name = self
            .stack_name
            .clone()
            .unwrap_or_else(|| profile.stack_name.clone());

        if template.parameters.is_none() {
            warn!(
                "Parameters of {} are unknown; {} and {} will not be supplied",
                path.display(),
                ADMIN_USERNAME,
                ADMIN_PASSWORD
            );
        }

        let mut parameters = Vec::new();
        if template.declares(ADMIN_USERNAME) {
            let username = self.admin_username.as_deref().ok_or_else(|| {
                VendError::Config(format!(
                    "{} declares {}; pass --admin-username",
                    path.display(),
                    ADMIN_USERNAME
                ))
            })?;
            parameters.push(StackParameter::new(ADMIN_USERNAME, username));
        }
        if template.declares(ADMIN_PASSWORD) {
            let password = read_password()?;
            parameters.push(StackParameter::secret(ADMIN_PASSWORD, password.as_str()));
        }
        parameters.extend(
            self.parameters
                .iter()
                .map(|(key, value)| StackParameter::new(key, value)),
        );
        debug!("Stack parameters: {:?}", parameters);

        let mut plan = DeploymentPlan::new(template, stack_name).parameters(parameters);
        if let Some(region) = &self.stack_region {
            plan = plan.region(region);
        }
        Ok(plan)
    }
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_parameter(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Administrator password from the environment, otherwise a masked prompt.
pub fn read_password() -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        if !value.is_empty() {
            debug!("Using administrator password from {}", PASSWORD_ENV);
            return Ok(Zeroizing::new(value));
        }
    }

    let term = Term::stderr();
    if !term.features().is_attended() {
        return Err(VendError::Config(format!(
            "no terminal to prompt for the administrator password; set {}",
            PASSWORD_ENV
        ))
        .into());
    }
    term.write_str("Admin password: ")?;
    let password = Zeroizing::new(
        term.read_secure_line()
            .context("Failed to read the administrator password")?,
    );
    if password.is_empty() {
        return Err(VendError::Config("the administrator password is empty".to_string()).into());
    }
    Ok(password)
}

/// Shared SDK configuration; the profile region is used when the
/// environment does not name one.
pub async fn load_aws_config(profile: &WorkflowProfile) -> SdkConfig {
    let region = RegionProviderChain::default_provider()
        .or_else(Region::new(profile.default_region.clone()));
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .load()
        .await;
    info!(
        "Using AWS region {}",
        config.region().map(|r| r.as_ref()).unwrap_or("unknown")
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn profile_args() -> ProfileArgs {
        ProfileArgs {
            preset: "account-vending".to_string(),
            profile_file: None,
            billing_access: None,
            max_attempts: None,
            poll_interval: None,
        }
    }

    #[test]
    fn test_parse_parameter() {
        assert_eq!(
            parse_parameter("Environment=dev").unwrap(),
            ("Environment".to_string(), "dev".to_string())
        );
        assert_eq!(
            parse_parameter("Query=a=b").unwrap(),
            ("Query".to_string(), "a=b".to_string())
        );
        assert!(parse_parameter("Environment").is_err());
        assert!(parse_parameter("=dev").is_err());
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let args = ProfileArgs {
            preset: "baseline-required".to_string(),
            billing_access: Some("allow".to_string()),
            max_attempts: Some(5),
            poll_interval: Some(1),
            ..profile_args()
        };

        let profile = args.resolve().unwrap();

        assert!(profile.deployment_required);
        assert_eq!(profile.billing_access, BillingAccess::Allow);
        assert_eq!(profile.retry.role_assumption.max_attempts, Some(5));
        assert_eq!(profile.retry.stack_events.interval_secs, 1);
    }

    #[test]
    fn test_resolve_rejects_unknown_preset() {
        let args = ProfileArgs {
            preset: "everything".to_string(),
            ..profile_args()
        };

        let err = args.resolve().unwrap_err();
        let vend = err.downcast_ref::<VendError>().unwrap();
        assert!(vend.is_config());
    }

    #[test]
    fn test_plan_uses_profile_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Parameters:\n  AdminUsername:\n    Type: String\nResources: {}\n")
            .unwrap();
        let args = DeploymentArgs {
            template_file: Some(file.path().to_path_buf()),
            stack_name: None,
            stack_region: None,
            admin_username: Some("admin".to_string()),
            parameters: vec![("Environment".to_string(), "dev".to_string())],
        };

        let plan = args.plan(&WorkflowProfile::account_vending()).unwrap();

        assert_eq!(plan.stack_name, "Baseline");
        assert!(plan.region.is_none());
        let keys: Vec<&str> = plan.parameters.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["AdminUsername", "Environment"]);
    }

    #[test]
    fn test_plan_with_unparsable_template_skips_admin_parameters() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Resources: [AdminUser\n  - {\n").unwrap();
        let args = DeploymentArgs {
            template_file: Some(file.path().to_path_buf()),
            stack_name: None,
            stack_region: None,
            admin_username: None,
            parameters: Vec::new(),
        };

        let plan = args.plan(&WorkflowProfile::account_vending()).unwrap();

        assert!(plan.template.parameters.is_none());
        assert!(plan.parameters.is_empty());
    }

    #[test]
    fn test_plan_requires_admin_username() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Parameters:\n  AdminUsername:\n    Type: String\nResources: {}\n")
            .unwrap();
        let args = DeploymentArgs {
            template_file: Some(file.path().to_path_buf()),
            stack_name: Some("Guardrails".to_string()),
            stack_region: Some("eu-west-1".to_string()),
            admin_username: None,
            parameters: Vec::new(),
        };

        let err = args.plan(&WorkflowProfile::account_vending()).unwrap_err();
        assert!(err.downcast_ref::<VendError>().unwrap().is_config());
    }
}
