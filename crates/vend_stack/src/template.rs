//! Template loading.

use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::{info, warn};

use vend_core::{StackParameter, VendError, VendResult};

/// A template read from disk.
#[derive(Debug, Clone)]
pub struct Template {
    pub path: PathBuf,
    pub body: String,
    /// Parameter names declared by the template, if it could be parsed.
    pub parameters: Option<Vec<String>>,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> VendResult<Self> {
        let path = path.as_ref();
        info!("Reading resources from {}", path.display());
        let body = std::fs::read_to_string(path).map_err(|e| {
            VendError::Template(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_body(path, body)
    }

    pub fn from_body(path: impl Into<PathBuf>, body: String) -> VendResult<Self> {
        let path = path.into();
        if body.trim().is_empty() {
            return Err(VendError::Template(format!("{} is empty", path.display())));
        }
        let parameters = declared_parameters(&body);
        if parameters.is_none() {
            warn!(
                "Could not parse {}; its parameters are unknown and will not be checked",
                path.display()
            );
        }
        Ok(Self {
            path,
            body,
            parameters,
        })
    }

    pub fn declares(&self, name: &str) -> bool {
        self.parameters
            .as_ref()
            .map_or(false, |p| p.iter().any(|n| n == name))
    }

    /// Reject parameters the template does not declare.
    pub fn check_parameters(&self, supplied: &[StackParameter]) -> VendResult<()> {
        let Some(declared) = &self.parameters else {
            return Ok(());
        };
        let unknown: Vec<&str> = supplied
            .iter()
            .map(|p| p.key.as_str())
            .filter(|key| !declared.iter().any(|d| d == key))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(VendError::Template(format!(
                "{} does not declare parameters: {}",
                self.path.display(),
                unknown.join(", ")
            )))
        }
    }
}

/// Names under the top-level `Parameters` key. JSON templates parse as YAML.
fn declared_parameters(body: &str) -> Option<Vec<String>> {
    let doc: Value = serde_yaml::from_str(body).ok()?;
    let names = match doc.get("Parameters") {
        Some(Value::Mapping(params)) => params
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Some(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASELINE: &str = r#"
AWSTemplateFormatVersion: "2010-09-09"
Parameters:
  AdminUsername:
    Type: String
  AdminPassword:
    Type: String
    NoEcho: true
Resources:
  AdminUser:
    Type: AWS::IAM::User
    Properties:
      UserName: !Ref AdminUsername
      LoginProfile:
        Password: !Ref AdminPassword
"#;

    #[test]
    fn test_declared_parameters_yaml() {
        let template = Template::from_body("baseline.yml", BASELINE.to_string()).unwrap();
        assert_eq!(
            template.parameters,
            Some(vec!["AdminUsername".to_string(), "AdminPassword".to_string()])
        );
        assert!(template.declares("AdminPassword"));
        assert!(!template.declares("Environment"));
    }

    #[test]
    fn test_declared_parameters_json() {
        let body = r#"{"Parameters": {"Env": {"Type": "String"}}, "Resources": {}}"#;
        let template = Template::from_body("baseline.json", body.to_string()).unwrap();
        assert_eq!(template.parameters, Some(vec!["Env".to_string()]));
    }

    #[test]
    fn test_check_parameters_rejects_unknown() {
        let template = Template::from_body("baseline.yml", BASELINE.to_string()).unwrap();
        let ok = vec![
            StackParameter::new("AdminUsername", "admin"),
            StackParameter::secret("AdminPassword", "pw"),
        ];
        assert!(template.check_parameters(&ok).is_ok());

        let err = template
            .check_parameters(&[StackParameter::new("Environment", "dev")])
            .unwrap_err();
        assert!(err.to_string().contains("Environment"));
    }

    #[test]
    fn test_unparsable_template_has_unknown_parameters() {
        let template =
            Template::from_body("broken.yml", "Resources: [AdminUser\n  - {".to_string()).unwrap();

        assert_eq!(template.parameters, None);
        assert!(!template.declares("AdminPassword"));
        assert!(template
            .check_parameters(&[StackParameter::new("Environment", "dev")])
            .is_ok());
    }

    #[test]
    fn test_empty_template_rejected() {
        let err = Template::from_body("empty.yml", "  \n".to_string()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Template::load("/nonexistent/baseline.yml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/baseline.yml"));
    }
}
