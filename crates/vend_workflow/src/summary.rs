//! Final report of a provisioning run.

use serde::Serialize;

use vend_core::{Placement, StackDescription};

#[derive(Debug, Clone, Serialize)]
pub struct ProvisioningSummary {
    pub account_id: String,
    pub account_email: String,
    pub organization_id: Option<String>,
    pub root_id: Option<String>,
    pub unit_id: Option<String>,
    pub placement: Placement,
    pub policy_response: Option<String>,
    pub stack: Option<StackDescription>,
}

impl ProvisioningSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for ProvisioningSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Account: {} ({})", self.account_id, self.account_email)?;
        if let Some(unit_id) = &self.unit_id {
            writeln!(f, "Organizational unit: {} ({})", unit_id, self.placement)?;
        }
        match &self.stack {
            Some(stack) => {
                writeln!(f, "Stack: {} {}", stack.stack_name, stack.status)?;
                for output in &stack.outputs {
                    writeln!(f, "  {} = {}", output.key, output.value)?;
                }
                write!(
                    f,
                    "Resources deployed for account {} ({})",
                    self.account_id, self.account_email
                )
            }
            None => write!(
                f,
                "Only created account {} ({}), no stack deployed",
                self.account_id, self.account_email
            ),
        }
    }
}
