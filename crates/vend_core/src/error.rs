//! Error types for the vend crates.

use thiserror::Error;

/// Result type alias for vend operations.
pub type VendResult<T> = Result<T, VendError>;

/// Errors that can occur while provisioning an account.
///
/// Provider payloads are carried verbatim so the operator sees exactly what
/// the remote service reported.
#[derive(Error, Debug)]
pub enum VendError {
    #[error("{operation} failed: {message}")]
    Provider { operation: String, message: String },

    #[error("Organization creation failed: {0}")]
    OrganizationDisabled(String),

    #[error("Account creation failed for {account_name}: {reason}")]
    AccountCreationFailed { account_name: String, reason: String },

    #[error("Stack {stack_name} failed with {status}: {reason}")]
    StackRolledBack {
        stack_name: String,
        status: String,
        reason: String,
    },

    #[error("Stack {0} already exists")]
    StackAlreadyExists(String),

    #[error("{operation} gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Provider response missing {0}")]
    MissingField(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VendError {
    /// Build a provider error from any displayable SDK error.
    pub fn provider(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Terminal provisioning failures reported by the remote services.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VendError::OrganizationDisabled(_)
                | VendError::AccountCreationFailed { .. }
                | VendError::StackRolledBack { .. }
        )
    }

    /// Transient provider errors worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VendError::Provider { .. })
    }

    /// Errors caused by operator input rather than the providers.
    pub fn is_config(&self) -> bool {
        matches!(self, VendError::Config(_) | VendError::Template(_))
    }
}
