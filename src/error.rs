use thiserror::Error;

use crate::domain::{ContractId, MeetingId};

/// Error surfaced by the `odds` binary: a message plus the process exit code.
///
/// Exit codes:
/// - 2: configuration or input problem
/// - 3: a meeting could not be resolved to a quoted contract
/// - 4: the report could not be assembled
/// - 5: the report could not be written
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Fatal errors raised by the calculation engine.
///
/// Low or unavailable data quality is not an error: it is reported in the
/// output and never blocks a run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("[{institution}] configuration error in `{field}`: {message}")]
    Configuration {
        institution: String,
        field: String,
        message: String,
    },

    #[error("[{institution}] no contract mapped for meeting {meeting}")]
    MappingMissing { institution: String, meeting: MeetingId },

    #[error("[{institution}] no quote for contract {contract} (mapped from meeting {meeting})")]
    QuoteMissing {
        institution: String,
        meeting: MeetingId,
        contract: ContractId,
    },

    #[error("[{institution}] cannot assemble report: {component}")]
    Assembly { institution: String, component: String },
}

impl EngineError {
    pub fn config(institution: &str, field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Configuration {
            institution: institution.to_string(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn assembly(institution: &str, component: impl Into<String>) -> Self {
        EngineError::Assembly {
            institution: institution.to_string(),
            component: component.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Configuration { .. } => 2,
            EngineError::MappingMissing { .. } | EngineError::QuoteMissing { .. } => 3,
            EngineError::Assembly { .. } => 4,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}
