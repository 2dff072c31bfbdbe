use crate::domain::error_code::ErrorCode;
use crate::domain::payload::ErrorPayload;
use crate::domain::types::PaymentMethodType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropinError {
    #[error("Script load error: '{id}' from {url}: {reason}")]
    ScriptLoad {
        url: String,
        id: String,
        reason: String,
    },
    #[error("SDK entry point is not defined after script load")]
    SdkNotDefined,
    #[error("Initialization error ({code}): {message}")]
    Initialization { code: ErrorCode, message: String },
    #[error("Form construction error ({payment_method_type}): {message}")]
    FormConstruction {
        payment_method_type: PaymentMethodType,
        message: String,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DropinError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DropinError::ScriptLoad { .. } => ErrorCode::SdkLoadError,
            DropinError::SdkNotDefined => ErrorCode::SdkNotDefinedError,
            DropinError::Initialization { code, .. } => *code,
            DropinError::FormConstruction {
                payment_method_type,
                ..
            } => match payment_method_type {
                PaymentMethodType::Card => ErrorCode::CreateFormErrorCard,
                PaymentMethodType::BankAccount => ErrorCode::CreateFormErrorAch,
            },
            DropinError::Config(_) | DropinError::Json(_) | DropinError::Io(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Host-facing form of this error.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.code(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DropinError>;
