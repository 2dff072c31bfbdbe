use super::error_code::ErrorCode;
use super::types::PaymentMethodType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Card-specific fields extracted from a successful tokenization.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<String>,
}

/// Bank-account-specific fields extracted from a successful tokenization.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transit_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PaymentDetails {
    Card(CardDetails),
    BankAccount(BankAccountDetails),
}

/// Normalized success payload.
///
/// Built only through [`SubmitPayload::card`] and
/// [`SubmitPayload::bank_account`], so `payment_method_type` always agrees
/// with the variant held in `details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPayload {
    payment_method_id: String,
    payment_method_type: PaymentMethodType,
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_information: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<PaymentDetails>,
}

impl SubmitPayload {
    pub fn card(
        payment_method_id: impl Into<String>,
        details: Option<CardDetails>,
        billing_information: Option<Value>,
    ) -> Self {
        Self {
            payment_method_id: payment_method_id.into(),
            payment_method_type: PaymentMethodType::Card,
            billing_information,
            details: details.map(PaymentDetails::Card),
        }
    }

    pub fn bank_account(
        payment_method_id: impl Into<String>,
        details: Option<BankAccountDetails>,
        billing_information: Option<Value>,
    ) -> Self {
        Self {
            payment_method_id: payment_method_id.into(),
            payment_method_type: PaymentMethodType::BankAccount,
            billing_information,
            details: details.map(PaymentDetails::BankAccount),
        }
    }

    pub fn payment_method_id(&self) -> &str {
        &self.payment_method_id
    }

    pub fn payment_method_type(&self) -> PaymentMethodType {
        self.payment_method_type
    }

    pub fn billing_information(&self) -> Option<&Value> {
        self.billing_information.as_ref()
    }

    pub fn details(&self) -> Option<&PaymentDetails> {
        self.details.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Normalized error payload delivered through the host's error event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<Value>,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_errors: None,
            http_status_code: None,
            raw_error: None,
        }
    }

    /// Attaches field errors; an empty list leaves the payload field-less.
    pub fn with_field_errors(mut self, field_errors: Vec<FieldError>) -> Self {
        self.field_errors = (!field_errors.is_empty()).then_some(field_errors);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status_code = Some(status);
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw_error = Some(raw);
        self
    }
}

/// Field-level validation notification, forwarded to the host as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidationEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub field_name: String,
    pub selector: String,
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Everything the core raises to the embedding application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "detail", rename_all = "lowercase")]
pub enum DropinEvent {
    Success(SubmitPayload),
    Error(ErrorPayload),
    Validation(FieldValidationEvent),
}
