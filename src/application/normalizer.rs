//! Normalizes the SDK's raw callback results into [`SubmitPayload`] and
//! [`ErrorPayload`].
//!
//! Two SDK protocol generations are in the wild: v1 reports errors through a
//! `message` that is a string, a list of strings or an object keyed by field,
//! and v2 reports a structured `errors` array. `parse_error` checks the shapes
//! in a fixed order so that neither generation regresses.

use crate::domain::error_code::ErrorCode;
use crate::domain::payload::{
    BankAccountDetails, CardDetails, ErrorPayload, FieldError, SubmitPayload,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static HTTP_STATUS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)status:?\s*(\d{3})\b").expect("static regex is valid")
});

/// Entry types that mark a field error as originating from the backend.
const BACKEND_ERROR_TYPES: [&str; 3] = ["API_ERROR", "BACKEND_ERROR", "SERVER_ERROR"];

pub const FALLBACK_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing the payment.";

/// Parses a raw success result.
///
/// Results whose instrument type is neither `CREDIT_CARD` nor `BANK_ACCOUNT`
/// are returned as `UNKNOWN_PAYMENT_METHOD_TYPE` errors, never as success.
pub fn parse_success(raw: &Value) -> Result<SubmitPayload, ErrorPayload> {
    let Some(root) = raw.as_object() else {
        return Err(ErrorPayload::new(
            ErrorCode::UnexpectedCallbackStructureSuccess,
            "Success callback received a non-object result.",
        )
        .with_raw(raw.clone()));
    };

    let method = root
        .get("paymentMethod")
        .and_then(Value::as_object)
        .unwrap_or(root);

    let method_type = str_field(method, &["type", "paymentMethodType"])
        .or_else(|| str_field(root, &["paymentMethodType"]));

    let id = str_field(method, &["id", "paymentMethodId"])
        .or_else(|| str_field(root, &["paymentMethodId"]));

    let billing = method
        .get("billingInformation")
        .or_else(|| root.get("billingInformation"))
        .filter(|v| !v.is_null())
        .cloned();

    match method_type.as_deref() {
        Some("CREDIT_CARD") => {
            let id = require_id(id, raw)?;
            let details = method.get("card").and_then(Value::as_object).map(card_details);
            Ok(SubmitPayload::card(id, details, billing))
        }
        Some("BANK_ACCOUNT") => {
            let id = require_id(id, raw)?;
            let details = method
                .get("bankAccount")
                .and_then(Value::as_object)
                .map(bank_account_details);
            Ok(SubmitPayload::bank_account(id, details, billing))
        }
        other => {
            let message = match other {
                Some(t) => format!("Unknown payment method type '{t}' in SDK result."),
                None => "SDK result did not specify a payment method type.".to_string(),
            };
            Err(
                ErrorPayload::new(ErrorCode::UnknownPaymentMethodType, message)
                    .with_raw(raw.clone()),
            )
        }
    }
}

fn require_id(id: Option<String>, raw: &Value) -> Result<String, ErrorPayload> {
    id.ok_or_else(|| {
        ErrorPayload::new(
            ErrorCode::UnexpectedCallbackStructureSuccess,
            "SDK result did not include a payment method id.",
        )
        .with_raw(raw.clone())
    })
}

fn card_details(card: &Map<String, Value>) -> CardDetails {
    CardDetails {
        brand: str_field(card, &["brand", "cardBrand"]),
        last4: str_field(card, &["maskedNumber", "maskedCardNumber", "last4"]).map(|m| last4(&m)),
        expiry_month: scalar_field(card, &["expiryMonth", "expirationMonth"]),
        expiry_year: scalar_field(card, &["expiryYear", "expirationYear"]),
    }
}

fn bank_account_details(account: &Map<String, Value>) -> BankAccountDetails {
    BankAccountDetails {
        account_type: str_field(account, &["accountType", "bankAccountType"]),
        last4: str_field(account, &["maskedAccountNumber", "accountNumber", "last4"])
            .map(|m| last4(&m)),
        routing_number: scalar_field(account, &["routingNumber"]),
        transit_number: scalar_field(account, &["transitNumber"]),
        institution_number: scalar_field(account, &["institutionNumber"]),
        country: str_field(account, &["country", "countryCode"]),
    }
}

/// Final four characters of a masked value, or the value itself when shorter.
pub fn last4(masked: &str) -> String {
    let count = masked.chars().count();
    if count >= 4 {
        masked.chars().skip(count - 4).collect()
    } else {
        masked.to_string()
    }
}

fn str_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| object.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Like `str_field`, but also accepts numbers (expiry months, routing numbers).
fn scalar_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match object.get(*k) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parses a raw error result. Total: every input maps to one payload.
pub fn parse_error(raw: &Value) -> ErrorPayload {
    let root = raw.as_object();

    if let Some(payload) = root
        .and_then(|r| r.get("errors"))
        .and_then(Value::as_array)
        .and_then(|entries| from_error_entries(entries))
    {
        return payload.with_raw(raw.clone());
    }

    let message = match root {
        Some(r) => r.get("message"),
        None => Some(raw),
    };

    let payload = match message {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(from_message_text(text)),
        Some(Value::Array(items)) => from_message_list(items),
        Some(Value::Object(fields)) => from_message_object(fields),
        _ => None,
    };

    payload
        .unwrap_or_else(|| {
            tracing::warn!("unrecognized SDK error structure");
            ErrorPayload::new(ErrorCode::UnexpectedCallbackStructureError, FALLBACK_ERROR_MESSAGE)
        })
        .with_raw(raw.clone())
}

fn from_error_entries(entries: &[Value]) -> Option<ErrorPayload> {
    let mut field_errors = Vec::new();
    let mut backend = false;

    for entry in entries.iter().filter_map(Value::as_object) {
        let Some(field) = str_field(entry, &["fieldName", "field"]) else {
            continue;
        };
        let message = str_field(entry, &["message", "errorCode"])
            .unwrap_or_else(|| "Invalid value".to_string());
        if entry
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| BACKEND_ERROR_TYPES.contains(&t))
        {
            backend = true;
        }
        field_errors.push(FieldError::new(field, message));
    }

    if field_errors.is_empty() {
        return None;
    }

    let (code, message) = match (backend, field_errors.as_slice()) {
        (false, [single]) => (
            ErrorCode::ValidationErrorFields,
            format!("Validation failed for field '{}': {}", single.field, single.message),
        ),
        (true, [single]) => (
            ErrorCode::ApiError,
            format!("Payment service rejected field '{}': {}", single.field, single.message),
        ),
        (false, many) => (
            ErrorCode::ValidationErrorFields,
            format!("Validation failed for {} fields.", many.len()),
        ),
        (true, _) => (
            ErrorCode::ApiError,
            "The payment service rejected the request.".to_string(),
        ),
    };

    Some(ErrorPayload::new(code, message).with_field_errors(field_errors))
}

/// Extracts an HTTP status embedded as `Status: NNN` in free text.
pub fn extract_http_status(text: &str) -> Option<u16> {
    HTTP_STATUS
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn from_message_text(text: &str) -> ErrorPayload {
    let Some(status) = extract_http_status(text) else {
        return ErrorPayload::new(ErrorCode::GeneralPaymentError, text);
    };

    let code = match status {
        500.. => ErrorCode::ApiServerError,
        401 => ErrorCode::ApiAuthError,
        400..=499 => ErrorCode::ApiClientError,
        _ => ErrorCode::GeneralPaymentError,
    };

    ErrorPayload::new(code, text).with_http_status(status)
}

fn from_message_list(items: &[Value]) -> Option<ErrorPayload> {
    let messages: Vec<&str> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .collect();

    if messages.is_empty() {
        return None;
    }

    Some(ErrorPayload::new(
        ErrorCode::ValidationErrorGeneral,
        messages.join("; "),
    ))
}

fn from_message_object(fields: &Map<String, Value>) -> Option<ErrorPayload> {
    let entries: Vec<(&String, String)> = fields
        .iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) if !s.is_empty() => Some((k, s.clone())),
            Value::Null => None,
            Value::String(_) => None,
            other => Some((k, other.to_string())),
        })
        .collect();

    match entries.as_slice() {
        [] => None,
        [(key, message)] if !key.is_empty() && key.chars().all(|c| c.is_ascii_digit()) => Some(
            ErrorPayload::new(ErrorCode::ValidationErrorGeneral, message.clone()),
        ),
        [(field, message)] => Some(
            ErrorPayload::new(
                ErrorCode::ValidationErrorFields,
                format!("Validation failed for field '{field}': {message}"),
            )
            .with_field_errors(vec![FieldError::new(field.as_str(), message.as_str())]),
        ),
        many => {
            let names: Vec<&str> = many.iter().map(|(k, _)| k.as_str()).collect();
            Some(
                ErrorPayload::new(
                    ErrorCode::ValidationErrorFields,
                    format!("Validation failed for fields: {}", names.join(", ")),
                )
                .with_field_errors(
                    many.iter()
                        .map(|(k, m)| FieldError::new(k.as_str(), m.as_str()))
                        .collect(),
                ),
            )
        }
    }
}
