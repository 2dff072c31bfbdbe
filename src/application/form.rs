use super::normalizer::{parse_error, parse_success};
use crate::domain::fields::FieldSelectorMap;
use crate::domain::payload::{ErrorPayload, FieldValidationEvent, SubmitPayload};
use crate::domain::ports::{SdkCallbacks, SdkSessionHandle};
use crate::domain::types::PaymentMethodType;
use crate::error::{DropinError, Result};
use std::sync::Arc;

pub type SubmitOutcome = std::result::Result<SubmitPayload, ErrorPayload>;
pub type ResultCallback = Arc<dyn Fn(SubmitOutcome) + Send + Sync>;
pub type ValidationCallback = Arc<dyn Fn(FieldValidationEvent) + Send + Sync>;

/// Asks the SDK session to materialize the form for `payment_method_type`.
///
/// Both SDK callbacks are routed through the normalizer before reaching
/// `on_result`; field validation events are forwarded untouched.
pub fn build(
    session: &SdkSessionHandle,
    payment_method_type: PaymentMethodType,
    fields: &FieldSelectorMap,
    submit_target_id: &str,
    on_result: ResultCallback,
    on_field_validation: ValidationCallback,
) -> Result<()> {
    let success_sink = on_result.clone();
    let error_sink = on_result;

    let callbacks = SdkCallbacks {
        on_success: Arc::new(move |raw| success_sink(parse_success(&raw))),
        on_error: Arc::new(move |raw| error_sink(Err(parse_error(&raw)))),
        on_field_validation: Arc::new(move |event| on_field_validation(event)),
    };

    tracing::debug!(
        %payment_method_type,
        fields = fields.len(),
        submit_target_id,
        "constructing hosted form"
    );

    let created = match payment_method_type {
        PaymentMethodType::Card => session.create_card_form(fields, submit_target_id, callbacks),
        PaymentMethodType::BankAccount => {
            session.create_bank_account_form(fields, submit_target_id, callbacks)
        }
    };

    created.map_err(|failure| DropinError::FormConstruction {
        payment_method_type,
        message: failure.0,
    })
}
