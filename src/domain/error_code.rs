use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error taxonomy surfaced to the host, named `<STAGE>_<REASON>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // mount
    MountPointNotFound,
    ComponentCreationFailed,
    InitNoCountryCode,
    InitNoCountryCodeOnUpdate,

    // script
    SdkLoadError,
    SdkNotDefinedError,

    // instantiation
    InitNoKeyProvided,
    InitBadlyFormattedKey,
    InitInvalidKeyStructure,
    InitUnsupportedCountry,
    InitBtSdkFailure,
    InitializationError,

    // form construction
    CreateFormErrorCard,
    CreateFormErrorAch,
    InstanceNullCard,
    InstanceNullAch,

    // submission callbacks
    ValidationErrorFields,
    ValidationErrorGeneral,
    ApiError,
    ApiServerError,
    ApiClientError,
    ApiAuthError,
    GeneralPaymentError,
    UnknownPaymentMethodType,
    UnexpectedCallbackStructureSuccess,
    UnexpectedCallbackStructureError,

    // runtime guards
    FormNotReady,
    SubmitWhileInitError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MountPointNotFound => "MOUNT_POINT_NOT_FOUND",
            ErrorCode::ComponentCreationFailed => "COMPONENT_CREATION_FAILED",
            ErrorCode::InitNoCountryCode => "INIT_NO_COUNTRY_CODE",
            ErrorCode::InitNoCountryCodeOnUpdate => "INIT_NO_COUNTRY_CODE_ON_UPDATE",
            ErrorCode::SdkLoadError => "SDK_LOAD_ERROR",
            ErrorCode::SdkNotDefinedError => "SDK_NOT_DEFINED_ERROR",
            ErrorCode::InitNoKeyProvided => "INIT_NO_KEY_PROVIDED",
            ErrorCode::InitBadlyFormattedKey => "INIT_BADLY_FORMATTED_KEY",
            ErrorCode::InitInvalidKeyStructure => "INIT_INVALID_KEY_STRUCTURE",
            ErrorCode::InitUnsupportedCountry => "INIT_UNSUPPORTED_COUNTRY",
            ErrorCode::InitBtSdkFailure => "INIT_BT_SDK_FAILURE",
            ErrorCode::InitializationError => "INITIALIZATION_ERROR",
            ErrorCode::CreateFormErrorCard => "CREATE_FORM_ERROR_CARD",
            ErrorCode::CreateFormErrorAch => "CREATE_FORM_ERROR_ACH",
            ErrorCode::InstanceNullCard => "INSTANCE_NULL_CARD",
            ErrorCode::InstanceNullAch => "INSTANCE_NULL_ACH",
            ErrorCode::ValidationErrorFields => "VALIDATION_ERROR_FIELDS",
            ErrorCode::ValidationErrorGeneral => "VALIDATION_ERROR_GENERAL",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::ApiServerError => "API_SERVER_ERROR",
            ErrorCode::ApiClientError => "API_CLIENT_ERROR",
            ErrorCode::ApiAuthError => "API_AUTH_ERROR",
            ErrorCode::GeneralPaymentError => "GENERAL_PAYMENT_ERROR",
            ErrorCode::UnknownPaymentMethodType => "UNKNOWN_PAYMENT_METHOD_TYPE",
            ErrorCode::UnexpectedCallbackStructureSuccess => {
                "UNEXPECTED_CALLBACK_STRUCTURE_SUCCESS"
            }
            ErrorCode::UnexpectedCallbackStructureError => "UNEXPECTED_CALLBACK_STRUCTURE_ERROR",
            ErrorCode::FormNotReady => "FORM_NOT_READY",
            ErrorCode::SubmitWhileInitError => "SUBMIT_WHILE_INIT_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
