use crate::domain::error_code::ErrorCode;
use crate::domain::ports::{SdkSessionHandle, SharedSdk};
use crate::domain::types::{Country, Theme};
use crate::error::{DropinError, Result};

/// Known SDK failure phrases, checked in order against the lowercased message.
const KNOWN_FAILURES: &[(&str, ErrorCode)] = &[
    ("no key provided", ErrorCode::InitNoKeyProvided),
    ("key is required", ErrorCode::InitNoKeyProvided),
    ("missing key", ErrorCode::InitNoKeyProvided),
    ("badly formatted", ErrorCode::InitBadlyFormattedKey),
    ("malformed key", ErrorCode::InitBadlyFormattedKey),
    ("invalid key structure", ErrorCode::InitInvalidKeyStructure),
    ("key structure is invalid", ErrorCode::InitInvalidKeyStructure),
    ("unsupported country", ErrorCode::InitUnsupportedCountry),
    ("country not supported", ErrorCode::InitUnsupportedCountry),
    ("braintree", ErrorCode::InitBtSdkFailure),
    ("bt sdk", ErrorCode::InitBtSdkFailure),
];

/// Maps raw SDK initialization text onto the error taxonomy.
pub fn classify_initialization_error(message: &str) -> ErrorCode {
    let message = message.to_lowercase();
    KNOWN_FAILURES
        .iter()
        .find(|(phrase, _)| message.contains(phrase))
        .map(|(_, code)| *code)
        .unwrap_or(ErrorCode::InitializationError)
}

/// Creates SDK sessions from a credential token.
pub struct SdkInitializer {
    sdk: SharedSdk,
}

impl SdkInitializer {
    pub fn new(sdk: SharedSdk) -> Self {
        Self { sdk }
    }

    pub async fn instantiate(
        &self,
        token: &str,
        country: Country,
        theme: Option<&Theme>,
    ) -> Result<SdkSessionHandle> {
        if !self.sdk.is_defined() {
            return Err(DropinError::SdkNotDefined);
        }

        if token.trim().is_empty() {
            return Err(DropinError::Initialization {
                code: ErrorCode::InitNoKeyProvided,
                message: "No key provided".to_string(),
            });
        }

        let theme = Theme::resolve(theme);
        tracing::debug!(%country, themed = !theme.0.is_empty(), "instantiating SDK session");

        self.sdk
            .instantiate(token, country, &theme)
            .await
            .map_err(|failure| {
                let code = classify_initialization_error(&failure.0);
                tracing::error!(%code, reason = %failure, "SDK initialization failed");
                DropinError::Initialization {
                    code,
                    message: failure.0,
                }
            })
    }
}
