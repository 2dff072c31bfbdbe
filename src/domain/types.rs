use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Country schemes supported by the hosted-fields SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "CA")]
    Ca,
}

impl Country {
    pub fn code(&self) -> &'static str {
        match self {
            Country::Us => "US",
            Country::Ca => "CA",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported country code '{0}'")]
pub struct UnsupportedCountry(pub String);

impl FromStr for Country {
    type Err = UnsupportedCountry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(Country::Us),
            "CA" => Ok(Country::Ca),
            _ => Err(UnsupportedCountry(s.to_string())),
        }
    }
}

/// Selects the field set and the form construction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    #[default]
    Card,
    BankAccount,
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethodType::Card => f.write_str("CARD"),
            PaymentMethodType::BankAccount => f.write_str("BANK_ACCOUNT"),
        }
    }
}

/// Lifecycle states of one mounted instance.
///
/// `Ready` and `Failed` are terminal for a cycle, but a credential change
/// re-enters the pipeline at `LoadingScript`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InitializationState {
    Idle,
    LoadingScript,
    Instantiating,
    BuildingForm,
    Ready,
    Failed,
}

impl InitializationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InitializationState::Ready | InitializationState::Failed)
    }
}

/// Credential pair driving one initialization cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub country: Country,
}

impl Credentials {
    pub fn new(token: impl Into<String>, country: Country) -> Self {
        Self {
            token: token.into(),
            country,
        }
    }
}

/// Opaque theme object handed to the SDK untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(pub Map<String, Value>);

impl Theme {
    /// Returns the theme to hand to the SDK: the provided one when it has
    /// entries, otherwise an empty object so the SDK applies its defaults.
    pub fn resolve(theme: Option<&Theme>) -> Theme {
        match theme {
            Some(t) if !t.0.is_empty() => t.clone(),
            _ => Theme::default(),
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_parsing() {
        assert_eq!("US".parse::<Country>(), Ok(Country::Us));
        assert_eq!(" ca ".parse::<Country>(), Ok(Country::Ca));
        assert!("MX".parse::<Country>().is_err());
    }

    #[test]
    fn test_unsupported_country_error_message() {
        let err: Box<dyn std::error::Error> = Box::new("MX".parse::<Country>().unwrap_err());
        assert_eq!(err.to_string(), "unsupported country code 'MX'");
    }

    #[test]
    fn test_terminal_states() {
        assert!(InitializationState::Ready.is_terminal());
        assert!(InitializationState::Failed.is_terminal());
        assert!(!InitializationState::Idle.is_terminal());
        assert!(!InitializationState::BuildingForm.is_terminal());
    }

    #[test]
    fn test_payment_method_type_wire_names() {
        let card: PaymentMethodType = serde_json::from_value(json!("CARD")).unwrap();
        let bank: PaymentMethodType = serde_json::from_value(json!("BANK_ACCOUNT")).unwrap();
        assert_eq!(card, PaymentMethodType::Card);
        assert_eq!(bank, PaymentMethodType::BankAccount);
    }

    #[test]
    fn test_theme_falls_back_to_empty_object() {
        assert_eq!(Theme::resolve(None).as_value(), json!({}));

        let empty = Theme::default();
        assert_eq!(Theme::resolve(Some(&empty)).as_value(), json!({}));

        let custom: Theme = serde_json::from_value(json!({"input": {"color": "#333"}})).unwrap();
        assert_eq!(
            Theme::resolve(Some(&custom)).as_value(),
            json!({"input": {"color": "#333"}})
        );
    }
}
