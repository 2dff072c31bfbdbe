use crate::application::orchestrator::{
    DEFAULT_SCRIPT_ID, DEFAULT_SCRIPT_URL, DEFAULT_SUBMIT_TARGET_ID, OrchestratorConfig,
};
use crate::domain::fields::BillingFieldsConfig;
use crate::domain::types::{PaymentMethodType, Theme};
use crate::error::{DropinError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::level_filters::LevelFilter;

/// Diagnostic verbosity. Has no effect on behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    None,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::None => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Options accepted when mounting a drop-in element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropinOptions {
    #[serde(default)]
    pub token: Option<String>,
    /// `US` or `CA`. Kept as text so that a missing or unknown value can be
    /// reported through the error event instead of failing to parse.
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub payment_method_type: PaymentMethodType,
    #[serde(default)]
    pub billing_fields_config: BillingFieldsConfig,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub log_level: LogLevel,
    #[serde(default = "default_submit_target_id")]
    pub submit_target_id: String,
    #[serde(default = "default_script_url")]
    pub script_url: String,
    #[serde(default = "default_script_id")]
    pub script_id: String,
}

fn default_submit_target_id() -> String {
    DEFAULT_SUBMIT_TARGET_ID.to_string()
}

fn default_script_url() -> String {
    DEFAULT_SCRIPT_URL.to_string()
}

fn default_script_id() -> String {
    DEFAULT_SCRIPT_ID.to_string()
}

impl Default for DropinOptions {
    fn default() -> Self {
        Self {
            token: None,
            country: None,
            payment_method_type: PaymentMethodType::default(),
            billing_fields_config: BillingFieldsConfig::default(),
            theme: None,
            log_level: LogLevel::default(),
            submit_target_id: default_submit_target_id(),
            script_url: default_script_url(),
            script_id: default_script_id(),
        }
    }
}

impl DropinOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Rejects blank script and submit identifiers. Credentials are checked
    /// later, when they are reported through the error event.
    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("submitTargetId", &self.submit_target_id),
            ("scriptUrl", &self.script_url),
            ("scriptId", &self.script_id),
        ] {
            if value.trim().is_empty() {
                return Err(DropinError::Config(format!("'{key}' must not be blank")));
            }
        }
        Ok(())
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            payment_method_type: self.payment_method_type,
            billing_fields: self.billing_fields_config.clone(),
            theme: self.theme.clone(),
            submit_target_id: self.submit_target_id.clone(),
            script_url: self.script_url.clone(),
            script_id: self.script_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_options_use_defaults() {
        let options =
            DropinOptions::from_json(r#"{"token": "tok_live_abc", "country": "US"}"#).unwrap();
        assert_eq!(options.payment_method_type, PaymentMethodType::Card);
        assert_eq!(options.log_level, LogLevel::Warn);
        assert_eq!(options.script_id, DEFAULT_SCRIPT_ID);
        assert_eq!(options.submit_target_id, DEFAULT_SUBMIT_TARGET_ID);
        assert!(options.theme.is_none());
    }

    #[test]
    fn test_full_options() {
        let options = DropinOptions::from_json(
            r##"{
                "token": "tok_live_abc",
                "country": "CA",
                "paymentMethodType": "BANK_ACCOUNT",
                "billingFieldsConfig": {"name": true, "email": {"label": "Email address"}},
                "theme": {"colorPrimary": "#0055ff"},
                "logLevel": "DEBUG"
            }"##,
        )
        .unwrap();

        assert_eq!(options.payment_method_type, PaymentMethodType::BankAccount);
        assert_eq!(options.log_level.level_filter(), LevelFilter::DEBUG);
        assert!(options.billing_fields_config.setting("email").is_some());
        assert_eq!(
            options.orchestrator_config().payment_method_type,
            PaymentMethodType::BankAccount
        );
    }

    #[test]
    fn test_log_level_none_disables_output() {
        assert_eq!(LogLevel::None.level_filter(), LevelFilter::OFF);
    }

    #[test]
    fn test_blank_script_id_is_rejected() {
        let err = DropinOptions::from_json(r#"{"scriptId": "  "}"#).unwrap_err();
        assert!(matches!(err, DropinError::Config(_)));
        assert!(err.to_string().contains("scriptId"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(DropinOptions::from_json("{not json").is_err());
    }
}
