//! Declarative billing-field configuration and the selector map handed to the SDK.
//!
//! [`build_fields`] is pure: malformed or missing configuration never fails,
//! it only omits optional fields or falls back to defaults.

use super::types::{Country, PaymentMethodType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Optional billing fields, enabled only when the host config marks them truthy.
pub const OPTIONAL_FIELDS: [&str; 8] = [
    "name",
    "addressLine1",
    "addressLine2",
    "city",
    "state",
    "country",
    "email",
    "phone",
];

struct FieldDefaults {
    name: &'static str,
    label: &'static str,
    placeholder: Option<&'static str>,
}

const fn defaults(
    name: &'static str,
    label: &'static str,
    placeholder: Option<&'static str>,
) -> FieldDefaults {
    FieldDefaults {
        name,
        label,
        placeholder,
    }
}

const DEFAULTS: &[FieldDefaults] = &[
    defaults("cardInformation", "Card Information", None),
    defaults("postalCode", "Postal Code", Some("Postal code")),
    defaults("accountNumber", "Account Number", Some("Account number")),
    defaults("accountHolderName", "Account Holder Name", Some("Full name")),
    defaults("bankAccountType", "Account Type", None),
    defaults("routingNumber", "Routing Number", Some("9 digits")),
    defaults("transitNumber", "Transit Number", Some("5 digits")),
    defaults("institutionNumber", "Institution Number", Some("3 digits")),
    defaults("name", "Name on Card", Some("Full name")),
    defaults("addressLine1", "Address Line 1", Some("Street address")),
    defaults("addressLine2", "Address Line 2", Some("Apartment, suite, etc.")),
    defaults("city", "City", Some("City")),
    defaults("state", "State / Province", None),
    defaults("country", "Country", None),
    defaults("email", "Email", Some("you@example.com")),
    defaults("phone", "Phone", Some("Phone number")),
];

fn defaults_for(name: &str) -> Option<&'static FieldDefaults> {
    DEFAULTS.iter().find(|d| d.name == name)
}

/// Host-provided customization for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldCustomization {
    pub label: Option<String>,
    pub placeholder: Option<String>,
}

/// How a single config entry was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSetting {
    Enabled,
    Customized(FieldCustomization),
}

/// Mapping from field name to `true` or `{label?, placeholder?}`.
///
/// Stored as raw JSON so that odd values degrade instead of failing
/// deserialization; truthiness follows the host page's rules (`false`,
/// `null`, `0`, `""` disable a field).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingFieldsConfig(Map<String, Value>);

impl BillingFieldsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, field: &str) -> Self {
        self.0.insert(field.to_string(), Value::Bool(true));
        self
    }

    pub fn customize(
        mut self,
        field: &str,
        label: Option<&str>,
        placeholder: Option<&str>,
    ) -> Self {
        let mut entry = Map::new();
        if let Some(label) = label {
            entry.insert("label".into(), Value::String(label.into()));
        }
        if let Some(placeholder) = placeholder {
            entry.insert("placeholder".into(), Value::String(placeholder.into()));
        }
        self.0.insert(field.to_string(), Value::Object(entry));
        self
    }

    /// Returns the setting for `field`, or `None` when absent or falsy.
    pub fn setting(&self, field: &str) -> Option<FieldSetting> {
        let value = self.0.get(field)?;
        if !is_truthy(value) {
            return None;
        }
        match value {
            Value::Object(entry) => Some(FieldSetting::Customized(FieldCustomization {
                label: non_empty_str(entry.get("label")),
                placeholder: non_empty_str(entry.get("placeholder")),
            })),
            _ => Some(FieldSetting::Enabled),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolved DOM target plus display strings for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSelector {
    pub selector: String,
    pub label: String,
    pub placeholder: String,
}

/// Field name to selector map, consumed once by form construction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldSelectorMap(BTreeMap<String, FieldSelector>);

impl FieldSelectorMap {
    pub fn get(&self, field: &str) -> Option<&FieldSelector> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, field: &str, selector: FieldSelector) {
        self.0.insert(field.to_string(), selector);
    }
}

/// Fields that are always present for the given method type and country.
pub fn structural_fields(
    payment_method_type: PaymentMethodType,
    country: Country,
) -> &'static [&'static str] {
    match (payment_method_type, country) {
        (PaymentMethodType::Card, _) => &["cardInformation", "postalCode"],
        (PaymentMethodType::BankAccount, Country::Us) => &[
            "accountNumber",
            "accountHolderName",
            "bankAccountType",
            "routingNumber",
        ],
        (PaymentMethodType::BankAccount, Country::Ca) => &[
            "accountNumber",
            "accountHolderName",
            "bankAccountType",
            "transitNumber",
            "institutionNumber",
        ],
    }
}

/// Builds the selector map the SDK expects for one form construction attempt.
pub fn build_fields(
    payment_method_type: PaymentMethodType,
    country: Country,
    config: &BillingFieldsConfig,
) -> FieldSelectorMap {
    let mut map = FieldSelectorMap::default();

    for field in structural_fields(payment_method_type, country) {
        let customization = match config.setting(field) {
            Some(FieldSetting::Customized(c)) => Some(c),
            _ => None,
        };
        map.insert(
            field,
            resolve(field, payment_method_type, customization.as_ref()),
        );
    }

    for field in OPTIONAL_FIELDS {
        match config.setting(field) {
            Some(FieldSetting::Enabled) => {
                map.insert(field, resolve(field, payment_method_type, None));
            }
            Some(FieldSetting::Customized(c)) => {
                map.insert(field, resolve(field, payment_method_type, Some(&c)));
            }
            None => {}
        }
    }

    for key in config.keys() {
        if !map.contains(key) && !OPTIONAL_FIELDS.contains(&key) {
            tracing::debug!(field = key, "ignoring unknown billing field");
        }
    }

    map
}

fn resolve(
    field: &str,
    payment_method_type: PaymentMethodType,
    customization: Option<&FieldCustomization>,
) -> FieldSelector {
    let defaults = defaults_for(field);

    let default_label = match (field, payment_method_type) {
        ("name", PaymentMethodType::BankAccount) => Some("Account Holder Name"),
        ("name", PaymentMethodType::Card) => Some("Name on Card"),
        _ => defaults.map(|d| d.label),
    };

    let label = customization
        .and_then(|c| c.label.clone())
        .or_else(|| default_label.map(str::to_string))
        .unwrap_or_else(|| field.to_string());

    let placeholder = customization
        .and_then(|c| c.placeholder.clone())
        .or_else(|| defaults.and_then(|d| d.placeholder).map(str::to_string))
        .unwrap_or_else(|| field.to_string());

    FieldSelector {
        selector: selector_for(field),
        label,
        placeholder,
    }
}

/// `postalCode` -> `#dropin-postal-code`
pub fn selector_for(field: &str) -> String {
    let mut selector = String::from("#dropin-");
    for (i, ch) in field.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                selector.push('-');
            }
            selector.push(ch.to_ascii_lowercase());
        } else {
            selector.push(ch);
        }
    }
    selector
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(map: &FieldSelectorMap) -> Vec<&str> {
        map.names().collect()
    }

    #[test]
    fn test_card_without_config_has_only_structural_fields() {
        let map = build_fields(PaymentMethodType::Card, Country::Us, &BillingFieldsConfig::new());
        assert_eq!(names(&map), vec!["cardInformation", "postalCode"]);
    }

    #[test]
    fn test_bank_account_country_specific_fields() {
        let config = BillingFieldsConfig::new();
        let us = build_fields(PaymentMethodType::BankAccount, Country::Us, &config);
        assert!(us.contains("routingNumber"));
        assert!(!us.contains("transitNumber"));
        assert!(!us.contains("institutionNumber"));
        assert_eq!(us.len(), 4);

        let ca = build_fields(PaymentMethodType::BankAccount, Country::Ca, &config);
        assert!(!ca.contains("routingNumber"));
        assert!(ca.contains("transitNumber"));
        assert!(ca.contains("institutionNumber"));
        assert_eq!(ca.len(), 5);
    }

    #[test]
    fn test_optional_fields_follow_truthiness() {
        let config: BillingFieldsConfig = serde_json::from_value(json!({
            "name": true,
            "email": {"label": "Work email"},
            "phone": false,
            "city": null,
            "state": 0,
            "country": "",
            "addressLine1": 1
        }))
        .unwrap();

        let map = build_fields(PaymentMethodType::Card, Country::Us, &config);
        assert_eq!(
            names(&map),
            vec!["addressLine1", "cardInformation", "email", "name", "postalCode"]
        );
    }

    #[test]
    fn test_unknown_keys_are_not_added() {
        let config = BillingFieldsConfig::new().enable("favouriteColour");
        let map = build_fields(PaymentMethodType::Card, Country::Ca, &config);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_label_resolution_order() {
        let config = BillingFieldsConfig::new()
            .customize("email", Some("Work email"), None)
            .customize("phone", None, Some("+1 555 0100"))
            .enable("city");

        let map = build_fields(PaymentMethodType::Card, Country::Us, &config);

        let email = map.get("email").unwrap();
        assert_eq!(email.label, "Work email");
        assert_eq!(email.placeholder, "you@example.com");

        let phone = map.get("phone").unwrap();
        assert_eq!(phone.label, "Phone");
        assert_eq!(phone.placeholder, "+1 555 0100");

        let city = map.get("city").unwrap();
        assert_eq!(city.label, "City");
        assert_eq!(city.selector, "#dropin-city");
    }

    #[test]
    fn test_raw_field_name_is_last_resort() {
        let config = BillingFieldsConfig::new().enable("country");
        let map = build_fields(PaymentMethodType::Card, Country::Us, &config);
        assert_eq!(map.get("country").unwrap().placeholder, "country");
    }

    #[test]
    fn test_name_label_depends_on_method_type() {
        let config = BillingFieldsConfig::new().enable("name");

        let card = build_fields(PaymentMethodType::Card, Country::Us, &config);
        assert_eq!(card.get("name").unwrap().label, "Name on Card");

        let bank = build_fields(PaymentMethodType::BankAccount, Country::Us, &config);
        assert_eq!(bank.get("name").unwrap().label, "Account Holder Name");

        let custom = BillingFieldsConfig::new().customize("name", Some("Cardholder"), None);
        let bank = build_fields(PaymentMethodType::BankAccount, Country::Us, &custom);
        assert_eq!(bank.get("name").unwrap().label, "Cardholder");
    }

    #[test]
    fn test_structural_fields_accept_customization() {
        let config = BillingFieldsConfig::new().customize("postalCode", Some("ZIP"), Some("12345"));
        let map = build_fields(PaymentMethodType::Card, Country::Us, &config);
        let postal = map.get("postalCode").unwrap();
        assert_eq!(postal.label, "ZIP");
        assert_eq!(postal.placeholder, "12345");
    }

    #[test]
    fn test_empty_customization_strings_fall_back_to_defaults() {
        let config: BillingFieldsConfig =
            serde_json::from_value(json!({"email": {"label": "", "placeholder": 5}})).unwrap();
        let map = build_fields(PaymentMethodType::Card, Country::Us, &config);
        let email = map.get("email").unwrap();
        assert_eq!(email.label, "Email");
        assert_eq!(email.placeholder, "you@example.com");
    }

    #[test]
    fn test_selector_for_camel_case() {
        assert_eq!(selector_for("postalCode"), "#dropin-postal-code");
        assert_eq!(selector_for("addressLine1"), "#dropin-address-line1");
        assert_eq!(selector_for("name"), "#dropin-name");
    }
}
