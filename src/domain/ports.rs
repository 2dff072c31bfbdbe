use super::fields::FieldSelectorMap;
use super::payload::{ErrorPayload, FieldValidationEvent, SubmitPayload};
use super::types::{Country, Theme};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Raw failure text reported by the hosted-fields SDK.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SdkFailure(pub String);

impl SdkFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The page's script registry.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Whether an element tagged `id` is already in the document.
    fn has_script(&self, id: &str) -> bool;

    /// Injects one loader element tagged `id` and resolves on its load signal.
    async fn inject_script(&self, url: &str, id: &str) -> Result<(), String>;
}

pub type SharedScriptHost = Arc<dyn ScriptHost>;

/// Callbacks the SDK invokes out-of-band after form construction.
#[derive(Clone)]
pub struct SdkCallbacks {
    pub on_success: Arc<dyn Fn(Value) + Send + Sync>,
    pub on_error: Arc<dyn Fn(Value) + Send + Sync>,
    pub on_field_validation: Arc<dyn Fn(FieldValidationEvent) + Send + Sync>,
}

impl fmt::Debug for SdkCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkCallbacks").finish_non_exhaustive()
    }
}

/// Entry point of the hosted-fields SDK, available once its script loaded.
#[async_trait]
pub trait HostedFieldsSdk: Send + Sync {
    /// Whether the SDK's global entry point is defined.
    fn is_defined(&self) -> bool {
        true
    }

    async fn instantiate(
        &self,
        token: &str,
        country: Country,
        theme: &Theme,
    ) -> Result<SdkSessionHandle, SdkFailure>;
}

pub type SharedSdk = Arc<dyn HostedFieldsSdk>;

/// One SDK instance, owned by a single initialization cycle.
pub trait SdkSession: Send + Sync {
    fn create_card_form(
        &self,
        fields: &FieldSelectorMap,
        submit_target_id: &str,
        callbacks: SdkCallbacks,
    ) -> Result<(), SdkFailure>;

    fn create_bank_account_form(
        &self,
        fields: &FieldSelectorMap,
        submit_target_id: &str,
        callbacks: SdkCallbacks,
    ) -> Result<(), SdkFailure>;

    /// Starts tokenization; the outcome arrives through the form callbacks.
    fn submit(&self) -> Result<(), SdkFailure>;
}

pub type SdkSessionHandle = Arc<dyn SdkSession>;

/// Receiver of the normalized events raised to the embedding application.
pub trait EventSink: Send + Sync {
    fn on_success(&self, payload: SubmitPayload);
    fn on_error(&self, payload: ErrorPayload);
    fn on_field_validation(&self, event: FieldValidationEvent);
}

pub type SharedEventSink = Arc<dyn EventSink>;

/// The host document the facade mounts into.
pub trait MountHost: Send + Sync {
    fn resolve(&self, target: &str) -> bool;
    fn attach(&self, target: &str) -> Result<(), String>;
    fn remove(&self, target: &str);
}

pub type SharedMountHost = Arc<dyn MountHost>;
