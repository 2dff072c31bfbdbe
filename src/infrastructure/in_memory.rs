use crate::domain::fields::FieldSelectorMap;
use crate::domain::payload::{DropinEvent, ErrorPayload, FieldValidationEvent, SubmitPayload};
use crate::domain::error_code::ErrorCode;
use crate::domain::ports::{
    EventSink, HostedFieldsSdk, MountHost, ScriptHost, SdkCallbacks, SdkFailure, SdkSession,
    SdkSessionHandle,
};
use crate::domain::types::{Country, Theme};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct ScriptRegistry {
    present: HashSet<String>,
    attempts: HashMap<String, usize>,
    failing_urls: HashSet<String>,
}

/// A page script registry kept in memory.
///
/// Counts every injection attempt per id, so tests can assert that a script
/// was requested exactly once.
#[derive(Default)]
pub struct InMemoryScriptHost {
    registry: Mutex<ScriptRegistry>,
    load_delay: Duration,
}

impl InMemoryScriptHost {
    /// Creates an empty host whose scripts load instantly.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load_delay_ms(mut self, ms: u64) -> Self {
        self.load_delay = Duration::from_millis(ms);
        self
    }

    /// Makes every load of `url` fail until [`recover`](Self::recover) is called.
    pub fn failing(self, url: &str) -> Self {
        lock(&self.registry).failing_urls.insert(url.to_string());
        self
    }

    pub fn recover(&self, url: &str) {
        lock(&self.registry).failing_urls.remove(url);
    }

    /// Marks `id` as already present in the document.
    pub fn preload(&self, id: &str) {
        lock(&self.registry).present.insert(id.to_string());
    }

    pub fn injection_count(&self, id: &str) -> usize {
        lock(&self.registry).attempts.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ScriptHost for InMemoryScriptHost {
    fn has_script(&self, id: &str) -> bool {
        lock(&self.registry).present.contains(id)
    }

    async fn inject_script(&self, url: &str, id: &str) -> Result<(), String> {
        *lock(&self.registry).attempts.entry(id.to_string()).or_default() += 1;

        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let mut registry = lock(&self.registry);
        if registry.failing_urls.contains(url) {
            return Err(format!("network error while loading {url}"));
        }
        registry.present.insert(id.to_string());
        Ok(())
    }
}

/// What the simulated SDK does when a form is submitted.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    Success(Value),
    Error(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Card,
    BankAccount,
}

/// A form materialized by a [`SimulatedSession`].
#[derive(Debug, Clone)]
pub struct BuiltForm {
    pub kind: FormKind,
    pub fields: FieldSelectorMap,
    pub submit_target_id: String,
}

#[derive(Default)]
struct SessionState {
    form: Option<BuiltForm>,
    callbacks: Option<SdkCallbacks>,
    submits: usize,
}

/// SDK session double that records the form it built and replays scripted
/// results through the registered callbacks.
#[derive(Default)]
pub struct SimulatedSession {
    state: Mutex<SessionState>,
    form_failure: Option<String>,
    response: Option<ScriptedResponse>,
}

impl SimulatedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_form(mut self, message: &str) -> Self {
        self.form_failure = Some(message.to_string());
        self
    }

    pub fn responding_with(mut self, response: ScriptedResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn form(&self) -> Option<BuiltForm> {
        lock(&self.state).form.clone()
    }

    pub fn submit_count(&self) -> usize {
        lock(&self.state).submits
    }

    fn callbacks(&self) -> Option<SdkCallbacks> {
        lock(&self.state).callbacks.clone()
    }

    pub fn emit_success(&self, raw: Value) {
        if let Some(callbacks) = self.callbacks() {
            (callbacks.on_success)(raw);
        }
    }

    pub fn emit_error(&self, raw: Value) {
        if let Some(callbacks) = self.callbacks() {
            (callbacks.on_error)(raw);
        }
    }

    pub fn emit_validation(&self, event: FieldValidationEvent) {
        if let Some(callbacks) = self.callbacks() {
            (callbacks.on_field_validation)(event);
        }
    }

    fn create_form(
        &self,
        kind: FormKind,
        fields: &FieldSelectorMap,
        submit_target_id: &str,
        callbacks: SdkCallbacks,
    ) -> Result<(), SdkFailure> {
        if let Some(message) = &self.form_failure {
            return Err(SdkFailure::new(message.clone()));
        }
        let mut state = lock(&self.state);
        state.form = Some(BuiltForm {
            kind,
            fields: fields.clone(),
            submit_target_id: submit_target_id.to_string(),
        });
        state.callbacks = Some(callbacks);
        Ok(())
    }
}

impl SdkSession for SimulatedSession {
    fn create_card_form(
        &self,
        fields: &FieldSelectorMap,
        submit_target_id: &str,
        callbacks: SdkCallbacks,
    ) -> Result<(), SdkFailure> {
        self.create_form(FormKind::Card, fields, submit_target_id, callbacks)
    }

    fn create_bank_account_form(
        &self,
        fields: &FieldSelectorMap,
        submit_target_id: &str,
        callbacks: SdkCallbacks,
    ) -> Result<(), SdkFailure> {
        self.create_form(FormKind::BankAccount, fields, submit_target_id, callbacks)
    }

    fn submit(&self) -> Result<(), SdkFailure> {
        {
            let mut state = lock(&self.state);
            if state.form.is_none() {
                return Err(SdkFailure::new("no form has been created"));
            }
            state.submits += 1;
        }

        match &self.response {
            Some(ScriptedResponse::Success(raw)) => self.emit_success(raw.clone()),
            Some(ScriptedResponse::Error(raw)) => self.emit_error(raw.clone()),
            None => {}
        }
        Ok(())
    }
}

#[derive(Default)]
struct SdkRecord {
    instantiations: usize,
    last_theme: Option<Value>,
    sessions: Vec<Arc<SimulatedSession>>,
}

/// Stand-in for the hosted-fields SDK.
///
/// Accepts tokens prefixed with `tok_` and rejects anything else the way the
/// real SDK reports a malformed key.
pub struct SimulatedSdk {
    defined: bool,
    instantiate_delay: Duration,
    instantiate_failure: Option<String>,
    form_failure: Option<String>,
    response: Option<ScriptedResponse>,
    record: Mutex<SdkRecord>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self {
            defined: true,
            instantiate_delay: Duration::ZERO,
            instantiate_failure: None,
            form_failure: None,
            response: None,
            record: Mutex::new(SdkRecord::default()),
        }
    }
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the script loading without defining the SDK global.
    pub fn undefined(mut self) -> Self {
        self.defined = false;
        self
    }

    pub fn with_instantiate_delay_ms(mut self, ms: u64) -> Self {
        self.instantiate_delay = Duration::from_millis(ms);
        self
    }

    pub fn failing_with(mut self, message: &str) -> Self {
        self.instantiate_failure = Some(message.to_string());
        self
    }

    pub fn failing_forms(mut self, message: &str) -> Self {
        self.form_failure = Some(message.to_string());
        self
    }

    pub fn responding_with(mut self, response: ScriptedResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn instantiation_count(&self) -> usize {
        lock(&self.record).instantiations
    }

    pub fn last_theme(&self) -> Option<Value> {
        lock(&self.record).last_theme.clone()
    }

    pub fn last_session(&self) -> Option<Arc<SimulatedSession>> {
        lock(&self.record).sessions.last().cloned()
    }

    /// Every session created so far, in creation order.
    pub fn sessions(&self) -> Vec<Arc<SimulatedSession>> {
        lock(&self.record).sessions.clone()
    }

    pub fn sessions_with_forms(&self) -> usize {
        lock(&self.record)
            .sessions
            .iter()
            .filter(|s| s.form().is_some())
            .count()
    }
}

#[async_trait]
impl HostedFieldsSdk for SimulatedSdk {
    fn is_defined(&self) -> bool {
        self.defined
    }

    async fn instantiate(
        &self,
        token: &str,
        country: Country,
        theme: &Theme,
    ) -> Result<SdkSessionHandle, SdkFailure> {
        {
            let mut record = lock(&self.record);
            record.instantiations += 1;
            record.last_theme = Some(theme.as_value());
        }

        if !self.instantiate_delay.is_zero() {
            tokio::time::sleep(self.instantiate_delay).await;
        }

        if let Some(message) = &self.instantiate_failure {
            return Err(SdkFailure::new(message.clone()));
        }
        if !token.starts_with("tok_") {
            return Err(SdkFailure::new(format!(
                "Initialization failed: the key is badly formatted ({country})"
            )));
        }

        let mut session = SimulatedSession::new();
        if let Some(message) = &self.form_failure {
            session = session.failing_form(message);
        }
        if let Some(response) = &self.response {
            session = session.responding_with(response.clone());
        }

        let session = Arc::new(session);
        lock(&self.record).sessions.push(session.clone());
        Ok(session)
    }
}

/// Event sink that keeps everything it receives, in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DropinEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DropinEvent> {
        lock(&self.events).clone()
    }

    pub fn successes(&self) -> Vec<SubmitPayload> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DropinEvent::Success(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorPayload> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DropinEvent::Error(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors().into_iter().map(|e| e.code).collect()
    }

    pub fn validations(&self) -> Vec<FieldValidationEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DropinEvent::Validation(v) => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn on_success(&self, payload: SubmitPayload) {
        lock(&self.events).push(DropinEvent::Success(payload));
    }

    fn on_error(&self, payload: ErrorPayload) {
        lock(&self.events).push(DropinEvent::Error(payload));
    }

    fn on_field_validation(&self, event: FieldValidationEvent) {
        lock(&self.events).push(DropinEvent::Validation(event));
    }
}

#[derive(Default)]
struct Document {
    targets: HashSet<String>,
    attached: HashSet<String>,
}

/// Host document with a fixed set of resolvable mount targets.
#[derive(Default)]
pub struct InMemoryMountHost {
    document: Mutex<Document>,
    attach_failure: Option<String>,
}

impl InMemoryMountHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(self, target: &str) -> Self {
        lock(&self.document).targets.insert(target.to_string());
        self
    }

    pub fn failing_attach(mut self, message: &str) -> Self {
        self.attach_failure = Some(message.to_string());
        self
    }

    pub fn is_attached(&self, target: &str) -> bool {
        lock(&self.document).attached.contains(target)
    }
}

impl MountHost for InMemoryMountHost {
    fn resolve(&self, target: &str) -> bool {
        lock(&self.document).targets.contains(target)
    }

    fn attach(&self, target: &str) -> Result<(), String> {
        if let Some(message) = &self.attach_failure {
            return Err(message.clone());
        }
        lock(&self.document).attached.insert(target.to_string());
        Ok(())
    }

    fn remove(&self, target: &str) {
        lock(&self.document).attached.remove(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_script_host_records_attempts() {
        let host = InMemoryScriptHost::new();
        assert!(!host.has_script("sdk"));

        host.inject_script("https://cdn/sdk.js", "sdk").await.unwrap();
        assert!(host.has_script("sdk"));
        assert_eq!(host.injection_count("sdk"), 1);
    }

    #[tokio::test]
    async fn test_simulated_sdk_rejects_malformed_tokens() {
        let sdk = SimulatedSdk::new();
        let result = sdk.instantiate("pk_123", Country::Us, &Theme::default()).await;
        assert!(result.is_err());
        assert!(sdk.last_session().is_none());
    }

    #[tokio::test]
    async fn test_scripted_response_is_replayed_on_submit() {
        let session = SimulatedSession::new()
            .responding_with(ScriptedResponse::Error(json!({"message": "nope"})));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        session
            .create_card_form(
                &FieldSelectorMap::default(),
                "pay",
                SdkCallbacks {
                    on_success: Arc::new(|_| {}),
                    on_error: Arc::new(move |raw| sink.lock().unwrap().push(raw)),
                    on_field_validation: Arc::new(|_| {}),
                },
            )
            .unwrap();

        session.submit().unwrap();
        assert_eq!(session.submit_count(), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!({"message": "nope"})]);
    }

    #[test]
    fn test_submit_without_form_fails() {
        let session = SimulatedSession::new();
        assert!(session.submit().is_err());
    }

    #[test]
    fn test_mount_host_attach_and_remove() {
        let host = InMemoryMountHost::new().with_target("#checkout");
        assert!(host.resolve("#checkout"));
        assert!(!host.resolve("#missing"));

        host.attach("#checkout").unwrap();
        assert!(host.is_attached("#checkout"));
        host.remove("#checkout");
        assert!(!host.is_attached("#checkout"));
    }
}
