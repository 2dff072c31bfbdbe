//! Host-facing facade: mounts the payment form into the page and relays the
//! core's events to the host's callback functions.

use crate::application::orchestrator::{Orchestrator, SubmitStatus};
use crate::application::script_loader::ScriptLoader;
use crate::config::DropinOptions;
use crate::domain::error_code::ErrorCode;
use crate::domain::payload::{ErrorPayload, FieldValidationEvent, SubmitPayload};
use crate::domain::ports::{EventSink, SharedMountHost, SharedSdk};
use crate::domain::types::InitializationState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// Callback functions supplied by the embedding application.
#[derive(Default)]
pub struct HostCallbacks {
    pub on_success: Option<Callback<SubmitPayload>>,
    pub on_error: Option<Callback<ErrorPayload>>,
    pub on_change_validation: Option<Callback<FieldValidationEvent>>,
}

impl HostCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl Fn(SubmitPayload) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(ErrorPayload) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_change_validation(
        mut self,
        f: impl Fn(FieldValidationEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_change_validation = Some(Box::new(f));
        self
    }
}

/// Forwards events to the host callbacks while the element is attached.
struct CallbackRelay {
    callbacks: HostCallbacks,
    attached: AtomicBool,
}

impl CallbackRelay {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

impl EventSink for CallbackRelay {
    fn on_success(&self, payload: SubmitPayload) {
        if let (true, Some(f)) = (self.is_attached(), &self.callbacks.on_success) {
            f(payload);
        }
    }

    fn on_error(&self, payload: ErrorPayload) {
        if let (true, Some(f)) = (self.is_attached(), &self.callbacks.on_error) {
            f(payload);
        }
    }

    fn on_field_validation(&self, event: FieldValidationEvent) {
        if let (true, Some(f)) = (self.is_attached(), &self.callbacks.on_change_validation) {
            f(event);
        }
    }
}

/// A mountable drop-in payment form.
pub struct DropinElement {
    options: Mutex<DropinOptions>,
    document: SharedMountHost,
    relay: Arc<CallbackRelay>,
    orchestrator: Orchestrator,
    mounted_at: Mutex<Option<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DropinElement {
    /// Creates an unmounted element.
    ///
    /// # Arguments
    ///
    /// * `options` - Host configuration (credentials, method type, fields, theme).
    /// * `document` - The page the element mounts into.
    /// * `loader` - Page-wide script loader.
    /// * `sdk` - The hosted-fields SDK entry point.
    /// * `callbacks` - Host callbacks for success, error and validation events.
    pub fn new(
        options: DropinOptions,
        document: SharedMountHost,
        loader: Arc<ScriptLoader>,
        sdk: SharedSdk,
        callbacks: HostCallbacks,
    ) -> Self {
        let relay = Arc::new(CallbackRelay {
            callbacks,
            attached: AtomicBool::new(false),
        });
        let orchestrator =
            Orchestrator::new(options.orchestrator_config(), loader, sdk, relay.clone());
        Self {
            options: Mutex::new(options),
            document,
            relay,
            orchestrator,
            mounted_at: Mutex::new(None),
        }
    }

    /// Attaches the form to `target` and starts the lifecycle.
    ///
    /// Fails fast, without attaching anything, when the country is missing or
    /// the target cannot be resolved. Every failure is also raised through the
    /// host's error callback.
    pub async fn mount(&self, target: &str) -> Result<(), ErrorPayload> {
        {
            let mut mounted_at = lock(&self.mounted_at);
            if let Some(current) = mounted_at.as_deref() {
                tracing::warn!(current, target, "element already mounted, ignoring");
                return Ok(());
            }
            *mounted_at = Some(target.to_string());
        }

        let (token, country) = {
            let options = lock(&self.options);
            (options.token.clone(), options.country.clone())
        };
        self.relay.attached.store(true, Ordering::SeqCst);

        let country_missing = country.as_deref().is_none_or(|c| c.trim().is_empty());
        if country_missing {
            self.orchestrator.start(token.as_deref(), None).await;
            return Err(self.detach_with(self.orchestrator.last_error()));
        }

        if !self.document.resolve(target) {
            return Err(self.fail_mount(ErrorPayload::new(
                ErrorCode::MountPointNotFound,
                format!("Mount target '{target}' was not found."),
            )));
        }

        if let Err(reason) = self.document.attach(target) {
            return Err(self.fail_mount(ErrorPayload::new(
                ErrorCode::ComponentCreationFailed,
                format!("Could not create the payment form: {reason}"),
            )));
        }

        tracing::info!(target, "payment form mounted");

        self.orchestrator.start(token.as_deref(), country.as_deref()).await;
        Ok(())
    }

    fn fail_mount(&self, error: ErrorPayload) -> ErrorPayload {
        tracing::error!(code = %error.code, message = %error.message, "mount failed");
        self.relay.on_error(error.clone());
        self.release_mount();
        error
    }

    fn detach_with(&self, error: Option<ErrorPayload>) -> ErrorPayload {
        self.release_mount();
        error.unwrap_or_else(|| {
            ErrorPayload::new(ErrorCode::InternalError, "Mount failed without an error.")
        })
    }

    fn release_mount(&self) {
        self.relay.attached.store(false, Ordering::SeqCst);
        *lock(&self.mounted_at) = None;
    }

    /// Applies new credentials; a changed pair restarts initialization.
    pub async fn set_credentials(&self, token: Option<&str>, country: Option<&str>) {
        {
            let mut options = lock(&self.options);
            options.token = token.map(str::to_string);
            options.country = country.map(str::to_string);
        }

        if lock(&self.mounted_at).is_none() {
            tracing::debug!("not mounted, credentials stored for mount");
            return;
        }

        self.orchestrator.update_credentials(token, country).await;
    }

    pub fn submit(&self) -> SubmitStatus {
        self.orchestrator.submit()
    }

    /// Detaches the host callbacks, drops the current cycle and removes the
    /// mounted subtree. Safe to call repeatedly.
    pub fn unmount(&self) {
        let Some(target) = lock(&self.mounted_at).take() else {
            return;
        };
        self.relay.attached.store(false, Ordering::SeqCst);
        self.orchestrator.reset();
        self.document.remove(&target);
        tracing::info!(target, "payment form unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.mounted_at).is_some()
    }

    pub fn state(&self) -> InitializationState {
        self.orchestrator.state()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryMountHost, InMemoryScriptHost, SimulatedSdk};

    type Errors = Arc<Mutex<Vec<ErrorCode>>>;

    fn element(options: DropinOptions, document: InMemoryMountHost) -> (DropinElement, Errors) {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let element = DropinElement::new(
            options,
            Arc::new(document),
            Arc::new(ScriptLoader::new(Arc::new(InMemoryScriptHost::new()))),
            Arc::new(SimulatedSdk::new()),
            HostCallbacks::new().on_error(move |e| sink.lock().unwrap().push(e.code)),
        );
        (element, errors)
    }

    fn page() -> InMemoryMountHost {
        InMemoryMountHost::new().with_target("#pay")
    }

    fn options(country: Option<&str>) -> DropinOptions {
        DropinOptions {
            token: Some("tok_live_abc".into()),
            country: country.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_mount_reaches_ready() {
        let (element, errors) = element(options(Some("US")), page());
        element.mount("#pay").await.unwrap();

        assert!(element.is_mounted());
        assert_eq!(element.state(), InitializationState::Ready);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mount_without_country_fails_fast() {
        let (element, errors) = element(options(None), page());
        let err = element.mount("#pay").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::InitNoCountryCode);
        assert!(!element.is_mounted());
        assert_eq!(*errors.lock().unwrap(), vec![ErrorCode::InitNoCountryCode]);
    }

    #[tokio::test]
    async fn test_mount_unknown_target() {
        let (element, errors) = element(options(Some("US")), InMemoryMountHost::new());
        let err = element.mount("#missing").await.unwrap_err();

        assert_eq!(err.code, ErrorCode::MountPointNotFound);
        assert_eq!(element.state(), InitializationState::Idle);
        assert_eq!(*errors.lock().unwrap(), vec![ErrorCode::MountPointNotFound]);
    }

    #[tokio::test]
    async fn test_mount_attach_failure() {
        let document = InMemoryMountHost::new()
            .with_target("#pay")
            .failing_attach("shadow root unavailable");
        let (element, _) = element(options(Some("US")), document);

        let err = element.mount("#pay").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ComponentCreationFailed);
    }

    #[tokio::test]
    async fn test_unmount_detaches_callbacks() {
        let (element, errors) = element(options(Some("US")), page());
        element.mount("#pay").await.unwrap();
        element.unmount();
        element.unmount();

        assert!(!element.is_mounted());
        assert_eq!(element.state(), InitializationState::Idle);

        element.submit();
        assert!(errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_credentials_before_mount_are_used_at_mount() {
        let (element, _) = element(options(None), page());
        element.set_credentials(Some("tok_live_abc"), Some("CA")).await;
        assert_eq!(element.state(), InitializationState::Idle);

        element.mount("#pay").await.unwrap();
        assert_eq!(element.state(), InitializationState::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_mounts_start_one_cycle() {
        let sdk = Arc::new(SimulatedSdk::new().with_instantiate_delay_ms(20));
        let element = DropinElement::new(
            options(Some("US")),
            Arc::new(page()),
            Arc::new(ScriptLoader::new(Arc::new(InMemoryScriptHost::new()))),
            sdk.clone(),
            HostCallbacks::new(),
        );

        let (first, second) = tokio::join!(element.mount("#pay"), element.mount("#pay"));
        assert!(first.is_ok() && second.is_ok());

        assert_eq!(sdk.instantiation_count(), 1);
        assert_eq!(element.state(), InitializationState::Ready);
    }

    #[tokio::test]
    async fn test_failed_mount_can_be_retried() {
        let (element, errors) = element(options(Some("US")), page());
        element.mount("#missing").await.unwrap_err();
        assert!(!element.is_mounted());

        element.mount("#pay").await.unwrap();
        assert!(element.is_mounted());
        assert_eq!(*errors.lock().unwrap(), vec![ErrorCode::MountPointNotFound]);
    }
}
