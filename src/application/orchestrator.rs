use super::form::{self, SubmitOutcome};
use super::initializer::SdkInitializer;
use super::script_loader::ScriptLoader;
use crate::domain::error_code::ErrorCode;
use crate::domain::fields::{BillingFieldsConfig, build_fields};
use crate::domain::payload::ErrorPayload;
use crate::domain::ports::{SdkSessionHandle, SharedEventSink, SharedSdk};
use crate::domain::types::{Country, Credentials, InitializationState, PaymentMethodType, Theme};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

pub const DEFAULT_SCRIPT_URL: &str = "https://js.hostedfields.example.com/v2/hosted-fields.js";
pub const DEFAULT_SCRIPT_ID: &str = "hosted-fields-sdk";
pub const DEFAULT_SUBMIT_TARGET_ID: &str = "dropin-submit";

/// Number of recent transitions kept for inspection.
pub const HISTORY_LIMIT: usize = 64;

/// Per-instance settings fixed for the lifetime of a mounted element.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub payment_method_type: PaymentMethodType,
    pub billing_fields: BillingFieldsConfig,
    pub theme: Option<Theme>,
    pub submit_target_id: String,
    pub script_url: String,
    pub script_id: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            payment_method_type: PaymentMethodType::default(),
            billing_fields: BillingFieldsConfig::default(),
            theme: None,
            submit_target_id: DEFAULT_SUBMIT_TARGET_ID.to_string(),
            script_url: DEFAULT_SCRIPT_URL.to_string(),
            script_id: DEFAULT_SCRIPT_ID.to_string(),
        }
    }
}

/// What caused a credential evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    Update,
}

impl Trigger {
    fn missing_country_code(&self) -> ErrorCode {
        match self {
            Trigger::Mount => ErrorCode::InitNoCountryCode,
            Trigger::Update => ErrorCode::InitNoCountryCodeOnUpdate,
        }
    }
}

/// Result of a submit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// Handed to the SDK; the outcome arrives through the result callbacks.
    Forwarded,
    /// A previous submission is still awaiting its callback.
    Busy,
    /// Refused locally and reported through the error event.
    Rejected(ErrorCode),
}

#[derive(Debug, Clone)]
struct Cycle {
    generation: u64,
    credentials: Credentials,
}

/// Lifecycle record. Every state carries exactly the data valid in it, so a
/// session only exists once instantiation succeeded and the busy flag only
/// exists while ready.
enum Lifecycle {
    Idle,
    LoadingScript(Cycle),
    Instantiating(Cycle),
    BuildingForm(Cycle),
    Ready {
        cycle: Cycle,
        session: SdkSessionHandle,
        busy: bool,
    },
    Failed {
        error: ErrorPayload,
    },
}

impl Lifecycle {
    fn state(&self) -> InitializationState {
        match self {
            Lifecycle::Idle => InitializationState::Idle,
            Lifecycle::LoadingScript(_) => InitializationState::LoadingScript,
            Lifecycle::Instantiating(_) => InitializationState::Instantiating,
            Lifecycle::BuildingForm(_) => InitializationState::BuildingForm,
            Lifecycle::Ready { .. } => InitializationState::Ready,
            Lifecycle::Failed { .. } => InitializationState::Failed,
        }
    }

    fn cycle(&self) -> Option<&Cycle> {
        match self {
            Lifecycle::LoadingScript(c)
            | Lifecycle::Instantiating(c)
            | Lifecycle::BuildingForm(c) => Some(c),
            Lifecycle::Ready { cycle, .. } => Some(cycle),
            Lifecycle::Idle | Lifecycle::Failed { .. } => None,
        }
    }
}

struct Machine {
    lifecycle: Lifecycle,
    generation: u64,
    /// Credentials of the most recent cycle, cleared by local failures.
    credentials: Option<Credentials>,
    history: VecDeque<InitializationState>,
}

impl Machine {
    fn set(&mut self, lifecycle: Lifecycle, state_tx: &watch::Sender<InitializationState>) {
        let state = lifecycle.state();
        tracing::debug!(
            from = ?self.lifecycle.state(),
            to = ?state,
            generation = self.generation,
            "transition"
        );
        self.lifecycle = lifecycle;
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(state);
        state_tx.send_replace(state);
    }
}

struct Inner {
    config: OrchestratorConfig,
    loader: Arc<ScriptLoader>,
    initializer: SdkInitializer,
    sink: SharedEventSink,
    machine: Mutex<Machine>,
    state_tx: watch::Sender<InitializationState>,
}

impl Inner {
    fn machine(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the current cycle to `next` if `generation` is still current.
    fn advance(&self, generation: u64, next: impl FnOnce(Cycle) -> Lifecycle) -> bool {
        let mut m = self.machine();
        if m.generation != generation {
            return false;
        }
        let Some(cycle) = m.lifecycle.cycle().cloned() else {
            return false;
        };
        m.set(next(cycle), &self.state_tx);
        true
    }

    /// Fails the cycle `generation`; a stale generation is dropped silently.
    ///
    /// The cycle's credentials are forgotten so that re-supplying the same
    /// pair retries the pipeline.
    fn fail_cycle(&self, generation: u64, error: ErrorPayload) {
        {
            let mut m = self.machine();
            if m.generation != generation {
                tracing::warn!(
                    generation,
                    code = %error.code,
                    "discarding failure from superseded cycle"
                );
                return;
            }
            m.credentials = None;
            m.set(Lifecycle::Failed { error: error.clone() }, &self.state_tx);
        }
        self.report(error);
    }

    /// Supersedes whatever is in flight and fails without running a cycle.
    fn fail_locally(&self, error: ErrorPayload) {
        {
            let mut m = self.machine();
            m.generation += 1;
            m.credentials = None;
            m.set(Lifecycle::Failed { error: error.clone() }, &self.state_tx);
        }
        self.report(error);
    }

    fn report(&self, error: ErrorPayload) {
        tracing::error!(code = %error.code, message = %error.message, "surfacing error");
        self.sink.on_error(error);
    }

    fn is_current(&self, generation: u64) -> bool {
        self.machine().generation == generation
    }
}

/// The initialization state machine for one mounted instance.
///
/// Sequences script loading, SDK instantiation and form construction, and
/// restarts that pipeline from the top whenever the credentials change. Each
/// cycle carries a generation number; results from a superseded cycle,
/// including late SDK callbacks, are discarded.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Creates a new orchestrator in the `Idle` state.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-instance settings.
    /// * `loader` - Script loader, shareable between instances on one page.
    /// * `sdk` - The hosted-fields SDK entry point.
    /// * `sink` - Receiver of success, error and validation events.
    pub fn new(
        config: OrchestratorConfig,
        loader: Arc<ScriptLoader>,
        sdk: SharedSdk,
        sink: SharedEventSink,
    ) -> Self {
        let (state_tx, _) = watch::channel(InitializationState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                loader,
                initializer: SdkInitializer::new(sdk),
                sink,
                machine: Mutex::new(Machine {
                    lifecycle: Lifecycle::Idle,
                    generation: 0,
                    credentials: None,
                    history: VecDeque::with_capacity(HISTORY_LIMIT),
                }),
                state_tx,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn state(&self) -> InitializationState {
        self.inner.machine().lifecycle.state()
    }

    /// The most recent states entered, oldest first, up to [`HISTORY_LIMIT`].
    pub fn history(&self) -> Vec<InitializationState> {
        self.inner.machine().history.iter().copied().collect()
    }

    pub fn last_error(&self) -> Option<ErrorPayload> {
        match &self.inner.machine().lifecycle {
            Lifecycle::Failed { error } => Some(error.clone()),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.inner.machine().lifecycle,
            Lifecycle::Ready { busy: true, .. }
        )
    }

    pub fn subscribe(&self) -> watch::Receiver<InitializationState> {
        self.inner.state_tx.subscribe()
    }

    /// Waits until no cycle step is pending and returns the state reached.
    pub async fn settled(&self) -> InitializationState {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|s| *s == InitializationState::Idle || s.is_terminal())
            .await
            .map(|s| *s);
        settled.unwrap_or_else(|_| self.state())
    }

    /// Evaluates the credentials supplied at mount time.
    pub async fn start(&self, token: Option<&str>, country: Option<&str>) {
        self.evaluate(Trigger::Mount, token, country).await;
    }

    /// Handles a credential change from the host.
    ///
    /// A new, non-empty pair that differs from the current cycle's restarts
    /// the pipeline at `LoadingScript`; unchanged input is a no-op.
    pub async fn update_credentials(&self, token: Option<&str>, country: Option<&str>) {
        self.evaluate(Trigger::Update, token, country).await;
    }

    async fn evaluate(&self, trigger: Trigger, token: Option<&str>, country: Option<&str>) {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let country = country.map(str::trim).filter(|c| !c.is_empty());

        let Some(country) = country else {
            self.inner.fail_locally(ErrorPayload::new(
                trigger.missing_country_code(),
                "A country code is required to initialize the payment form.",
            ));
            return;
        };

        let country: Country = match country.parse() {
            Ok(c) => c,
            Err(unsupported) => {
                self.inner.fail_locally(ErrorPayload::new(
                    ErrorCode::InitUnsupportedCountry,
                    format!("Initialization failed: {unsupported}."),
                ));
                return;
            }
        };

        let Some(token) = token else {
            tracing::debug!(?trigger, "no token yet, waiting");
            return;
        };

        let credentials = Credentials::new(token, country);
        let cycle = {
            let mut m = self.inner.machine();
            if trigger == Trigger::Update && m.credentials.as_ref() == Some(&credentials) {
                tracing::debug!("credentials unchanged, keeping current cycle");
                return;
            }
            m.generation += 1;
            m.credentials = Some(credentials.clone());
            let cycle = Cycle {
                generation: m.generation,
                credentials,
            };
            m.set(Lifecycle::LoadingScript(cycle.clone()), &self.inner.state_tx);
            cycle
        };

        self.run_cycle(cycle).await;
    }

    async fn run_cycle(&self, cycle: Cycle) {
        let inner = &self.inner;
        let generation = cycle.generation;
        let config = &inner.config;

        let loaded = inner.loader.load(&config.script_url, &config.script_id).await;
        if !inner.is_current(generation) {
            tracing::warn!(generation, "script load finished for a superseded cycle");
            return;
        }
        if let Err(e) = loaded {
            inner.fail_cycle(generation, e.to_payload());
            return;
        }
        if !inner.advance(generation, Lifecycle::Instantiating) {
            return;
        }

        let Credentials { token, country } = &cycle.credentials;
        let session = inner
            .initializer
            .instantiate(token, *country, config.theme.as_ref())
            .await;
        if !inner.is_current(generation) {
            tracing::warn!(generation, "SDK session resolved for a superseded cycle");
            return;
        }
        let session = match session {
            Ok(s) => s,
            Err(e) => {
                inner.fail_cycle(generation, e.to_payload());
                return;
            }
        };
        if !inner.advance(generation, Lifecycle::BuildingForm) {
            return;
        }

        let fields = build_fields(config.payment_method_type, *country, &config.billing_fields);
        let built = form::build(
            &session,
            config.payment_method_type,
            &fields,
            &config.submit_target_id,
            self.result_callback(generation),
            self.validation_callback(generation),
        );

        match built {
            Ok(()) => {
                inner.advance(generation, |cycle| Lifecycle::Ready {
                    cycle,
                    session,
                    busy: false,
                });
            }
            Err(e) => inner.fail_cycle(generation, e.to_payload()),
        }
    }

    fn result_callback(&self, generation: u64) -> form::ResultCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move |outcome: SubmitOutcome| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut m = inner.machine();
                if m.generation != generation {
                    tracing::warn!(generation, "dropping SDK result from superseded session");
                    return;
                }
                if let Lifecycle::Ready { busy, .. } = &mut m.lifecycle {
                    *busy = false;
                }
            }
            match outcome {
                Ok(payload) => {
                    tracing::info!(
                        payment_method_type = %payload.payment_method_type(),
                        "payment method tokenized"
                    );
                    inner.sink.on_success(payload);
                }
                Err(error) => inner.report(error),
            }
        })
    }

    fn validation_callback(&self, generation: u64) -> form::ValidationCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.is_current(generation) {
                inner.sink.on_field_validation(event);
            }
        })
    }

    /// Forwards a submission to the SDK if the form is ready and idle.
    pub fn submit(&self) -> SubmitStatus {
        let inner = &self.inner;
        let claimed = {
            let mut m = inner.machine();
            let generation = m.generation;
            match &mut m.lifecycle {
                Lifecycle::Ready { busy: true, .. } => None,
                Lifecycle::Ready { session, busy, .. } => {
                    *busy = true;
                    Some(Ok((generation, session.clone())))
                }
                Lifecycle::Failed { .. } => Some(Err((
                    ErrorCode::SubmitWhileInitError,
                    "Cannot submit: the payment form failed to initialize.",
                ))),
                _ => Some(Err((
                    ErrorCode::FormNotReady,
                    "Cannot submit: the payment form is not ready yet.",
                ))),
            }
        };

        let (generation, session) = match claimed {
            None => {
                tracing::debug!("submission already in progress, ignoring");
                return SubmitStatus::Busy;
            }
            Some(Err((code, message))) => {
                inner.report(ErrorPayload::new(code, message));
                return SubmitStatus::Rejected(code);
            }
            Some(Ok(claimed)) => claimed,
        };

        if let Err(failure) = session.submit() {
            {
                let mut m = inner.machine();
                if m.generation == generation
                    && let Lifecycle::Ready { busy, .. } = &mut m.lifecycle
                {
                    *busy = false;
                }
            }
            inner.report(ErrorPayload::new(
                ErrorCode::InternalError,
                format!("Submission could not be started: {failure}"),
            ));
            return SubmitStatus::Rejected(ErrorCode::InternalError);
        }

        SubmitStatus::Forwarded
    }

    /// Supersedes any in-flight cycle and returns to `Idle`.
    pub fn reset(&self) {
        let mut m = self.inner.machine();
        m.generation += 1;
        m.credentials = None;
        m.set(Lifecycle::Idle, &self.inner.state_tx);
    }
}
