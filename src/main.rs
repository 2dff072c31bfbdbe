use clap::{Parser, ValueEnum};
use dropin_fields::application::script_loader::ScriptLoader;
use dropin_fields::config::{DropinOptions, LogLevel};
use dropin_fields::domain::payload::DropinEvent;
use dropin_fields::domain::types::InitializationState;
use dropin_fields::infrastructure::in_memory::{
    InMemoryMountHost, InMemoryScriptHost, ScriptedResponse, SimulatedSdk,
};
use dropin_fields::interfaces::element::{DropinElement, HostCallbacks};
use dropin_fields::interfaces::json::event_writer::EventWriter;
use miette::{IntoDiagnostic, Result, WrapErr};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Selector registered in the simulated page.
const PAGE_MOUNT_POINT: &str = "#dropin-container";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Outcome {
    Success,
    Error,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Drop-in options as a JSON file
    options: PathBuf,

    /// Raw SDK result (JSON file) to replay after submitting
    #[arg(long)]
    result: Option<PathBuf>,

    /// Which SDK callback receives the replayed result
    #[arg(long, value_enum, default_value_t = Outcome::Success)]
    outcome: Outcome,

    /// Selector to mount into
    #[arg(long, default_value = PAGE_MOUNT_POINT)]
    mount: String,

    /// Overrides the options' logLevel
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let options = DropinOptions::from_path(&cli.options)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot load options from {}", cli.options.display()))?;
    let raw_result = cli.result.as_deref().map(read_json).transpose()?;

    let level = cli.log_level.unwrap_or(options.log_level);
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level.level_filter())
        .init();

    let sdk = match raw_result {
        Some(raw) => SimulatedSdk::new().responding_with(match cli.outcome {
            Outcome::Success => ScriptedResponse::Success(raw),
            Outcome::Error => ScriptedResponse::Error(raw),
        }),
        None => SimulatedSdk::new(),
    };
    let submit_after_ready = cli.result.is_some();

    let events = Arc::new(Mutex::new(Vec::new()));
    let callbacks = {
        let (on_success, on_error, on_change) = (events.clone(), events.clone(), events.clone());
        HostCallbacks::new()
            .on_success(move |p| push(&on_success, DropinEvent::Success(p)))
            .on_error(move |e| push(&on_error, DropinEvent::Error(e)))
            .on_change_validation(move |v| push(&on_change, DropinEvent::Validation(v)))
    };

    let element = DropinElement::new(
        options,
        Arc::new(InMemoryMountHost::new().with_target(PAGE_MOUNT_POINT)),
        Arc::new(ScriptLoader::new(Arc::new(InMemoryScriptHost::new()))),
        Arc::new(sdk),
        callbacks,
    );

    if element.mount(&cli.mount).await.is_ok() {
        let state = element.orchestrator().settled().await;
        tracing::info!(?state, "initialization settled");
        if submit_after_ready && state == InitializationState::Ready {
            element.submit();
        }
    }
    element.unmount();

    let events = events.lock().map(|e| e.clone()).unwrap_or_default();
    let stdout = io::stdout();
    EventWriter::new(stdout.lock())
        .write_events(&events)
        .into_diagnostic()?;

    Ok(())
}

fn push(events: &Mutex<Vec<DropinEvent>>, event: DropinEvent) {
    if let Ok(mut events) = events.lock() {
        events.push(event);
    }
}
