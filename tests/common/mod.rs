#![allow(dead_code)]

use dropin_fields::application::orchestrator::{Orchestrator, OrchestratorConfig};
use dropin_fields::application::script_loader::ScriptLoader;
use dropin_fields::infrastructure::in_memory::{InMemoryScriptHost, RecordingSink, SimulatedSdk};
use std::sync::Arc;

pub const TOKEN: &str = "tok_live_4f9a";

pub struct Page {
    pub host: Arc<InMemoryScriptHost>,
    pub loader: Arc<ScriptLoader>,
}

impl Page {
    pub fn new() -> Self {
        Self::with_host(InMemoryScriptHost::new())
    }

    pub fn with_host(host: InMemoryScriptHost) -> Self {
        let host = Arc::new(host);
        let loader = Arc::new(ScriptLoader::new(host.clone()));
        Self { host, loader }
    }

    pub fn instance(&self, config: OrchestratorConfig, sdk: SimulatedSdk) -> Instance {
        let sdk = Arc::new(sdk);
        let sink = Arc::new(RecordingSink::new());
        let orchestrator =
            Orchestrator::new(config, self.loader.clone(), sdk.clone(), sink.clone());
        Instance {
            sdk,
            sink,
            orchestrator,
        }
    }
}

pub struct Instance {
    pub sdk: Arc<SimulatedSdk>,
    pub sink: Arc<RecordingSink>,
    pub orchestrator: Orchestrator,
}
