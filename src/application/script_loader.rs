use crate::domain::ports::SharedScriptHost;
use crate::error::{DropinError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

type LoadOutcome = std::result::Result<(), String>;

enum Slot {
    Loaded,
    /// Settles to `Some` once the single injection for this id finishes.
    Pending(watch::Receiver<Option<LoadOutcome>>),
}

/// Loads external scripts at most once per logical id.
///
/// Concurrent callers for the same id share a single in-flight load and all
/// observe its outcome, success or failure. A failed load frees the slot, so
/// only calls made after it settled try again.
pub struct ScriptLoader {
    host: SharedScriptHost,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl ScriptLoader {
    pub fn new(host: SharedScriptHost) -> Self {
        Self {
            host,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn load(&self, url: &str, id: &str) -> Result<()> {
        let mut pending = {
            let mut slots = self.slots.lock().await;
            let joined = match slots.get(id) {
                Some(Slot::Loaded) => return Ok(()),
                Some(Slot::Pending(rx)) => Some(rx.clone()),
                None => None,
            };
            match joined {
                Some(rx) => {
                    tracing::debug!(id, "joining in-flight script load");
                    rx
                }
                None if self.host.has_script(id) => {
                    tracing::debug!(id, "script already present, skipping injection");
                    slots.insert(id.to_string(), Slot::Loaded);
                    return Ok(());
                }
                None => {
                    let rx = self.inject(url, id);
                    slots.insert(id.to_string(), Slot::Pending(rx.clone()));
                    rx
                }
            }
        };

        let outcome = match pending.wait_for(Option::is_some).await {
            Ok(settled) => settled.clone().unwrap_or(Ok(())),
            Err(_) => Err("script load was abandoned".to_string()),
        };

        outcome.map_err(|reason| DropinError::ScriptLoad {
            url: url.to_string(),
            id: id.to_string(),
            reason,
        })
    }

    /// Runs the injection on its own task so a cancelled caller cannot strand
    /// the slot in `Pending`.
    fn inject(&self, url: &str, id: &str) -> watch::Receiver<Option<LoadOutcome>> {
        let (tx, rx) = watch::channel(None);
        let host = self.host.clone();
        let slots = self.slots.clone();
        let (url, id) = (url.to_string(), id.to_string());

        tokio::spawn(async move {
            tracing::debug!(id = %id, url = %url, "injecting script");
            let outcome = host.inject_script(&url, &id).await;
            {
                let mut slots = slots.lock().await;
                if outcome.is_ok() {
                    slots.insert(id, Slot::Loaded);
                } else {
                    slots.remove(&id);
                }
            }
            tx.send_replace(Some(outcome));
        });

        rx
    }

    pub async fn is_loaded(&self, id: &str) -> bool {
        let slots = self.slots.lock().await;
        matches!(slots.get(id), Some(Slot::Loaded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryScriptHost;

    const URL: &str = "https://cdn.example.com/hosted-fields.js";

    #[tokio::test]
    async fn test_load_injects_once() {
        let host = Arc::new(InMemoryScriptHost::new());
        let loader = ScriptLoader::new(host.clone());

        loader.load(URL, "sdk").await.unwrap();
        loader.load(URL, "sdk").await.unwrap();

        assert_eq!(host.injection_count("sdk"), 1);
        assert!(loader.is_loaded("sdk").await);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_injection() {
        let host = Arc::new(InMemoryScriptHost::new().with_load_delay_ms(20));
        let loader = Arc::new(ScriptLoader::new(host.clone()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.load(URL, "sdk").await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(host.injection_count("sdk"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_failure() {
        let host = Arc::new(InMemoryScriptHost::new().with_load_delay_ms(20).failing(URL));
        let loader = Arc::new(ScriptLoader::new(host.clone()));

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.load(URL, "sdk").await })
            })
            .collect();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(matches!(err, DropinError::ScriptLoad { .. }));
        }

        assert_eq!(host.injection_count("sdk"), 1);
        assert!(!loader.is_loaded("sdk").await);
    }

    #[tokio::test]
    async fn test_existing_element_resolves_without_request() {
        let host = Arc::new(InMemoryScriptHost::new());
        host.preload("sdk");
        let loader = ScriptLoader::new(host.clone());

        loader.load(URL, "sdk").await.unwrap();
        assert_eq!(host.injection_count("sdk"), 0);
    }

    #[tokio::test]
    async fn test_failure_is_reported_and_retryable() {
        let host = Arc::new(InMemoryScriptHost::new().failing(URL));
        let loader = ScriptLoader::new(host.clone());

        let err = loader.load(URL, "sdk").await.unwrap_err();
        assert!(matches!(err, DropinError::ScriptLoad { .. }));
        assert!(!loader.is_loaded("sdk").await);

        host.recover(URL);
        loader.load(URL, "sdk").await.unwrap();
        assert!(loader.is_loaded("sdk").await);
        assert_eq!(host.injection_count("sdk"), 2);
    }
}
