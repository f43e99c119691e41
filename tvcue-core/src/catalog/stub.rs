// <coverage:exclude>
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use super::*;
use crate::error::TransportError;

#[derive(Clone)]
enum Outcome {
    Ok(Value),
    Fail(String),
    // The transport gave up on its own.
    Cancelled,
}

#[derive(Clone)]
struct Script {
    delay: Duration,
    outcome: Outcome,
}

/// A scripted catalog.
///
/// Unknown keys fail with a transport error immediately.
#[derive(Clone, Default)]
pub(crate) struct CatalogStub {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl CatalogStub {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn respond(&self, key: &str, delay_ms: u64, value: Value) -> &Self {
        self.script(key, delay_ms, Outcome::Ok(value))
    }

    pub(crate) fn fail(&self, key: &str, delay_ms: u64, reason: &str) -> &Self {
        self.script(key, delay_ms, Outcome::Fail(reason.to_string()))
    }

    pub(crate) fn cancel(&self, key: &str, delay_ms: u64) -> &Self {
        self.script(key, delay_ms, Outcome::Cancelled)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn script(&self, key: &str, delay_ms: u64, outcome: Outcome) -> &Self {
        self.scripts.lock().unwrap().insert(
            key.to_string(),
            Script {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
        self
    }
}

#[async_trait]
impl CatalogApi for CatalogStub {
    async fn fetch(&self, key: &str, token: CancellationToken) -> Result<Value, Error> {
        self.calls.lock().unwrap().push(key.to_string());
        let script = self.scripts.lock().unwrap().get(key).cloned();
        let script = match script {
            Some(script) => script,
            None => {
                return Err(Error::Transport(TransportError::Other(format!(
                    "no script for {key}"
                ))));
            }
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(script.delay) => (),
        }
        match script.outcome {
            Outcome::Ok(value) => Ok(value),
            Outcome::Fail(reason) => Err(Error::Transport(TransportError::Other(reason))),
            Outcome::Cancelled => Err(Error::Cancelled),
        }
    }
}
// </coverage:exclude>
