//! Scripted completion client for unit tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::providers::{CompletionClient, CompletionRequest, ProviderError};

pub enum Script {
    Reply(String),
    Status(u16),
}

/// Answers every request the same way, optionally after a delay,
/// and remembers what it was asked.
pub struct ScriptedClient {
    script: Script,
    delay: Duration,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn replying(text: &str) -> Self {
        Self {
            script: Script::Reply(text.to_string()),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            script: Script::Status(status),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Reply(text) => Ok(text.clone()),
            Script::Status(status) => Err(ProviderError::Status {
                status: *status,
                body: "scripted failure".to_string(),
            }),
        }
    }
}
